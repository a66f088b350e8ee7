//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while building numeric plans or filters
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Ripple must be a positive number of decibels, got {0}")]
    InvalidRipple(f32),

    #[error("Plan length must be non-zero")]
    EmptyPlan,

    #[error("Filter order must be between 1 and {max}, got {got}")]
    InvalidOrder { got: usize, max: usize },
}
