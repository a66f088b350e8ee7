//! Windowed-Sinc FIR Design

use std::f32::consts::PI;

use crate::error::DspError;
use crate::window::{window_element, WindowType};

/// Design a low-pass FIR kernel of `length` taps with cutoff `frequency` Hz
///
/// The ideal sinc response is centred on the kernel and tapered by `window_type`.
pub fn lowpass_kernel(
    length: usize,
    window_type: WindowType,
    frequency: f32,
    sample_rate: u32,
) -> Result<Vec<f32>, DspError> {
    if sample_rate == 0 {
        return Err(DspError::InvalidSampleRate(0.0));
    }
    if length == 0 {
        return Err(DspError::EmptyPlan);
    }
    let fs = sample_rate as f32;
    if frequency <= 0.0 || 2.0 * frequency >= fs {
        return Err(DspError::InvalidCoefficients {
            frequency,
            sample_rate: fs,
        });
    }

    let offset = (length - 1) as f32 / 2.0;
    let kernel = (0..length)
        .map(|n| {
            let t = n as f32 - offset;
            let ideal = if t != 0.0 {
                (2.0 * PI * t * frequency / fs).sin() / (PI * t)
            } else {
                // sin(x)/x -> 1 as x -> 0
                2.0 * frequency / fs
            };
            ideal * window_element(window_type, length, n)
        })
        .collect();
    Ok(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_symmetric() {
        let k = lowpass_kernel(31, WindowType::Hamming, 1000.0, 16000).unwrap();
        for i in 0..15 {
            assert!((k[i] - k[30 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_dc_gain_close_to_unity() {
        let k = lowpass_kernel(101, WindowType::Blackman, 2000.0, 16000).unwrap();
        let dc: f32 = k.iter().sum();
        assert!((dc - 1.0).abs() < 0.02, "DC gain {}", dc);
    }

    #[test]
    fn test_cutoff_above_nyquist_rejected() {
        assert!(lowpass_kernel(32, WindowType::Hann, 9000.0, 16000).is_err());
        assert!(lowpass_kernel(32, WindowType::Hann, 1000.0, 0).is_err());
    }
}
