//! SFX DSP - Numeric Kernels
//!
//! This crate provides the pure numeric routines used by feature-extraction
//! transforms:
//! - FFT-backed convolution and cross-correlation plans (reusable, expensive to build)
//! - Window functions and windowed-sinc FIR design
//! - High-pass IIR designs (Butterworth, Bessel, Chebyshev I/II) as cascaded BiQuad sections
//! - Energy, first-difference, logarithm and sample-conversion primitives
//!
//! # Architecture
//!
//! Everything here is a plain function over slices or a plan object owning its
//! scratch memory. Plans are `Send` but not shared: callers that need
//! concurrency keep one plan per worker.

mod arith;
mod convolve;
mod correlate;
mod dispatch;
mod error;
mod fir;
mod iir;
mod window;

pub use arith::{float_to_int16, int16_to_float, LogBase};
pub use convolve::{ConvolutionMethod, Convolver, TIME_DOMAIN_THRESHOLD};
pub use correlate::CrossCorrelator;
pub use dispatch::{kernels, Kernels};
pub use error::DspError;
pub use fir::lowpass_kernel;
pub use iir::{IirCascade, IirKind, MAX_IIR_ORDER};
pub use window::{window, window_element, WindowType};
