//! Cross-Correlation Plan
//!
//! Full cross-correlation of two fixed-length signals, computed as the
//! convolution of `x` with the time-reversed `y`. Both operands change on
//! every call, so only the FFT plan and scratch memory are precomputed.

use rustfft::num_complex::Complex;

use crate::convolve::{convolve_direct, FftPair, TIME_DOMAIN_THRESHOLD};
use crate::error::DspError;

/// Reusable correlation context sized for `x_len` × `y_len` inputs
pub struct CrossCorrelator {
    x_len: usize,
    y_len: usize,
    reversed: Vec<f32>,
    fft: Option<FftBuffers>,
}

struct FftBuffers {
    pair: FftPair,
    x: Vec<Complex<f32>>,
    y: Vec<Complex<f32>>,
}

impl CrossCorrelator {
    pub fn new(x_len: usize, y_len: usize) -> Result<Self, DspError> {
        if x_len == 0 || y_len == 0 {
            return Err(DspError::EmptyPlan);
        }

        let fft = if x_len.min(y_len) < TIME_DOMAIN_THRESHOLD {
            None
        } else {
            let size = (x_len + y_len - 1).next_power_of_two();
            Some(FftBuffers {
                pair: FftPair::new(size),
                x: vec![Complex::new(0.0, 0.0); size],
                y: vec![Complex::new(0.0, 0.0); size],
            })
        };

        Ok(Self {
            x_len,
            y_len,
            reversed: vec![0.0; y_len],
            fft,
        })
    }

    /// Number of lags produced by [`CrossCorrelator::correlate`]
    pub fn output_len(&self) -> usize {
        self.x_len + self.y_len - 1
    }

    /// Correlate `x` with `y`; lag zero lands at index `y_len - 1`
    pub fn correlate(&mut self, x: &[f32], y: &[f32], output: &mut [f32]) {
        debug_assert_eq!(x.len(), self.x_len, "x length differs from plan");
        debug_assert_eq!(y.len(), self.y_len, "y length differs from plan");
        debug_assert!(output.len() >= self.output_len(), "Output buffer too short");

        for (dst, src) in self.reversed.iter_mut().zip(y.iter().rev()) {
            *dst = *src;
        }

        let out_len = self.output_len();
        match self.fft.as_mut() {
            None => convolve_direct(x, &self.reversed, &mut output[..out_len]),
            Some(fft) => {
                fft.pair.forward(x, &mut fft.x);
                fft.pair.forward(&self.reversed, &mut fft.y);
                for (a, b) in fft.x.iter_mut().zip(fft.y.iter()) {
                    *a *= *b;
                }
                fft.pair.inverse(&mut fft.x, &mut output[..out_len]);
            }
        }
    }
}
