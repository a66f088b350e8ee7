//! Fixed-Kernel Convolution Plan
//!
//! Full linear convolution (`input_len + kernel_len - 1` outputs) of a
//! fixed-length input against a kernel known at plan time.
//!
//! Short kernels use direct time-domain convolution; longer kernels use an
//! FFT of the zero-padded signal multiplied by the precomputed kernel spectrum.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::DspError;

/// Kernels shorter than this are convolved directly in the time domain
pub const TIME_DOMAIN_THRESHOLD: usize = 64;

/// Strategy chosen when the plan is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolutionMethod {
    Direct,
    Fft,
}

/// Forward/inverse FFT pair with its working buffers
pub(crate) struct FftPair {
    pub(crate) size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPair {
    pub(crate) fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            size,
            forward,
            inverse,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Zero-pad `signal` into `buffer` and transform it in place
    pub(crate) fn forward(&mut self, signal: &[f32], buffer: &mut [Complex<f32>]) {
        for (dst, src) in buffer.iter_mut().zip(signal.iter().copied().chain(std::iter::repeat(0.0))) {
            *dst = Complex::new(src, 0.0);
        }
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Inverse transform, writing the first `output.len()` normalized real parts
    pub(crate) fn inverse(&mut self, buffer: &mut [Complex<f32>], output: &mut [f32]) {
        self.inverse.process_with_scratch(buffer, &mut self.scratch);
        let norm = 1.0 / self.size as f32;
        for (dst, src) in output.iter_mut().zip(buffer.iter()) {
            *dst = src.re * norm;
        }
    }
}

struct FftState {
    pair: FftPair,
    kernel_spectrum: Vec<Complex<f32>>,
    buffer: Vec<Complex<f32>>,
}

/// Convolution plan for one input length and one kernel
pub struct Convolver {
    input_len: usize,
    kernel: Vec<f32>,
    fft: Option<FftState>,
}

impl Convolver {
    /// Build a plan convolving `input_len` samples with `kernel`
    pub fn new(input_len: usize, kernel: &[f32]) -> Result<Self, DspError> {
        if input_len == 0 || kernel.is_empty() {
            return Err(DspError::EmptyPlan);
        }

        let fft = if kernel.len() < TIME_DOMAIN_THRESHOLD {
            None
        } else {
            let size = (input_len + kernel.len() - 1).next_power_of_two();
            let mut pair = FftPair::new(size);
            let mut kernel_spectrum = vec![Complex::new(0.0, 0.0); size];
            pair.forward(kernel, &mut kernel_spectrum);
            Some(FftState {
                pair,
                kernel_spectrum,
                buffer: vec![Complex::new(0.0, 0.0); size],
            })
        };

        Ok(Self {
            input_len,
            kernel: kernel.to_vec(),
            fft,
        })
    }

    pub fn method(&self) -> ConvolutionMethod {
        if self.fft.is_some() {
            ConvolutionMethod::Fft
        } else {
            ConvolutionMethod::Direct
        }
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn kernel_len(&self) -> usize {
        self.kernel.len()
    }

    /// Number of samples produced by [`Convolver::process`]
    pub fn output_len(&self) -> usize {
        self.input_len + self.kernel.len() - 1
    }

    /// Convolve `input` with the plan's kernel into `output`
    ///
    /// `input` must hold `input_len()` samples and `output` at least `output_len()`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.input_len, "Input length differs from plan");
        debug_assert!(output.len() >= self.output_len(), "Output buffer too short");

        let out_len = self.output_len();
        match self.fft.as_mut() {
            None => convolve_direct(input, &self.kernel, &mut output[..out_len]),
            Some(state) => {
                state.pair.forward(input, &mut state.buffer);
                for (x, h) in state.buffer.iter_mut().zip(state.kernel_spectrum.iter()) {
                    *x *= *h;
                }
                state.pair.inverse(&mut state.buffer, &mut output[..out_len]);
            }
        }
    }
}

/// Time-domain full convolution; `output.len()` must be `x.len() + h.len() - 1`
pub(crate) fn convolve_direct(x: &[f32], h: &[f32], output: &mut [f32]) {
    output.iter_mut().for_each(|o| *o = 0.0);
    for (i, &xi) in x.iter().enumerate() {
        for (j, &hj) in h.iter().enumerate() {
            output[i + j] += xi * hj;
        }
    }
}
