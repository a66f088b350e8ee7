//! Window Functions
//!
//! Tapering windows applied to analysis frames and FIR kernels.

use std::f32::consts::PI;

/// Window shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowType {
    Rectangular,
    Hamming,
    Hann,
    Blackman,
}

impl WindowType {
    /// Name/value table used when parsing textual configuration
    pub const NAMES: &'static [(&'static str, WindowType)] = &[
        ("rectangular", WindowType::Rectangular),
        ("hamming", WindowType::Hamming),
        ("hann", WindowType::Hann),
        ("blackman", WindowType::Blackman),
    ];

    pub fn name(self) -> &'static str {
        match self {
            WindowType::Rectangular => "rectangular",
            WindowType::Hamming => "hamming",
            WindowType::Hann => "hann",
            WindowType::Blackman => "blackman",
        }
    }
}

/// Value of the `index`-th coefficient of a window of `length` points
pub fn window_element(window_type: WindowType, length: usize, index: usize) -> f32 {
    if length <= 1 {
        return 1.0;
    }
    let phase = 2.0 * PI * index as f32 / (length - 1) as f32;
    match window_type {
        WindowType::Rectangular => 1.0,
        WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
        WindowType::Hann => 0.5 * (1.0 - phase.cos()),
        WindowType::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
    }
}

/// Full window of `length` coefficients
pub fn window(window_type: WindowType, length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| window_element(window_type, length, i))
        .collect()
}
