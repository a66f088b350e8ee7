//! Cascaded BiQuad High-Pass Filter
//!
//! Each family starts from its analog low-pass prototype (poles normalized
//! to a 1 rad/s cutoff). The prototype is mapped to a high-pass with
//! `s -> 1/s`, frequency-scaled to the prewarped cutoff, and discretized
//! section by section with the bilinear transform. Conjugate pole pairs
//! become biquads; an odd order adds one first-order section.
//!
//! Elliptic and Legendre responses are not designed here.

use std::f64::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed};
use rustfft::num_complex::Complex;

use crate::error::DspError;

/// Maximum filter order (number of poles)
pub const MAX_IIR_ORDER: usize = 16;

/// Response family of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IirKind {
    /// Maximally flat passband, -3 dB at the cutoff
    Butterworth,
    /// Maximally flat group delay, normalized to -3 dB at the cutoff
    Bessel,
    /// Passband ripple of `ripple` dB, passband edge at the cutoff
    ChebyshevI,
    /// Stopband attenuation of `ripple` dB, stopband edge at the cutoff
    ChebyshevII,
}

impl IirKind {
    pub const NAMES: &'static [(&'static str, IirKind)] = &[
        ("butterworth", IirKind::Butterworth),
        ("bessel", IirKind::Bessel),
        ("chebyshev1", IirKind::ChebyshevI),
        ("chebyshev2", IirKind::ChebyshevII),
    ];

    pub fn name(self) -> &'static str {
        match self {
            IirKind::Butterworth => "butterworth",
            IirKind::Bessel => "bessel",
            IirKind::ChebyshevI => "chebyshev1",
            IirKind::ChebyshevII => "chebyshev2",
        }
    }

    pub fn uses_ripple(self) -> bool {
        matches!(self, IirKind::ChebyshevI | IirKind::ChebyshevII)
    }
}

/// Analog low-pass prototype with a 1 rad/s cutoff
///
/// `pairs` holds one pole of each conjugate pair (positive imaginary part)
/// and, for Chebyshev II, the imaginary-axis zero `z` of that section.
struct Prototype {
    pairs: Vec<(Complex<f64>, Option<f64>)>,
    real: Option<f64>,
    gain: f64,
}

fn pole_angle(k: usize, order: usize) -> f64 {
    PI * (2 * k + 1) as f64 / (2 * order) as f64
}

fn butterworth(order: usize) -> Prototype {
    Prototype {
        pairs: (0..order / 2)
            .map(|k| {
                let theta = pole_angle(k, order);
                (Complex::new(-theta.sin(), theta.cos()), None)
            })
            .collect(),
        real: (order % 2 == 1).then_some(-1.0),
        gain: 1.0,
    }
}

fn chebyshev_i(order: usize, ripple_db: f64) -> Prototype {
    let epsilon = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / epsilon).asinh() / order as f64;
    Prototype {
        pairs: (0..order / 2)
            .map(|k| {
                let theta = pole_angle(k, order);
                (Complex::new(-mu.sinh() * theta.sin(), mu.cosh() * theta.cos()), None)
            })
            .collect(),
        real: (order % 2 == 1).then(|| -mu.sinh()),
        // Even orders start the passband at the bottom of the ripple
        gain: if order % 2 == 0 {
            1.0 / (1.0 + epsilon * epsilon).sqrt()
        } else {
            1.0
        },
    }
}

fn chebyshev_ii(order: usize, attenuation_db: f64) -> Prototype {
    let epsilon = 1.0 / (10f64.powf(attenuation_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / epsilon).asinh() / order as f64;
    Prototype {
        pairs: (0..order / 2)
            .map(|k| {
                let theta = pole_angle(k, order);
                let chebyshev = Complex::new(-mu.sinh() * theta.sin(), mu.cosh() * theta.cos());
                (chebyshev.inv().conj(), Some(1.0 / theta.cos()))
            })
            .collect(),
        real: (order % 2 == 1).then(|| -1.0 / mu.sinh()),
        gain: 1.0,
    }
}

/// Coefficients of the reverse Bessel polynomial, lowest power first
fn reverse_bessel(order: usize) -> Vec<f64> {
    let mut coefficients = vec![0.0; order + 1];
    coefficients[order] = 1.0;
    // a[k] = (2n - k)! / (2^(n - k) k! (n - k)!)
    let n = order as f64;
    for k in (1..=order).rev() {
        let kf = k as f64;
        coefficients[k - 1] = coefficients[k] * (2.0 * n - kf + 1.0) * kf / (2.0 * (n - kf + 1.0));
    }
    coefficients
}

/// Roots of a monic polynomial (lowest power first) by Durand-Kerner iteration
fn polynomial_roots(coefficients: &[f64]) -> Vec<Complex<f64>> {
    let degree = coefficients.len() - 1;
    let evaluate = |z: Complex<f64>| {
        coefficients
            .iter()
            .rev()
            .fold(Complex::new(0.0, 0.0), |acc, &c| acc * z + c)
    };
    let seed = Complex::new(0.4, 0.9);
    let scale = coefficients[0].abs().powf(1.0 / degree as f64).max(1.0);
    let mut roots: Vec<Complex<f64>> = (0..degree)
        .map(|i| seed.powu(i as u32) * scale)
        .collect();

    for _ in 0..2000 {
        let mut largest_step = 0.0f64;
        for i in 0..degree {
            let denominator = (0..degree)
                .filter(|&j| j != i)
                .fold(Complex::new(1.0, 0.0), |acc, j| acc * (roots[i] - roots[j]));
            let step = evaluate(roots[i]) / denominator;
            roots[i] -= step;
            largest_step = largest_step.max(step.norm() / roots[i].norm().max(1.0));
        }
        if largest_step < 1e-14 {
            break;
        }
    }
    roots
}

fn bessel(order: usize) -> Prototype {
    let mut poles = polynomial_roots(&reverse_bessel(order));
    poles.sort_by(|a, b| b.im.total_cmp(&a.im));

    // Rescale so the magnitude response crosses -3 dB at 1 rad/s
    let magnitude = |w: f64| {
        poles
            .iter()
            .map(|p| p.norm() / (Complex::new(0.0, w) - *p).norm())
            .product::<f64>()
    };
    let target = std::f64::consts::FRAC_1_SQRT_2;
    let (mut low, mut high) = (1e-3_f64, 1e3_f64);
    for _ in 0..200 {
        let mid = (low * high).sqrt();
        if magnitude(mid) > target {
            low = mid;
        } else {
            high = mid;
        }
    }
    let w3 = (low * high).sqrt();

    Prototype {
        pairs: poles[..order / 2].iter().map(|p| (*p / w3, None)).collect(),
        real: (order % 2 == 1).then(|| poles[order / 2].re / w3),
        gain: 1.0,
    }
}

/// Bilinear transform of `(b2 s^2 + b1 s + b0) / (a2 s^2 + a1 s + a0)`
fn bilinear(b: [f64; 3], a: [f64; 3]) -> Coefficients<f32> {
    let [b2, b1, b0] = b;
    let [a2, a1, a0] = a;
    let (n, d) = if a2 == 0.0 && b2 == 0.0 {
        (
            [b1 + b0, b0 - b1, 0.0],
            [a1 + a0, a0 - a1, 0.0],
        )
    } else {
        (
            [b2 + b1 + b0, 2.0 * (b0 - b2), b2 - b1 + b0],
            [a2 + a1 + a0, 2.0 * (a0 - a2), a2 - a1 + a0],
        )
    };
    Coefficients {
        b0: (n[0] / d[0]) as f32,
        b1: (n[1] / d[0]) as f32,
        b2: (n[2] / d[0]) as f32,
        a1: (d[1] / d[0]) as f32,
        a2: (d[2] / d[0]) as f32,
    }
}

/// Series of high-pass sections with independent state
#[derive(Clone)]
pub struct IirCascade {
    sections: Vec<DirectForm2Transposed<f32>>,
    gain: f32,
}

impl IirCascade {
    /// Design an `order`-pole high-pass with its cutoff at `frequency` Hz
    ///
    /// `ripple` (dB) is read by the Chebyshev families only.
    pub fn highpass(
        kind: IirKind,
        order: usize,
        frequency: f32,
        ripple: f32,
        sample_rate: f32,
    ) -> Result<Self, DspError> {
        if sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if order == 0 || order > MAX_IIR_ORDER {
            return Err(DspError::InvalidOrder {
                got: order,
                max: MAX_IIR_ORDER,
            });
        }
        if !(frequency > 0.0 && frequency < sample_rate / 2.0) {
            return Err(DspError::InvalidCoefficients {
                frequency,
                sample_rate,
            });
        }
        if kind.uses_ripple() && !(ripple > 0.0 && ripple.is_finite()) {
            return Err(DspError::InvalidRipple(ripple));
        }

        let prototype = match kind {
            IirKind::Butterworth => butterworth(order),
            IirKind::Bessel => bessel(order),
            IirKind::ChebyshevI => chebyshev_i(order, ripple as f64),
            IirKind::ChebyshevII => chebyshev_ii(order, ripple as f64),
        };

        // Prewarped cutoff for the bilinear transform s = (1 - z^-1) / (1 + z^-1)
        let warped = (PI * frequency as f64 / sample_rate as f64).tan();
        let mut sections = Vec::with_capacity((order + 1) / 2);
        for (pole, zero) in &prototype.pairs {
            // s -> 1/s sends the pole p to 1/p and the zeros jz to j/z (or to 0)
            let hp = pole.inv();
            let numerator_constant = zero.map_or(0.0, |z| 1.0 / (z * z));
            sections.push(bilinear(
                [1.0 / (warped * warped), 0.0, numerator_constant],
                [1.0 / (warped * warped), -2.0 * hp.re / warped, hp.norm_sqr()],
            ));
        }
        if let Some(pole) = prototype.real {
            sections.push(bilinear([0.0, 1.0 / warped, 0.0], [0.0, 1.0 / warped, -1.0 / pole]));
        }

        Ok(Self {
            sections: sections
                .into_iter()
                .map(DirectForm2Transposed::<f32>::new)
                .collect(),
            gain: prototype.gain as f32,
        })
    }

    /// Number of first- and second-order sections
    pub fn sections(&self) -> usize {
        self.sections.len()
    }

    /// Clear the delay lines of every section
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset_state();
        }
    }

    #[inline]
    pub fn run(&mut self, sample: f32) -> f32 {
        self.sections
            .iter_mut()
            .fold(sample * self.gain, |acc, section| section.run(acc))
    }

    /// Filter `input` into `output` continuing from the current state
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len(), "Buffers must be same length");
        for (o, &i) in output.iter_mut().zip(input.iter()) {
            *o = self.run(i);
        }
    }
}
