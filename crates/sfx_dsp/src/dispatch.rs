//! Runtime Kernel Strategy Selection
//!
//! Hot loops come in two flavours: a plain scalar loop and a lane-unrolled
//! loop with independent accumulators that the compiler vectorizes. The
//! flavour is picked once per process from the detected CPU features.

use std::sync::OnceLock;

/// Lanes processed per unrolled iteration
const LANES: usize = 8;

/// Table of kernel implementations sharing one strategy
pub struct Kernels {
    pub name: &'static str,
    /// `output[i] = max(input[i + 1] - input[i], 0)` for `i < input.len() - 1`
    pub diffrect: fn(&[f32], &mut [f32]),
    /// Mean square of the samples (0 for an empty slice)
    pub energy: fn(&[f32]) -> f32,
    /// `sqrt(sum((a[i] * a_scale - b[i] * b_scale)^2))`
    pub normalized_distance: fn(&[f32], f32, &[f32], f32) -> f32,
}

impl std::fmt::Debug for Kernels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernels").field("name", &self.name).finish()
    }
}

static SCALAR: Kernels = Kernels {
    name: "scalar",
    diffrect: diffrect_scalar,
    energy: energy_scalar,
    normalized_distance: distance_scalar,
};

static UNROLLED: Kernels = Kernels {
    name: "unrolled",
    diffrect: diffrect_unrolled,
    energy: energy_unrolled,
    normalized_distance: distance_unrolled,
};

/// Kernels selected for this CPU
pub fn kernels() -> &'static Kernels {
    static SELECTED: OnceLock<&'static Kernels> = OnceLock::new();
    SELECTED.get_or_init(detect)
}

impl Kernels {
    pub fn scalar() -> &'static Kernels {
        &SCALAR
    }

    pub fn unrolled() -> &'static Kernels {
        &UNROLLED
    }
}

fn detect() -> &'static Kernels {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            return &UNROLLED;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return &UNROLLED;
        }
    }
    &SCALAR
}

fn diffrect_scalar(input: &[f32], output: &mut [f32]) {
    for (o, pair) in output.iter_mut().zip(input.windows(2)) {
        *o = (pair[1] - pair[0]).max(0.0);
    }
}

fn diffrect_unrolled(input: &[f32], output: &mut [f32]) {
    let n = input.len().saturating_sub(1).min(output.len());
    let body = n - n % LANES;
    for (chunk_index, chunk) in output[..body].chunks_exact_mut(LANES).enumerate() {
        let src = &input[chunk_index * LANES..chunk_index * LANES + LANES + 1];
        for lane in 0..LANES {
            chunk[lane] = (src[lane + 1] - src[lane]).max(0.0);
        }
    }
    diffrect_scalar(&input[body..], &mut output[body..n]);
}

fn energy_scalar(input: &[f32]) -> f32 {
    if input.is_empty() {
        return 0.0;
    }
    input.iter().map(|v| v * v).sum::<f32>() / input.len() as f32
}

fn energy_unrolled(input: &[f32]) -> f32 {
    if input.is_empty() {
        return 0.0;
    }
    let mut acc = [0.0_f32; LANES];
    let chunks = input.chunks_exact(LANES);
    let tail: f32 = chunks.remainder().iter().map(|v| v * v).sum();
    for chunk in chunks {
        for lane in 0..LANES {
            acc[lane] += chunk[lane] * chunk[lane];
        }
    }
    (acc.iter().sum::<f32>() + tail) / input.len() as f32
}

/// `sum((a[i] * a_scale - b[i] * b_scale)^2)`
fn squared_distance(a: &[f32], a_scale: f32, b: &[f32], b_scale: f32) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x * a_scale - y * b_scale;
            d * d
        })
        .sum()
}

fn distance_scalar(a: &[f32], a_scale: f32, b: &[f32], b_scale: f32) -> f32 {
    squared_distance(a, a_scale, b, b_scale).sqrt()
}

fn distance_unrolled(a: &[f32], a_scale: f32, b: &[f32], b_scale: f32) -> f32 {
    let n = a.len().min(b.len());
    let body = n - n % LANES;
    let mut acc = [0.0_f32; LANES];
    for (ca, cb) in a[..body].chunks_exact(LANES).zip(b[..body].chunks_exact(LANES)) {
        for lane in 0..LANES {
            let d = ca[lane] * a_scale - cb[lane] * b_scale;
            acc[lane] += d * d;
        }
    }
    let tail = squared_distance(&a[body..n], a_scale, &b[body..n], b_scale);
    (acc.iter().sum::<f32>() + tail).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i * 7) % 11) as f32 - 5.0).collect()
    }

    #[test]
    fn test_diffrect_clamps_negative_differences() {
        for k in [Kernels::scalar(), Kernels::unrolled()] {
            let mut out = [0.0; 3];
            (k.diffrect)(&[1.0, 3.0, 2.0, 5.0], &mut out);
            assert_eq!(out, [2.0, 0.0, 3.0], "{}", k.name);
        }
    }

    #[test]
    fn test_strategies_agree() {
        for len in [0, 1, 7, 8, 9, 31, 64, 100] {
            let x = signal(len);
            let y: Vec<f32> = x.iter().map(|v| v * 0.5 + 1.0).collect();

            let n = len.saturating_sub(1);
            let mut a = vec![0.0; n];
            let mut b = vec![0.0; n];
            (SCALAR.diffrect)(&x, &mut a);
            (UNROLLED.diffrect)(&x, &mut b);
            assert_eq!(a, b, "diffrect len {}", len);

            let ea = (SCALAR.energy)(&x);
            let eb = (UNROLLED.energy)(&x);
            assert!((ea - eb).abs() < 1e-4, "energy len {}", len);

            let da = (SCALAR.normalized_distance)(&x, 0.3, &y, 0.7);
            let db = (UNROLLED.normalized_distance)(&x, 0.3, &y, 0.7);
            assert!((da - db).abs() < 1e-3, "distance len {}", len);
        }
    }

    #[test]
    fn test_unrolled_tail_matches_scalar_exactly() {
        // Shorter than one lane block, so the whole distance is tail
        for len in 1..LANES {
            let x = signal(len);
            let y: Vec<f32> = x.iter().map(|v| v * 0.37 - 2.0).collect();
            assert_eq!(
                (UNROLLED.normalized_distance)(&x, 0.3, &y, 0.7),
                (SCALAR.normalized_distance)(&x, 0.3, &y, 0.7),
                "len {}",
                len
            );
        }
    }

    #[test]
    fn test_selection_is_stable() {
        assert!(std::ptr::eq(kernels(), kernels()));
    }
}
