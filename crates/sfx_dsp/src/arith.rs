//! Element-wise Primitives

/// Convert 16-bit PCM samples to floats without rescaling
#[inline]
pub fn int16_to_float(input: &[i16], output: &mut [f32]) {
    for (o, &i) in output.iter_mut().zip(input.iter()) {
        *o = i as f32;
    }
}

/// Convert floats back to 16-bit PCM, rounding and saturating
#[inline]
pub fn float_to_int16(input: &[f32], output: &mut [i16]) {
    for (o, &i) in output.iter_mut().zip(input.iter()) {
        *o = i.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

/// Logarithm base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogBase {
    E,
    Two,
    Ten,
}

impl LogBase {
    pub const NAMES: &'static [(&'static str, LogBase)] = &[
        ("e", LogBase::E),
        ("2", LogBase::Two),
        ("10", LogBase::Ten),
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogBase::E => "e",
            LogBase::Two => "2",
            LogBase::Ten => "10",
        }
    }

    /// `output[i] = log_base(input[i])`
    pub fn apply(self, input: &[f32], output: &mut [f32]) {
        let f: fn(f32) -> f32 = match self {
            LogBase::E => f32::ln,
            LogBase::Two => f32::log2,
            LogBase::Ten => f32::log10,
        };
        for (o, &i) in output.iter_mut().zip(input.iter()) {
            *o = f(i);
        }
    }

    /// `output[i] = base^input[i]`
    pub fn invert(self, input: &[f32], output: &mut [f32]) {
        let f: fn(f32) -> f32 = match self {
            LogBase::E => f32::exp,
            LogBase::Two => f32::exp2,
            LogBase::Ten => |x| 10.0_f32.powf(x),
        };
        for (o, &i) in output.iter_mut().zip(input.iter()) {
            *o = f(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int16_float_conversion() {
        let mut floats = [0.0; 3];
        int16_to_float(&[-5, 0, 32767], &mut floats);
        assert_eq!(floats, [-5.0, 0.0, 32767.0]);

        let mut ints = [0i16; 4];
        float_to_int16(&[1.4, -1.6, 40000.0, -40000.0], &mut ints);
        assert_eq!(ints, [1, -2, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_log_base_two() {
        let mut out = [0.0; 4];
        LogBase::Two.apply(&[1.0, 2.0, 4.0, 8.0], &mut out);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_log_inverse() {
        for (_, base) in LogBase::NAMES {
            let input = [0.5, 1.0, 3.0];
            let mut logs = [0.0; 3];
            let mut back = [0.0; 3];
            base.apply(&input, &mut logs);
            base.invert(&logs, &mut back);
            for (a, b) in input.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }
}
