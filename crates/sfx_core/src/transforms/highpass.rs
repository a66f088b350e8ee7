//! Highpass - cascaded biquad high-pass filter

use sfx_dsp::{DspError, IirCascade, IirKind, MAX_IIR_ORDER};
use tracing::info;

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::BufferFormat;
use crate::handle_pool::HandlePool;
use crate::parameter_table;
use crate::parameters::{parse_enum, parse_float, parse_int, InvalidValue, ParameterTable};
use crate::transforms::for_each_pooled;

/// High-pass IIR filter; every frame is filtered from a cleared state
pub struct Highpass {
    kind: IirKind,
    order: usize,
    frequency: i64,
    ripple: f32,
    pool: Option<HandlePool<IirCascade>>,
}

impl Default for Highpass {
    fn default() -> Self {
        Self {
            kind: IirKind::Butterworth,
            order: 2,
            frequency: 1000,
            ripple: 1.0,
            pool: None,
        }
    }
}

impl Kernel for Highpass {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Highpass";
    const DESCRIPTION: &'static str = "High-pass IIR filter built from cascaded biquad sections";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {
            "type" => ("Filter family (butterworth, bessel, chebyshev1, chebyshev2)", "butterworth"),
            "order" => ("Number of poles", "2"),
            "frequency" => ("Cutoff frequency in Hz", "1000"),
            "ripple" => ("Chebyshev passband ripple or stopband attenuation in dB", "1"),
        }
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<String, InvalidValue> {
        match name {
            "type" => {
                self.kind = parse_enum(value, IirKind::NAMES)?;
                Ok(self.kind.name().to_string())
            }
            "order" => {
                self.order = parse_int(value, 1..=MAX_IIR_ORDER as i64)? as usize;
                Ok(self.order.to_string())
            }
            "frequency" => {
                self.frequency = parse_int(value, 10..=24000)?;
                Ok(self.frequency.to_string())
            }
            "ripple" => {
                self.ripple = parse_float(value, 0.01..=100.0)?;
                Ok(self.ripple.to_string())
            }
            _ => Err(InvalidValue),
        }
    }

    fn output_size(&self, input: &BufferFormat) -> usize {
        input.size()
    }

    fn initialize(
        &mut self,
        input: &BufferFormat,
        _output: &BufferFormat,
        workers: usize,
    ) -> ExtractionResult<()> {
        let handle_error = |source: DspError| ExtractionError::HandleConstruction {
            transform: Self::NAME.to_string(),
            source,
        };
        let cascade = IirCascade::highpass(
            self.kind,
            self.order,
            self.frequency as f32,
            self.ripple,
            input.sampling_rate() as f32,
        )
        .map_err(handle_error)?;

        let pool = HandlePool::build(workers, |_| Ok::<_, DspError>(cascade.clone()))
            .map_err(handle_error)?;
        info!(
            transform = Self::NAME,
            handles = pool.len(),
            sections = cascade.sections(),
            "Built filter handles"
        );
        self.pool = Some(pool);
        Ok(())
    }

    fn process(
        &self,
        input: &Frames<f32>,
        output: &mut Frames<f32>,
        context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        let pool = self
            .pool
            .as_ref()
            .expect("Highpass handles are built by initialize");
        for_each_pooled(
            pool,
            input,
            output,
            context.process.cancellation(),
            |cascade, source, sink| {
                cascade.reset();
                cascade.process(source, sink);
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TransformBase;
    use crate::format::ElementType;
    use crate::transform::Transform;
    use crate::transforms::test_util::{float_frames, pairs, run};

    #[test]
    fn test_blocks_dc() {
        let mut transform = TransformBase::<Highpass>::new();
        transform.set_parameters(&pairs(&[("frequency", "500")])).unwrap();
        let format = BufferFormat::new(ElementType::Float32, 2048, 16000);
        let output = run(&mut transform, &format, float_frames(vec![vec![1.0; 2048]]), 2);

        let frame = &output.view::<f32>().unwrap()[0];
        assert_eq!(frame.len(), 2048);
        assert!(frame[2047].abs() < 1e-3, "dc leaked: {}", frame[2047]);
    }

    #[test]
    fn test_frames_are_independent() {
        let mut transform = TransformBase::<Highpass>::new();
        let format = BufferFormat::new(ElementType::Float32, 64, 16000);
        let frame: Vec<f32> = (0..64).map(|i| (i as f32 * 0.7).sin()).collect();
        let output = run(
            &mut transform,
            &format,
            float_frames(vec![frame.clone(), frame.clone(), frame]),
            1,
        );

        let frames = output.view::<f32>().unwrap();
        assert_eq!(&frames[0], &frames[1]);
        assert_eq!(&frames[1], &frames[2]);
    }

    /// Output to input RMS ratio in dB for a `frequency` Hz sine at 16 kHz
    fn gain_db(transform: &mut TransformBase<Highpass>, frequency: f32) -> f32 {
        let format = BufferFormat::new(ElementType::Float32, 16000, 16000);
        let tone: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / 16000.0).sin())
            .collect();
        let output = run(transform, &format, float_frames(vec![tone.clone()]), 1);

        let rms = |x: &[f32]| (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt();
        let frame = &output.view::<f32>().unwrap()[0];
        20.0 * (rms(&frame[14400..]) / rms(&tone[14400..])).log10()
    }

    #[test]
    fn test_default_is_3db_down_at_cutoff() {
        let mut transform = TransformBase::<Highpass>::new();
        let gain = gain_db(&mut transform, 1000.0);
        assert!((gain + 3.01).abs() < 0.1, "gain at cutoff: {} dB", gain);
    }

    #[test]
    fn test_chebyshev_ripple_reaches_the_filter() {
        let mut transform = TransformBase::<Highpass>::new();
        transform
            .set_parameters(&pairs(&[("type", "chebyshev1"), ("order", "4"), ("ripple", "0.5")]))
            .unwrap();
        assert_eq!(transform.current_parameters().get("ripple"), Some("0.5"));
        let gain = gain_db(&mut transform, 1000.0);
        assert!((gain + 0.5).abs() < 0.1, "gain at passband edge: {} dB", gain);
    }

    #[test]
    fn test_rejects_order_above_maximum() {
        let mut transform = TransformBase::<Highpass>::new();
        assert!(transform.set_parameters(&pairs(&[("order", "17")])).is_err());
        assert!(transform.set_parameters(&pairs(&[("ripple", "0")])).is_err());
        assert!(transform
            .set_parameters(&pairs(&[("type", "chebyshev2"), ("order", "16")]))
            .is_ok());
        assert_eq!(transform.current_parameters().get("type"), Some("chebyshev2"));
        assert_eq!(transform.current_parameters().get("order"), Some("16"));
    }
}
