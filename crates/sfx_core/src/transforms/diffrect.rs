//! Diffrect - rectified first difference

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::ExtractionResult;
use crate::format::BufferFormat;
use crate::parameter_table;
use crate::parameters::{InvalidValue, ParameterTable};

/// `out[i] = max(in[i + 1] - in[i], 0)`
#[derive(Debug, Default)]
pub struct Diffrect;

impl Kernel for Diffrect {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Diffrect";
    const DESCRIPTION: &'static str =
        "Differentiates the signal and replaces negative values with zeros";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {}
    }

    fn set_parameter(&mut self, _name: &str, _value: &str) -> Result<String, InvalidValue> {
        Err(InvalidValue)
    }

    fn output_size(&self, input: &BufferFormat) -> usize {
        input.size().saturating_sub(1)
    }

    fn process(
        &self,
        input: &Frames<f32>,
        output: &mut Frames<f32>,
        _context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        let diffrect = sfx_dsp::kernels().diffrect;
        for (source, sink) in input.iter().zip(output.iter_mut()) {
            diffrect(source, sink);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TransformBase;
    use crate::error::ExtractionError;
    use crate::format::ElementType;
    use crate::transform::{ProcessContext, Transform};
    use crate::transforms::test_util::{float_frames, run};

    #[test]
    fn test_rectified_difference() {
        let mut transform = TransformBase::<Diffrect>::new();
        let format = BufferFormat::new(ElementType::Float32, 4, 16000);
        let output = run(
            &mut transform,
            &format,
            float_frames(vec![vec![1.0, 3.0, 2.0, 5.0]]),
            1,
        );

        assert_eq!(transform.output_format().unwrap().size(), 3);
        assert_eq!(&output.view::<f32>().unwrap()[0], &[2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_has_no_parameters() {
        let transform = TransformBase::<Diffrect>::new();
        assert!(transform.current_parameters().is_empty());
    }

    #[test]
    fn test_short_frame_is_an_error() {
        let mut transform = TransformBase::<Diffrect>::new();
        let format = BufferFormat::new(ElementType::Float32, 4, 16000);
        transform.set_input_format(&format).unwrap();
        transform.initialize(1).unwrap();

        let input = float_frames(vec![vec![1.0, 3.0]]);
        let mut output = transform.create_output_buffers(&input);
        let err = transform
            .process(&input, &mut output, &ProcessContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::FrameSizeMismatch { expected: 4, got: 2, .. }
        ));
    }
}
