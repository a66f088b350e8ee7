//! Flux - change between consecutive normalised frames

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::ExtractionResult;
use crate::format::BufferFormat;
use crate::parameter_table;
use crate::parameters::{InvalidValue, ParameterTable};

/// Euclidean distance between each frame and its predecessor, both scaled by
/// the inverse of their sum of squares
///
/// The first frame has no predecessor and repeats the second frame's value.
#[derive(Debug, Default)]
pub struct Flux;

impl Kernel for Flux {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Flux";
    const DESCRIPTION: &'static str = "Measures how quickly the spectrum changes between frames";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {}
    }

    fn set_parameter(&mut self, _name: &str, _value: &str) -> Result<String, InvalidValue> {
        Err(InvalidValue)
    }

    fn output_size(&self, _input: &BufferFormat) -> usize {
        1
    }

    fn process(
        &self,
        input: &Frames<f32>,
        output: &mut Frames<f32>,
        _context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        let kernels = sfx_dsp::kernels();
        let inverse_sum = |frame: &[f32]| {
            let sum = (kernels.energy)(frame) * frame.len() as f32;
            if sum == 0.0 {
                1.0
            } else {
                1.0 / sum
            }
        };

        for i in 1..input.count() {
            output[i][0] = (kernels.normalized_distance)(
                &input[i],
                inverse_sum(&input[i]),
                &input[i - 1],
                inverse_sum(&input[i - 1]),
            );
        }
        if let Some(first) = output.blocks_mut().first_mut() {
            first[0] = 0.0;
        }
        if input.count() > 1 {
            output[0][0] = output[1][0];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TransformBase;
    use crate::format::ElementType;
    use crate::transforms::test_util::{float_frames, run};

    #[test]
    fn test_identical_frames_have_no_flux() {
        let mut transform = TransformBase::<Flux>::new();
        let format = BufferFormat::new(ElementType::Float32, 4, 16000);
        let frame = vec![1.0, 2.0, 3.0, 4.0];
        let output = run(&mut transform, &format, float_frames(vec![frame.clone(), frame]), 1);

        let frames = output.view::<f32>().unwrap();
        assert_eq!(frames.count(), 2);
        assert!(frames[1][0].abs() < 1e-6);
        assert_eq!(frames[0][0], frames[1][0]);
    }

    #[test]
    fn test_scale_invariant_change() {
        let mut transform = TransformBase::<Flux>::new();
        let format = BufferFormat::new(ElementType::Float32, 2, 16000);
        let output = run(
            &mut transform,
            &format,
            float_frames(vec![vec![1.0, 0.0], vec![0.0, 5.0], vec![0.0, 10.0]]),
            1,
        );

        let frames = output.view::<f32>().unwrap();
        // [1, 0] / 1 against [0, 5] / 25
        assert!((frames[1][0] - (1.0f32 + 0.04).sqrt()).abs() < 1e-5);
        // [0, 5] / 25 against [0, 10] / 100
        assert!((frames[2][0] - 0.1).abs() < 1e-5);
        assert_eq!(frames[0][0], frames[1][0]);
    }

    #[test]
    fn test_single_frame_is_zero() {
        let mut transform = TransformBase::<Flux>::new();
        let format = BufferFormat::new(ElementType::Float32, 2, 16000);
        let output = run(&mut transform, &format, float_frames(vec![vec![3.0, 4.0]]), 1);
        assert_eq!(output.view::<f32>().unwrap()[0][0], 0.0);
    }
}
