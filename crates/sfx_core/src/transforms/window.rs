//! Window - splits PCM buffers into overlapping weighted frames

use rayon::prelude::*;
use sfx_dsp::WindowType;

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::ExtractionResult;
use crate::format::BufferFormat;
use crate::parameter_table;
use crate::parameters::{parse_enum, parse_size, InvalidValue, ParameterTable};

/// Cuts `length`-sample frames every `step` samples and applies a window
///
/// Each input frame of `size` samples yields `(size - length) / step + 1`
/// output frames, or none when it is shorter than `length`.
#[derive(Debug)]
pub struct Window {
    length: usize,
    step: usize,
    window_type: WindowType,
    coefficients: Vec<f32>,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            length: 512,
            step: 256,
            window_type: WindowType::Hamming,
            coefficients: Vec::new(),
        }
    }
}

impl Window {
    fn frames_per_input(&self, input: &BufferFormat) -> usize {
        if input.size() < self.length {
            0
        } else {
            (input.size() - self.length) / self.step + 1
        }
    }
}

impl Kernel for Window {
    type In = i16;
    type Out = f32;

    const NAME: &'static str = "Window";
    const DESCRIPTION: &'static str = "Splits the signal into overlapping windowed frames";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {
            "length" => ("Window length in samples", "512"),
            "step" => ("Distance between consecutive windows in samples", "256"),
            "type" => ("Window function (rectangular, hamming, hann, blackman)", "hamming"),
        }
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<String, InvalidValue> {
        match name {
            "length" => {
                self.length = parse_size(value, 16..=8192)?;
                Ok(self.length.to_string())
            }
            "step" => {
                self.step = parse_size(value, 1..=8192)?;
                Ok(self.step.to_string())
            }
            "type" => {
                self.window_type = parse_enum(value, WindowType::NAMES)?;
                Ok(self.window_type.name().to_string())
            }
            _ => Err(InvalidValue),
        }
    }

    fn output_size(&self, _input: &BufferFormat) -> usize {
        self.length
    }

    fn output_count(&self, input: &BufferFormat, input_count: usize) -> usize {
        input_count * self.frames_per_input(input)
    }

    fn initialize(
        &mut self,
        _input: &BufferFormat,
        _output: &BufferFormat,
        _workers: usize,
    ) -> ExtractionResult<()> {
        self.coefficients = sfx_dsp::window(self.window_type, self.length);
        Ok(())
    }

    fn process(
        &self,
        input: &Frames<i16>,
        output: &mut Frames<f32>,
        context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        let per_input = self.frames_per_input(context.input);
        if per_input == 0 {
            return Ok(());
        }

        input
            .blocks()
            .par_iter()
            .zip(output.blocks_mut().par_chunks_mut(per_input))
            .for_each(|(source, sinks)| {
                for (index, sink) in sinks.iter_mut().enumerate() {
                    let start = index * self.step;
                    let samples = &source[start..start + self.length];
                    for ((o, &s), &w) in sink.iter_mut().zip(samples).zip(&self.coefficients) {
                        *o = s as f32 * w;
                    }
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TransformBase;
    use crate::buffers::Buffers;
    use crate::error::ExtractionError;
    use crate::format::ElementType;
    use crate::transform::{ProcessContext, Transform};
    use crate::transforms::test_util::{pairs, run};

    fn pcm_format(size: usize) -> BufferFormat {
        BufferFormat::new(ElementType::Int16, size, 16000)
    }

    #[test]
    fn test_rectangular_frames_overlap_by_step() {
        let mut transform = TransformBase::<Window>::new();
        transform
            .set_parameters(&pairs(&[("length", "16"), ("step", "8"), ("type", "rectangular")]))
            .unwrap();
        let samples: Vec<i16> = (0..40).collect();
        let output = run(&mut transform, &pcm_format(40), Buffers::from_pcm(&samples), 1);

        let frames = output.view::<f32>().unwrap();
        // (40 - 16) / 8 + 1
        assert_eq!(frames.count(), 4);
        assert_eq!(frames.frame_size(), 16);
        assert_eq!(frames[1][0], 8.0);
        assert_eq!(frames[3][15], 39.0);
    }

    #[test]
    fn test_hamming_tapers_edges() {
        let mut transform = TransformBase::<Window>::new();
        transform
            .set_parameters(&pairs(&[("length", "64"), ("step", "64")]))
            .unwrap();
        let output = run(&mut transform, &pcm_format(64), Buffers::from_pcm(&[1000; 64]), 1);

        let frame = &output.view::<f32>().unwrap()[0];
        assert!(frame[0] < 100.0);
        assert!(frame[32] > 900.0);
    }

    #[test]
    fn test_short_input_yields_no_frames() {
        let mut transform = TransformBase::<Window>::new();
        let output = run(&mut transform, &pcm_format(100), Buffers::from_pcm(&[0; 100]), 1);
        assert_eq!(output.count(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_length() {
        let mut transform = TransformBase::<Window>::new();
        assert!(transform.set_parameters(&pairs(&[("length", "8")])).is_err());
        assert!(transform.set_parameters(&pairs(&[("type", "kaiser")])).is_err());
        assert_eq!(transform.current_parameters().get("length"), Some("512"));
    }

    #[test]
    fn test_equivalent_lengths_compare_equal() {
        let mut padded = TransformBase::<Window>::new();
        padded.set_parameters(&pairs(&[("length", "0256")])).unwrap();
        let mut plain = TransformBase::<Window>::new();
        plain.set_parameters(&pairs(&[("length", "256")])).unwrap();

        assert_eq!(padded.current_parameters().get("length"), Some("256"));
        assert!(padded.same_as(&plain));
    }

    #[test]
    fn test_frame_shorter_than_format_is_an_error() {
        let mut transform = TransformBase::<Window>::new();
        transform
            .set_parameters(&pairs(&[("length", "16"), ("step", "16")]))
            .unwrap();
        transform.set_input_format(&pcm_format(64)).unwrap();
        transform.initialize(1).unwrap();

        let input = Buffers::from_pcm(&[0; 20]);
        let mut output = transform.create_output_buffers(&input);
        let err = transform
            .process(&input, &mut output, &ProcessContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::FrameSizeMismatch { ref transform, expected: 64, got: 20 } if transform == "Window"
        ));
    }
}
