//! Lowpass - windowed-sinc FIR filter over 16-bit PCM

use sfx_dsp::{Convolver, DspError, WindowType};
use tracing::info;

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::BufferFormat;
use crate::handle_pool::HandlePool;
use crate::parameter_table;
use crate::parameters::{parse_enum, parse_int, InvalidValue, ParameterTable};
use crate::transforms::for_each_pooled;

/// Convolution plan plus float scratch for one concurrent call
struct LowpassHandle {
    convolver: Convolver,
    input: Vec<f32>,
    output: Vec<f32>,
}

/// Full linear convolution with a low-pass kernel; output grows by `length - 1`
pub struct Lowpass {
    length: usize,
    window_type: WindowType,
    frequency: i64,
    pool: Option<HandlePool<LowpassHandle>>,
}

impl Default for Lowpass {
    fn default() -> Self {
        Self {
            length: 64,
            window_type: WindowType::Hamming,
            frequency: 2000,
            pool: None,
        }
    }
}

impl Kernel for Lowpass {
    type In = i16;
    type Out = i16;

    const NAME: &'static str = "Lowpass";
    const DESCRIPTION: &'static str = "Low-pass FIR filter designed with the windowed-sinc method";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {
            "length" => ("Filter length in taps", "64"),
            "window" => ("Window applied to the sinc kernel", "hamming"),
            "frequency" => ("Cutoff frequency in Hz", "2000"),
        }
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<String, InvalidValue> {
        match name {
            "length" => {
                self.length = parse_int(value, 8..=512)? as usize;
                Ok(self.length.to_string())
            }
            "window" => {
                self.window_type = parse_enum(value, WindowType::NAMES)?;
                Ok(self.window_type.name().to_string())
            }
            "frequency" => {
                self.frequency = parse_int(value, 100..=24000)?;
                Ok(self.frequency.to_string())
            }
            _ => Err(InvalidValue),
        }
    }

    fn output_size(&self, input: &BufferFormat) -> usize {
        input.size() + self.length - 1
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
        let kernel = sfx_dsp::lowpass_kernel(
            self.length,
            self.window_type,
            self.frequency as f32,
            input.sampling_rate(),
        )
        .map_err(handle_error)?;

        let pool = HandlePool::build(workers, |_| -> Result<LowpassHandle, DspError> {
            let convolver = Convolver::new(input.size(), &kernel)?;
            Ok(LowpassHandle {
                input: vec![0.0; convolver.input_len()],
                output: vec![0.0; convolver.output_len()],
                convolver,
            })
        })
        .map_err(handle_error)?;

        info!(
            transform = Self::NAME,
            handles = pool.len(),
            taps = kernel.len(),
            "Built convolution handles"
        );
        self.pool = Some(pool);
        Ok(())
    }

    fn process(
        &self,
        input: &Frames<i16>,
        output: &mut Frames<i16>,
        context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        let pool = self
            .pool
            .as_ref()
            .expect("Lowpass handles are built by initialize");
        for_each_pooled(
            pool,
            input,
            output,
            context.process.cancellation(),
            |handle, source, sink| {
                sfx_dsp::int16_to_float(source, &mut handle.input);
                handle.convolver.process(&handle.input, &mut handle.output);
                sfx_dsp::float_to_int16(&handle.output, sink);
            },
        )
    }
}
