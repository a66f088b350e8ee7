//! Energy - mean square of each frame

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::ExtractionResult;
use crate::format::BufferFormat;
use crate::parameter_table;
use crate::parameters::{InvalidValue, ParameterTable};

#[derive(Debug, Default)]
pub struct Energy;

impl Kernel for Energy {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Energy";
    const DESCRIPTION: &'static str = "Calculates the mean square of each frame";

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
        let energy = sfx_dsp::kernels().energy;
        for (source, sink) in input.iter().zip(output.iter_mut()) {
            sink[0] = energy(source);
        }
        Ok(())
    }
}
