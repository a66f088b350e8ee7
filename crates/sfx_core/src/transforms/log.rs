//! Log - element-wise logarithm with a selectable base

use sfx_dsp::LogBase;

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::ExtractionResult;
use crate::format::BufferFormat;
use crate::parameter_table;
use crate::parameters::{parse_enum, InvalidValue, ParameterTable};

/// Logarithm of each sample; the inverse raises the base to each sample
#[derive(Debug)]
pub struct Log {
    base: LogBase,
}

impl Default for Log {
    fn default() -> Self {
        Self { base: LogBase::E }
    }
}

impl Kernel for Log {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Log";
    const DESCRIPTION: &'static str = "Takes the logarithm of each sample";
    const INVERTIBLE: bool = true;

    fn parameters() -> &'static ParameterTable {
        parameter_table! {
            "base" => ("Logarithm base (e, 2 or 10)", "e"),
        }
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<String, InvalidValue> {
        match name {
            "base" => {
                self.base = parse_enum(value, LogBase::NAMES)?;
                Ok(self.base.name().to_string())
            }
            _ => Err(InvalidValue),
        }
    }

    fn output_size(&self, input: &BufferFormat) -> usize {
        input.size()
    }

    fn process(
        &self,
        input: &Frames<f32>,
        output: &mut Frames<f32>,
        _context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        for (source, sink) in input.iter().zip(output.iter_mut()) {
            self.base.apply(source, sink);
        }
        Ok(())
    }

    fn process_inverse(
        &self,
        input: &Frames<f32>,
        output: &mut Frames<f32>,
        _context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        for (source, sink) in input.iter().zip(output.iter_mut()) {
            self.base.invert(source, sink);
        }
        Ok(())
    }
}
