//! Autocorrelation - full autocorrelation of each frame

use sfx_dsp::{CrossCorrelator, DspError};
use tracing::info;

use crate::base::{Kernel, KernelContext};
use crate::buffers::Frames;
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::BufferFormat;
use crate::handle_pool::HandlePool;
use crate::parameter_table;
use crate::parameters::{InvalidValue, ParameterTable};
use crate::transforms::for_each_pooled;

/// All `2 * size - 1` lags of each frame correlated with itself
///
/// Lag zero sits in the middle of the output frame.
#[derive(Default)]
pub struct Autocorrelation {
    pool: Option<HandlePool<CrossCorrelator>>,
}

impl Kernel for Autocorrelation {
    type In = f32;
    type Out = f32;

    const NAME: &'static str = "Autocorrelation";
    const DESCRIPTION: &'static str = "Finds the cross-correlation of the signal with itself";

    fn parameters() -> &'static ParameterTable {
        parameter_table! {}
    }

    fn set_parameter(&mut self, _name: &str, _value: &str) -> Result<String, InvalidValue> {
        Err(InvalidValue)
    }

    fn output_size(&self, input: &BufferFormat) -> usize {
        (input.size() * 2).saturating_sub(1)
    }

    fn initialize(
        &mut self,
        input: &BufferFormat,
        _output: &BufferFormat,
        workers: usize,
    ) -> ExtractionResult<()> {
        let pool = HandlePool::build(workers, |_| CrossCorrelator::new(input.size(), input.size()))
            .map_err(|source: DspError| ExtractionError::HandleConstruction {
                transform: Self::NAME.to_string(),
                source,
            })?;
        info!(
            transform = Self::NAME,
            handles = pool.len(),
            size = input.size(),
            "Built correlation handles"
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
            .expect("Autocorrelation handles are built by initialize");
        for_each_pooled(
            pool,
            input,
            output,
            context.process.cancellation(),
            |correlator, source, sink| correlator.correlate(source, source, sink),
        )
    }
}
