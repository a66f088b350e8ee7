//! Transform Trait
//!
//! The object-safe interface every pipeline stage implements. Concrete
//! transforms rarely implement it by hand: they supply a [`Kernel`] and let
//! [`TransformBase`] provide the plumbing.
//!
//! [`Kernel`]: crate::Kernel
//! [`TransformBase`]: crate::TransformBase

use std::any::Any;
use std::fmt;

use crate::buffers::Buffers;
use crate::cancel::CancellationToken;
use crate::error::ExtractionResult;
use crate::format::{BufferFormat, ElementType};
use crate::parameters::{ParameterTable, ParameterValues};

/// Per-call context handed to every stage of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    cancel: CancellationToken,
}

impl ProcessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose handle waits give up once `cancel` fires
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// One stage of feature processing
///
/// # Lifecycle
///
/// 1. `set_input_format` / `set_parameters` in any order (single-threaded)
/// 2. `initialize` once, building per-instance state and handle pools
/// 3. `process` from any number of threads
///
/// Changing the format or parameters after step 2 and calling `process`
/// before it are contract violations and panic.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Stable registry name
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn input_element_type(&self) -> ElementType;

    fn output_element_type(&self) -> ElementType;

    fn input_format(&self) -> Option<&BufferFormat>;

    /// Store the input format and recompute the output format
    ///
    /// Fails with `FormatMismatch` when the element type is not accepted.
    fn set_input_format(&mut self, format: &BufferFormat) -> ExtractionResult<()>;

    /// Derived from the input format and current parameters; `None` until negotiated
    fn output_format(&self) -> Option<&BufferFormat>;

    fn supported_parameters(&self) -> &'static ParameterTable;

    fn current_parameters(&self) -> &ParameterValues;

    /// Validate and apply each entry in order, stopping at the first failure
    fn set_parameters(&mut self, parameters: &[(String, String)]) -> ExtractionResult<()>;

    /// Build derived state, sizing handle pools for `workers` concurrent calls
    fn initialize(&mut self, workers: usize) -> ExtractionResult<()>;

    fn is_initialized(&self) -> bool;

    /// Zeroed output batch shaped by the output format
    fn create_output_buffers(&self, input: &Buffers) -> Buffers;

    fn process(
        &self,
        input: &Buffers,
        output: &mut Buffers,
        context: &ProcessContext,
    ) -> ExtractionResult<()>;

    fn is_invertible(&self) -> bool {
        false
    }

    /// Zeroed batch shaped by the input format, for `process_inverse`
    fn create_inverse_output_buffers(&self, input: &Buffers) -> Buffers;

    /// Map output-shaped buffers back to input-shaped ones
    ///
    /// # Panics
    /// Panics unless `is_invertible()` returns `true`.
    fn process_inverse(
        &self,
        input: &Buffers,
        output: &mut Buffers,
        context: &ProcessContext,
    ) -> ExtractionResult<()>;

    /// Fresh, uninitialized instance with the same parameter values
    fn clone_transform(&self) -> Box<dyn Transform>;

    /// Same concrete type with identical parameter values
    fn same_as(&self, other: &dyn Transform) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl PartialEq for dyn Transform {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Clone for Box<dyn Transform> {
    fn clone(&self) -> Self {
        self.clone_transform()
    }
}
