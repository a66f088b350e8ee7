//! Generic Transform Engine
//!
//! [`TransformBase`] binds one [`Kernel`] (a small per-transform policy with
//! compile-time element types) to the object-safe [`Transform`] contract. It
//! owns format propagation, ordered parameter application and checked
//! buffer downcasts, so kernels only see correctly typed frames of the
//! negotiated sizes.

use std::any::Any;
use std::fmt;

use tracing::debug;

use crate::buffers::{Buffers, Element, Frames};
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::{BufferFormat, ElementType};
use crate::parameters::{InvalidValue, ParameterTable, ParameterValues};
use crate::transform::{ProcessContext, Transform};

/// Formats and call context visible to a kernel during `process`
#[derive(Debug, Clone, Copy)]
pub struct KernelContext<'a> {
    pub input: &'a BufferFormat,
    pub output: &'a BufferFormat,
    pub process: &'a ProcessContext,
}

/// Transform-specific policy plugged into [`TransformBase`]
pub trait Kernel: Default + Send + Sync + 'static {
    type In: Element;
    type Out: Element;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const INVERTIBLE: bool = false;

    fn parameters() -> &'static ParameterTable;

    /// Parse and store one parameter, returning its canonical spelling
    ///
    /// Must leave `self` untouched on error, and must accept its own
    /// canonical spelling back unchanged.
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<String, InvalidValue>;

    /// Output frame size for a given input format
    fn output_size(&self, input: &BufferFormat) -> usize;

    /// Output frame count for `input_count` input frames
    fn output_count(&self, _input: &BufferFormat, input_count: usize) -> usize {
        input_count
    }

    /// Build coefficient tables and handle pools from the final formats
    fn initialize(
        &mut self,
        _input: &BufferFormat,
        _output: &BufferFormat,
        _workers: usize,
    ) -> ExtractionResult<()> {
        Ok(())
    }

    fn process(
        &self,
        input: &Frames<Self::In>,
        output: &mut Frames<Self::Out>,
        context: &KernelContext<'_>,
    ) -> ExtractionResult<()>;

    fn process_inverse(
        &self,
        _input: &Frames<Self::Out>,
        _output: &mut Frames<Self::In>,
        _context: &KernelContext<'_>,
    ) -> ExtractionResult<()> {
        panic!("{} does not support inverse processing", Self::NAME)
    }
}

/// [`Transform`] implementation shared by every kernel
pub struct TransformBase<K: Kernel> {
    kernel: K,
    input: Option<BufferFormat>,
    output: Option<BufferFormat>,
    parameters: ParameterValues,
    initialized: bool,
}

impl<K: Kernel> TransformBase<K> {
    /// Instance with every parameter at its default
    pub fn new() -> Self {
        let mut kernel = K::default();
        let mut parameters = ParameterValues::default();
        for (name, traits) in K::parameters().iter() {
            let canonical = kernel
                .set_parameter(name, traits.default_value)
                .unwrap_or_else(|_| {
                    panic!(
                        "{} default \"{}\" for parameter \"{}\" is rejected by its own setter",
                        K::NAME,
                        traits.default_value,
                        name
                    )
                });
            parameters.set(name, &canonical);
        }
        Self {
            kernel,
            input: None,
            output: None,
            parameters,
            initialized: false,
        }
    }

    /// Boxed default instance, the shape registry factories produce
    pub fn boxed() -> Box<dyn Transform> {
        Box::new(Self::new())
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    fn renegotiate(&mut self) {
        let Some(input) = &self.input else {
            return;
        };
        let size = self.kernel.output_size(input);
        let output = self.output.get_or_insert_with(|| {
            BufferFormat::new(K::Out::TYPE, size, input.sampling_rate())
        });
        output.set_size(size);
        output.set_sampling_rate(input.sampling_rate());
        output.set_alignment_offset(input.alignment_offset());
        debug!(transform = K::NAME, input = %input, output = %output, "Negotiated output format");
    }

    fn assert_configurable(&self, what: &str) {
        assert!(
            !self.initialized,
            "{} cannot change its {} after initialize",
            K::NAME,
            what
        );
    }

    fn negotiated(&self) -> (&BufferFormat, &BufferFormat) {
        assert!(self.initialized, "{} processed before initialize", K::NAME);
        match (&self.input, &self.output) {
            (Some(input), Some(output)) => (input, output),
            _ => unreachable!("initialized transform without negotiated formats"),
        }
    }
}

impl<K: Kernel> Default for TransformBase<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> fmt::Debug for TransformBase<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformBase")
            .field("name", &K::NAME)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("parameters", &self.parameters)
            .field("initialized", &self.initialized)
            .finish()
    }
}

fn typed<'a, T: Element>(transform: &str, buffers: &'a Buffers) -> ExtractionResult<&'a Frames<T>> {
    let got = buffers.element_type();
    buffers.view::<T>().ok_or_else(|| ExtractionError::FormatMismatch {
        transform: transform.to_string(),
        expected: T::TYPE,
        got,
    })
}

fn check_frames<T: Element>(transform: &str, frames: &Frames<T>, size: usize) -> ExtractionResult<()> {
    match frames.blocks().iter().find(|block| block.len() != size) {
        Some(block) => Err(ExtractionError::FrameSizeMismatch {
            transform: transform.to_string(),
            expected: size,
            got: block.len(),
        }),
        None => Ok(()),
    }
}

fn check_count(transform: &str, expected: usize, got: usize) -> ExtractionResult<()> {
    if expected != got {
        return Err(ExtractionError::FrameCountMismatch {
            transform: transform.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

fn typed_mut<'a, T: Element>(
    transform: &str,
    buffers: &'a mut Buffers,
) -> ExtractionResult<&'a mut Frames<T>> {
    let got = buffers.element_type();
    buffers.view_mut::<T>().ok_or_else(|| ExtractionError::FormatMismatch {
        transform: transform.to_string(),
        expected: T::TYPE,
        got,
    })
}

impl<K: Kernel> Transform for TransformBase<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn description(&self) -> &'static str {
        K::DESCRIPTION
    }

    fn input_element_type(&self) -> ElementType {
        K::In::TYPE
    }

    fn output_element_type(&self) -> ElementType {
        K::Out::TYPE
    }

    fn input_format(&self) -> Option<&BufferFormat> {
        self.input.as_ref()
    }

    fn set_input_format(&mut self, format: &BufferFormat) -> ExtractionResult<()> {
        if format.element_type() != K::In::TYPE {
            return Err(ExtractionError::FormatMismatch {
                transform: K::NAME.to_string(),
                expected: K::In::TYPE,
                got: format.element_type(),
            });
        }
        if self.input.as_ref() == Some(format) {
            return Ok(());
        }
        self.assert_configurable("input format");
        self.input = Some(format.clone());
        self.renegotiate();
        Ok(())
    }

    fn output_format(&self) -> Option<&BufferFormat> {
        self.output.as_ref()
    }

    fn supported_parameters(&self) -> &'static ParameterTable {
        K::parameters()
    }

    fn current_parameters(&self) -> &ParameterValues {
        &self.parameters
    }

    fn set_parameters(&mut self, parameters: &[(String, String)]) -> ExtractionResult<()> {
        let table = K::parameters();
        for (name, value) in parameters {
            if !table.contains(name) {
                return Err(ExtractionError::UnknownParameter {
                    name: name.clone(),
                    transform: K::NAME.to_string(),
                });
            }
            let invalid = |_: InvalidValue| ExtractionError::InvalidParameterValue {
                name: name.clone(),
                value: value.clone(),
                transform: K::NAME.to_string(),
            };
            if self.initialized {
                // Only spellings of the current value are accepted now
                let canonical = K::default().set_parameter(name, value).map_err(invalid)?;
                if self.parameters.get(name) != Some(canonical.as_str()) {
                    self.assert_configurable("parameters");
                }
                continue;
            }
            let canonical = self.kernel.set_parameter(name, value).map_err(invalid)?;
            if self.parameters.get(name) == Some(canonical.as_str()) {
                continue;
            }
            self.parameters.set(name, &canonical);
            debug!(transform = K::NAME, parameter = %name, value = %canonical, "Parameter applied");
            self.renegotiate();
        }
        Ok(())
    }

    fn initialize(&mut self, workers: usize) -> ExtractionResult<()> {
        if self.initialized {
            return Ok(());
        }
        let (Some(input), Some(output)) = (&self.input, &self.output) else {
            return Err(ExtractionError::UnnegotiatedFormat(K::NAME.to_string()));
        };
        self.kernel.initialize(input, output, workers.max(1))?;
        self.initialized = true;
        debug!(transform = K::NAME, workers, "Transform initialized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn create_output_buffers(&self, input: &Buffers) -> Buffers {
        let (input_format, output_format) = match (&self.input, &self.output) {
            (Some(i), Some(o)) => (i, o),
            _ => panic!("{} has no negotiated output format", K::NAME),
        };
        let count = self.kernel.output_count(input_format, input.count());
        Frames::<K::Out>::with_format(count, output_format).into()
    }

    fn process(
        &self,
        input: &Buffers,
        output: &mut Buffers,
        context: &ProcessContext,
    ) -> ExtractionResult<()> {
        let (input_format, output_format) = self.negotiated();
        let source = typed::<K::In>(K::NAME, input)?;
        let sink = typed_mut::<K::Out>(K::NAME, output)?;
        check_frames(K::NAME, source, input_format.size())?;
        check_frames(K::NAME, sink, output_format.size())?;
        check_count(
            K::NAME,
            self.kernel.output_count(input_format, source.count()),
            sink.count(),
        )?;
        self.kernel.process(
            source,
            sink,
            &KernelContext {
                input: input_format,
                output: output_format,
                process: context,
            },
        )
    }

    fn is_invertible(&self) -> bool {
        K::INVERTIBLE
    }

    fn create_inverse_output_buffers(&self, input: &Buffers) -> Buffers {
        let Some(input_format) = &self.input else {
            panic!("{} has no negotiated input format", K::NAME);
        };
        Frames::<K::In>::with_format(input.count(), input_format).into()
    }

    fn process_inverse(
        &self,
        input: &Buffers,
        output: &mut Buffers,
        context: &ProcessContext,
    ) -> ExtractionResult<()> {
        assert!(
            K::INVERTIBLE,
            "{} does not support inverse processing",
            K::NAME
        );
        let (input_format, output_format) = self.negotiated();
        let source = typed::<K::Out>(K::NAME, input)?;
        let sink = typed_mut::<K::In>(K::NAME, output)?;
        check_frames(K::NAME, source, output_format.size())?;
        check_frames(K::NAME, sink, input_format.size())?;
        check_count(K::NAME, source.count(), sink.count())?;
        self.kernel.process_inverse(
            source,
            sink,
            &KernelContext {
                input: output_format,
                output: input_format,
                process: context,
            },
        )
    }

    fn clone_transform(&self) -> Box<dyn Transform> {
        let mut clone = Self::new();
        clone.parameters = self.parameters.clone();
        for (name, value) in self.parameters.iter() {
            clone
                .kernel
                .set_parameter(name, value)
                .unwrap_or_else(|_| unreachable!("stored parameter values were validated"));
        }
        Box::new(clone)
    }

    fn same_as(&self, other: &dyn Transform) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.parameters == self.parameters)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
