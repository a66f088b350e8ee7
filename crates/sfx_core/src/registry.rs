//! Transform Registry - Name-Based Factory Table
//!
//! Maps each transform's stable name to a zero-argument constructor. The
//! process-wide table is built explicitly, once, on first use of
//! [`TransformRegistry::global`] and is read-only afterwards.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::base::{Kernel, TransformBase};
use crate::buffers::Element;
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::ElementType;
use crate::transform::Transform;
use crate::transforms::{
    Autocorrelation, Diffrect, Energy, Flux, Highpass, Log, Lowpass, Window,
};

/// Factory function type for creating default-constructed transforms
pub type CreateFn = Arc<dyn Fn() -> Box<dyn Transform> + Send + Sync>;

/// Factory for one transform type
#[derive(Clone)]
pub struct TransformFactory {
    pub name: &'static str,
    pub description: &'static str,
    pub input: ElementType,
    pub output: ElementType,
    pub create: CreateFn,
}

impl Debug for TransformFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformFactory")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

/// Registry of available transform types
#[derive(Debug, Default)]
pub struct TransformRegistry {
    factories: HashMap<&'static str, TransformFactory>,
    order: Vec<&'static str>,
}

impl TransformRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in transform registered
    pub fn with_builtin_transforms() -> Self {
        let mut registry = Self::new();
        registry
            .register_builtin_transforms()
            .unwrap_or_else(|e| panic!("built-in transform names collide: {e}"));
        registry
    }

    /// Process-wide registry of built-in transforms
    pub fn global() -> &'static TransformRegistry {
        static REGISTRY: OnceLock<TransformRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::with_builtin_transforms)
    }

    /// Register the transform implemented by kernel `K`
    pub fn register<K: Kernel>(&mut self) -> ExtractionResult<()> {
        self.register_factory(TransformFactory {
            name: K::NAME,
            description: K::DESCRIPTION,
            input: K::In::TYPE,
            output: K::Out::TYPE,
            create: Arc::new(TransformBase::<K>::boxed),
        })
    }

    /// Register a factory; a name that is already taken is rejected
    pub fn register_factory(&mut self, factory: TransformFactory) -> ExtractionResult<()> {
        if self.factories.contains_key(factory.name) {
            return Err(ExtractionError::DuplicateTransform(factory.name.to_string()));
        }
        debug!(transform = factory.name, "Registered transform");
        self.order.push(factory.name);
        self.factories.insert(factory.name, factory);
        Ok(())
    }

    pub fn get_factory(&self, name: &str) -> Option<&TransformFactory> {
        self.factories.get(name)
    }

    /// Fresh default instance of the named transform
    pub fn create(&self, name: &str) -> ExtractionResult<Box<dyn Transform>> {
        self.factories
            .get(name)
            .map(|factory| (factory.create)())
            .ok_or_else(|| ExtractionError::UnknownTransformName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn register_builtin_transforms(&mut self) -> ExtractionResult<()> {
        self.register::<Window>()?;
        self.register::<Lowpass>()?;
        self.register::<Highpass>()?;
        self.register::<Energy>()?;
        self.register::<Diffrect>()?;
        self.register::<Log>()?;
        self.register::<Autocorrelation>()?;
        self.register::<Flux>()?;
        Ok(())
    }
}
