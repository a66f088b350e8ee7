//! SFX Core - Feature Extraction Framework
//!
//! This crate turns named chains of signal-processing stages into feature
//! vectors:
//! - `BufferFormat` / `Buffers`: typed frame batches exchanged between stages
//! - `Transform` + the generic `TransformBase` engine: format negotiation,
//!   validated textual parameters, checked element-type dispatch
//! - `TransformRegistry`: name-based factories for the built-in transforms
//! - `HandlePool`: bounded reuse of expensive per-call kernel contexts
//! - `Pipeline` / `FeatureExtractor`: atomic assembly, stage sharing, execution
//!
//! # Architecture
//!
//! ```text
//! ExtractorConfig ──▶ TransformRegistry ──▶ Pipeline per feature
//!                                              │ (shared prefixes)
//!   PCM ──▶ Window ──▶ Energy ──▶ Log ──▶ FeatureResult
//!              │          │
//!              └── HandlePool (one lease per frame, blocks when saturated)
//! ```
//!
//! Configuration (formats, parameters, `initialize`) is single-threaded and
//! happens before any `process` call; after that every type here is
//! `Send + Sync` and extraction can run from many threads at once.

mod base;
mod buffers;
mod cancel;
mod config;
mod error;
mod extractor;
mod feature;
mod format;
mod handle_pool;
mod parameters;
mod pipeline;
mod registry;
mod transform;
pub mod transforms;

pub use base::{Kernel, KernelContext, TransformBase};
pub use buffers::{Buffers, Element, Frames};
pub use cancel::CancellationToken;
pub use config::{ExtractorConfig, MAX_FEATURES_COUNT};
pub use error::{ExtractionError, ExtractionResult};
pub use extractor::{FeatureData, FeatureExtractor, FeatureResult};
pub use feature::{FeatureConfig, StageConfig};
pub use format::{BufferFormat, ElementType};
pub use handle_pool::{HandleLease, HandlePool};
pub use parameters::{
    parse_enum, parse_float, parse_int, parse_size, InvalidValue, ParameterTable, ParameterTraits,
    ParameterValues,
};
pub use pipeline::Pipeline;
pub use registry::{CreateFn, TransformFactory, TransformRegistry};
pub use transform::{ProcessContext, Transform};

// Re-export DSP types used in transform parameters
pub use sfx_dsp::{IirKind, LogBase, WindowType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = ExtractorConfig::speech_default();
        let _registry = TransformRegistry::global();
        let _context = ProcessContext::new();
    }
}
