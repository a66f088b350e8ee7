//! Pipeline Assembly and Execution
//!
//! A pipeline is an ordered chain of initialized transforms whose adjacent
//! formats agree. Assembly is all-or-nothing: any unknown name, rejected
//! parameter, format mismatch or handle construction failure drops every
//! instance built so far.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::buffers::Buffers;
use crate::error::{ExtractionError, ExtractionResult};
use crate::feature::StageConfig;
use crate::format::BufferFormat;
use crate::registry::TransformRegistry;
use crate::transform::{ProcessContext, Transform};

/// Stage outputs of one run, keyed by stage identity
pub(crate) type StageCache = HashMap<usize, Arc<Buffers>>;

fn stage_id(stage: &Arc<dyn Transform>) -> usize {
    Arc::as_ptr(stage) as *const () as usize
}

/// Ordered chain of initialized transforms
#[derive(Debug, Clone)]
pub struct Pipeline {
    input_format: BufferFormat,
    stages: Vec<Arc<dyn Transform>>,
}

impl Pipeline {
    /// Resolve, configure and initialize `stages` in order
    pub fn assemble(
        registry: &TransformRegistry,
        stages: &[StageConfig],
        input_format: &BufferFormat,
        workers: usize,
    ) -> ExtractionResult<Self> {
        Self::assemble_sharing(registry, stages, input_format, workers, &[])
    }

    /// Like [`Pipeline::assemble`], reusing the stages of `existing` pipelines
    /// for the longest prefix that is identical in type, parameters and format
    pub fn assemble_sharing(
        registry: &TransformRegistry,
        stages: &[StageConfig],
        input_format: &BufferFormat,
        workers: usize,
        existing: &[Pipeline],
    ) -> ExtractionResult<Self> {
        if stages.is_empty() {
            return Err(ExtractionError::InvalidConfiguration(
                "A pipeline needs at least one stage".to_string(),
            ));
        }

        let mut candidates: Vec<&Pipeline> = existing
            .iter()
            .filter(|p| &p.input_format == input_format)
            .collect();
        let mut shared: Vec<Arc<dyn Transform>> = Vec::new();
        let mut fresh: Vec<Box<dyn Transform>> = Vec::new();
        let mut format = input_format.clone();

        for (index, config) in stages.iter().enumerate() {
            let mut transform = registry.create(&config.transform)?;
            transform.set_parameters(&config.parameters)?;
            transform.set_input_format(&format)?;
            format = transform
                .output_format()
                .cloned()
                .ok_or_else(|| ExtractionError::UnnegotiatedFormat(transform.name().to_string()))?;

            if fresh.is_empty() {
                let reusable = candidates.iter().find_map(|p| {
                    p.stages
                        .get(index)
                        .filter(|s| s.same_as(&*transform) && s.input_format() == transform.input_format())
                        .cloned()
                });
                if let Some(stage) = reusable {
                    candidates.retain(|p| p.stages.get(index).is_some_and(|s| Arc::ptr_eq(s, &stage)));
                    debug!(transform = stage.name(), index, "Sharing initialized stage");
                    shared.push(stage);
                    continue;
                }
            }
            fresh.push(transform);
        }

        let shared_count = shared.len();
        let mut built = shared;
        for mut transform in fresh {
            transform.initialize(workers)?;
            built.push(Arc::from(transform));
        }

        info!(
            stages = built.len(),
            shared = shared_count,
            "Assembled pipeline {}",
            describe(&built)
        );
        Ok(Self {
            input_format: input_format.clone(),
            stages: built,
        })
    }

    pub fn input_format(&self) -> &BufferFormat {
        &self.input_format
    }

    /// Format of the last stage's output
    pub fn output_format(&self) -> &BufferFormat {
        self.stages
            .last()
            .and_then(|s| s.output_format())
            .unwrap_or(&self.input_format)
    }

    pub fn stages(&self) -> &[Arc<dyn Transform>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `input`
    pub fn process(&self, input: Buffers, context: &ProcessContext) -> ExtractionResult<Buffers> {
        self.check_input(&input)?;
        let mut current = input;
        for stage in &self.stages {
            let mut output = stage.create_output_buffers(&current);
            stage.process(&current, &mut output, context)?;
            current = output;
        }
        Ok(current)
    }

    /// Run every stage, reusing outputs already computed for shared stages
    pub(crate) fn process_cached(
        &self,
        input: &Arc<Buffers>,
        cache: &mut StageCache,
        context: &ProcessContext,
    ) -> ExtractionResult<Arc<Buffers>> {
        self.check_input(input)?;
        let mut current = Arc::clone(input);
        for stage in &self.stages {
            let id = stage_id(stage);
            if let Some(cached) = cache.get(&id) {
                current = Arc::clone(cached);
                continue;
            }
            let mut output = stage.create_output_buffers(&current);
            stage.process(&current, &mut output, context)?;
            current = Arc::new(output);
            cache.insert(id, Arc::clone(&current));
        }
        Ok(current)
    }

    pub(crate) fn stage_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.stages.iter().map(stage_id)
    }

    fn check_input(&self, input: &Buffers) -> ExtractionResult<()> {
        if input.element_type() != self.input_format.element_type() {
            return Err(ExtractionError::FormatMismatch {
                transform: self.stages[0].name().to_string(),
                expected: self.input_format.element_type(),
                got: input.element_type(),
            });
        }
        if input.count() > 0 && input.frame_size() != self.input_format.size() {
            return Err(ExtractionError::PcmLengthMismatch {
                expected: self.input_format.size(),
                got: input.frame_size(),
            });
        }
        Ok(())
    }
}

fn describe(stages: &[Arc<dyn Transform>]) -> String {
    stages
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}
