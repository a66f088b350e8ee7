//! Feature Extractor
//!
//! Owns one pipeline per requested feature. Pipelines built later reuse the
//! initialized stages of earlier ones when their prefixes match, and every
//! `extract` call computes each shared stage once.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::buffers::Buffers;
use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, ExtractionResult};
use crate::format::ElementType;
use crate::pipeline::{Pipeline, StageCache};
use crate::registry::TransformRegistry;
use crate::transform::ProcessContext;

/// Frames produced for one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "frames", rename_all = "lowercase")]
pub enum FeatureData {
    Int16(Vec<Vec<i16>>),
    Float32(Vec<Vec<f32>>),
}

impl FeatureData {
    pub fn element_type(&self) -> ElementType {
        match self {
            FeatureData::Int16(_) => ElementType::Int16,
            FeatureData::Float32(_) => ElementType::Float32,
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            FeatureData::Int16(frames) => frames.len(),
            FeatureData::Float32(frames) => frames.len(),
        }
    }
}

impl From<&Buffers> for FeatureData {
    fn from(buffers: &Buffers) -> Self {
        match buffers {
            Buffers::Int16(frames) => FeatureData::Int16(frames.blocks().to_vec()),
            Buffers::Float32(frames) => FeatureData::Float32(frames.blocks().to_vec()),
        }
    }
}

/// Result of one feature for one PCM buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureResult {
    pub name: String,
    pub frame_size: usize,
    pub data: FeatureData,
}

/// Computes a fixed set of features over PCM buffers of a fixed length
///
/// `extract` takes `&self` and may be called from many threads at once.
#[derive(Debug)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
    pipelines: Vec<Pipeline>,
}

impl FeatureExtractor {
    /// Validate `config` and assemble every feature pipeline
    ///
    /// Fails without keeping any pipeline when one feature cannot be built.
    pub fn new(config: &ExtractorConfig, registry: &TransformRegistry) -> ExtractionResult<Self> {
        config.validate()?;
        let input_format = config.input_format();

        let mut pipelines: Vec<Pipeline> = Vec::with_capacity(config.features.len());
        for feature in &config.features {
            let pipeline = Pipeline::assemble_sharing(
                registry,
                &feature.stages,
                &input_format,
                config.workers,
                &pipelines,
            )?;
            pipelines.push(pipeline);
        }

        let extractor = Self {
            config: config.clone(),
            pipelines,
        };
        info!(
            features = extractor.pipelines.len(),
            unique_stages = extractor.unique_stage_count(),
            buffer_size = config.buffer_size,
            sampling_rate = config.sampling_rate,
            "Feature extractor ready"
        );
        Ok(extractor)
    }

    /// Build from textual feature descriptions using the global registry
    pub fn from_descriptions<S: AsRef<str>>(
        descriptions: &[S],
        buffer_size: usize,
        sampling_rate: u32,
    ) -> ExtractionResult<Self> {
        let config = ExtractorConfig::from_descriptions(descriptions, buffer_size, sampling_rate)?;
        Self::new(&config, TransformRegistry::global())
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.config.features.iter().map(|f| f.name.as_str())
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Number of distinct transform instances across all pipelines
    pub fn unique_stage_count(&self) -> usize {
        self.pipelines
            .iter()
            .flat_map(|p| p.stage_ids())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Compute every feature over one PCM buffer, in configuration order
    pub fn extract(&self, pcm: &[i16]) -> ExtractionResult<Vec<FeatureResult>> {
        self.extract_with(pcm, &ProcessContext::new())
    }

    /// [`FeatureExtractor::extract`] with a caller-supplied context (e.g. for cancellation)
    pub fn extract_with(
        &self,
        pcm: &[i16],
        context: &ProcessContext,
    ) -> ExtractionResult<Vec<FeatureResult>> {
        if pcm.len() != self.config.buffer_size {
            return Err(ExtractionError::PcmLengthMismatch {
                expected: self.config.buffer_size,
                got: pcm.len(),
            });
        }

        let input = Arc::new(Buffers::from_pcm(pcm));
        let mut cache = StageCache::new();
        self.config
            .features
            .iter()
            .zip(&self.pipelines)
            .map(|(feature, pipeline)| {
                let output = pipeline.process_cached(&input, &mut cache, context)?;
                Ok(FeatureResult {
                    name: feature.name.clone(),
                    frame_size: output.frame_size(),
                    data: FeatureData::from(output.as_ref()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::cancel::CancellationToken;
    use crate::feature::FeatureConfig;

    fn sine(len: usize, period: usize) -> Vec<i16> {
        (0..len)
            .map(|i| ((i as f32 * std::f32::consts::TAU / period as f32).sin() * 8000.0) as i16)
            .collect()
    }

    #[test]
    fn test_extract_in_configuration_order() {
        let extractor = FeatureExtractor::from_descriptions(
            &[
                "Energy [Window(length=256, step=128), Energy]",
                "LogEnergy [Window(length=256, step=128), Energy, Log(base=10)]",
                "Periodicity [Lowpass(frequency=3000), Window(length=256, step=256), Autocorrelation]",
            ],
            1024,
            16000,
        )
        .unwrap();
        let names: Vec<&str> = extractor.feature_names().collect();
        assert_eq!(names, ["Energy", "LogEnergy", "Periodicity"]);
        // Window and Energy are shared by the first two features
        assert_eq!(extractor.unique_stage_count(), 6);

        let results = extractor.extract(&sine(1024, 32)).unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].frame_size, 1);
        assert_eq!(results[0].data.frame_count(), 7);
        assert_eq!(results[0].data.element_type(), ElementType::Float32);

        let (FeatureData::Float32(energy), FeatureData::Float32(log_energy)) =
            (&results[0].data, &results[1].data)
        else {
            panic!("energy features are float frames");
        };
        for (e, l) in energy.iter().zip(log_energy) {
            assert!((e[0].log10() - l[0]).abs() < 1e-4);
        }

        assert_eq!(results[2].frame_size, 511);
        // (1024 + 63 - 256) / 256 + 1
        assert_eq!(results[2].data.frame_count(), 4);
    }

    #[test]
    fn test_unknown_feature_builds_nothing() {
        let err = FeatureExtractor::from_descriptions(
            &["Energy [Window, Energy]", "Pitch [Window, Yin]"],
            4096,
            16000,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownTransformName(ref n) if n == "Yin"));
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        let extractor =
            FeatureExtractor::from_descriptions(&["Energy [Window, Energy]"], 4096, 16000).unwrap();
        assert!(matches!(
            extractor.extract(&[0; 100]),
            Err(ExtractionError::PcmLengthMismatch { expected: 4096, got: 100 })
        ));
    }

    #[test]
    fn test_speech_default_extracts() {
        let config = ExtractorConfig {
            workers: 2,
            ..ExtractorConfig::speech_default()
        };
        let extractor = FeatureExtractor::new(&config, TransformRegistry::global()).unwrap();
        let results = extractor.extract(&sine(4096, 40)).unwrap();
        assert_eq!(results.len(), config.features.len());
        assert!(results.iter().all(|r| r.data.frame_count() > 0));
    }

    #[test]
    fn test_concurrent_extraction_is_consistent() {
        let config = ExtractorConfig {
            workers: 2,
            ..ExtractorConfig::new(
                2048,
                16000,
                vec![
                    FeatureConfig::parse("Acf [Window(length=512, step=256), Autocorrelation]").unwrap(),
                    FeatureConfig::parse("Hp [Window(length=512, step=256), Highpass, Energy]").unwrap(),
                ],
            )
        };
        let extractor = FeatureExtractor::new(&config, TransformRegistry::global()).unwrap();
        let pcm = sine(2048, 25);
        let expected = extractor.extract(&pcm).unwrap();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..5 {
                        assert_eq!(extractor.extract(&pcm).unwrap(), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn test_cancelled_context_stops_pooled_stages() {
        let extractor = FeatureExtractor::from_descriptions(
            &["Acf [Window(length=256, step=256), Autocorrelation]"],
            1024,
            16000,
        )
        .unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = extractor
            .extract_with(&[0; 1024], &ProcessContext::with_cancellation(token))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Cancelled));
    }

    #[test]
    fn test_results_serialize() {
        let extractor =
            FeatureExtractor::from_descriptions(&["E [Window(length=512), Energy]"], 512, 8000)
                .unwrap();
        let results = extractor.extract(&[100; 512]).unwrap();
        let json = serde_json::to_string(&results).unwrap();
        assert!(json.contains("\"name\":\"E\""));
        assert!(json.contains("\"type\":\"float32\""));
    }
}
