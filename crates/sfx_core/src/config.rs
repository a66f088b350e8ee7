//! Extractor Configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExtractionError, ExtractionResult};
use crate::feature::{FeatureConfig, StageConfig};
use crate::format::{BufferFormat, ElementType};

/// Maximum number of features one extractor computes
pub const MAX_FEATURES_COUNT: usize = 256;

/// Upper bound for the default worker count
const DEFAULT_MAX_WORKERS: usize = 8;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(DEFAULT_MAX_WORKERS)
}

/// Everything needed to build a [`FeatureExtractor`](crate::FeatureExtractor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Samples in every PCM buffer passed to `extract`
    pub buffer_size: usize,

    /// Sample rate in Hz
    pub sampling_rate: u32,

    /// Handles per pooled transform (concurrent kernel calls per stage)
    #[serde(default = "default_workers")]
    pub workers: usize,

    pub features: Vec<FeatureConfig>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            sampling_rate: 16000,
            workers: default_workers(),
            features: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    pub fn new(buffer_size: usize, sampling_rate: u32, features: Vec<FeatureConfig>) -> Self {
        Self {
            buffer_size,
            sampling_rate,
            features,
            ..Default::default()
        }
    }

    /// Parse every feature from its textual description
    pub fn from_descriptions<S: AsRef<str>>(
        descriptions: &[S],
        buffer_size: usize,
        sampling_rate: u32,
    ) -> ExtractionResult<Self> {
        let features = descriptions
            .iter()
            .map(|d| FeatureConfig::parse(d.as_ref()))
            .collect::<ExtractionResult<Vec<_>>>()?;
        Ok(Self::new(buffer_size, sampling_rate, features))
    }

    /// Format of the raw PCM buffers entering every pipeline
    pub fn input_format(&self) -> BufferFormat {
        BufferFormat::new(ElementType::Int16, self.buffer_size, self.sampling_rate)
    }

    /// Validate configuration
    pub fn validate(&self) -> ExtractionResult<()> {
        if !(8000..=192_000).contains(&self.sampling_rate) {
            return Err(ExtractionError::InvalidConfiguration(format!(
                "Invalid sampling rate: {}",
                self.sampling_rate
            )));
        }
        if !(32..=1_048_576).contains(&self.buffer_size) {
            return Err(ExtractionError::InvalidConfiguration(format!(
                "Invalid buffer size: {}",
                self.buffer_size
            )));
        }
        if !(1..=64).contains(&self.workers) {
            return Err(ExtractionError::InvalidConfiguration(format!(
                "Invalid worker count: {}",
                self.workers
            )));
        }
        if self.features.is_empty() {
            return Err(ExtractionError::InvalidConfiguration(
                "No features requested".to_string(),
            ));
        }
        if self.features.len() > MAX_FEATURES_COUNT {
            return Err(ExtractionError::TooManyFeatures {
                count: self.features.len(),
                max: MAX_FEATURES_COUNT,
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> ExtractionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ExtractionResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!(
            "Loaded extractor configuration from {:?} ({} features)",
            path,
            config.features.len()
        );
        Ok(config)
    }

    pub fn to_json_string(&self) -> ExtractionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Small speech-oriented feature set at 16 kHz
    pub fn speech_default() -> Self {
        let window = || {
            StageConfig::new("Window")
                .with_parameter("length", "512")
                .with_parameter("step", "256")
        };
        Self::new(
            4096,
            16000,
            vec![
                FeatureConfig::new("Energy", vec![window(), StageConfig::new("Energy")]),
                FeatureConfig::new(
                    "LogEnergy",
                    vec![
                        window(),
                        StageConfig::new("Energy"),
                        StageConfig::new("Log").with_parameter("base", "10"),
                    ],
                ),
                FeatureConfig::new(
                    "Onsets",
                    vec![
                        window(),
                        StageConfig::new("Highpass").with_parameter("frequency", "300"),
                        StageConfig::new("Diffrect"),
                        StageConfig::new("Energy"),
                    ],
                ),
                FeatureConfig::new(
                    "Periodicity",
                    vec![
                        StageConfig::new("Lowpass").with_parameter("frequency", "4000"),
                        window(),
                        StageConfig::new("Autocorrelation"),
                    ],
                ),
                FeatureConfig::new(
                    "Flux",
                    vec![window(), StageConfig::new("Autocorrelation"), StageConfig::new("Flux")],
                ),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_bounded() {
        let config = ExtractorConfig::default();
        assert!(config.workers >= 1);
        assert!(config.workers <= DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn test_speech_default_is_valid() {
        let config = ExtractorConfig::speech_default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.len(), 5);
        assert_eq!(config.input_format().size(), 4096);
    }

    #[test]
    fn test_validation() {
        let valid = ExtractorConfig::speech_default();

        let invalid_rate = ExtractorConfig {
            sampling_rate: 100,
            ..valid.clone()
        };
        assert!(matches!(
            invalid_rate.validate(),
            Err(ExtractionError::InvalidConfiguration(_))
        ));

        let invalid_buffer = ExtractorConfig {
            buffer_size: 16,
            ..valid.clone()
        };
        assert!(invalid_buffer.validate().is_err());

        let invalid_workers = ExtractorConfig {
            workers: 0,
            ..valid.clone()
        };
        assert!(invalid_workers.validate().is_err());

        let no_features = ExtractorConfig {
            features: Vec::new(),
            ..valid.clone()
        };
        assert!(no_features.validate().is_err());

        let too_many = ExtractorConfig {
            features: vec![valid.features[0].clone(); MAX_FEATURES_COUNT + 1],
            ..valid
        };
        assert!(matches!(
            too_many.validate(),
            Err(ExtractionError::TooManyFeatures { count: 257, max: 256 })
        ));
    }

    #[test]
    fn test_from_descriptions() {
        let config = ExtractorConfig::from_descriptions(
            &["Energy [Window(length=256), Energy]", "Log [Window, Energy, Log(base=2)]"],
            1024,
            8000,
        )
        .unwrap();
        assert_eq!(config.features[1].stages[2].parameters[0].1, "2");

        let err = ExtractorConfig::from_descriptions(&["Broken [Window"], 1024, 8000).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidFeatureDescription { .. }));
    }

    #[test]
    fn test_config_serialization() {
        let config = ExtractorConfig::speech_default();
        let json = config.to_json_string().unwrap();
        let deserialized = ExtractorConfig::from_json_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_workers_default_when_missing() {
        let json = r#"{
            "buffer_size": 512,
            "sampling_rate": 8000,
            "features": [{"name": "Energy", "stages": [{"transform": "Energy"}]}]
        }"#;
        let config = ExtractorConfig::from_json_str(json).unwrap();
        assert!(config.workers >= 1);
        assert!(matches!(
            ExtractorConfig::from_json_str("{"),
            Err(ExtractionError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("sfx_config_{}.json", std::process::id()));
        std::fs::write(&path, ExtractorConfig::speech_default().to_json_string().unwrap()).unwrap();
        let loaded = ExtractorConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.features.len(), 5);

        assert!(matches!(
            ExtractorConfig::from_json_file(&path),
            Err(ExtractionError::Io(_))
        ));
    }
}
