//! CLI configuration (optional JSON file, everything defaulted).

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use voxprep_core::{diagnose::DiagnosisThresholds, segment::SegmenterConfig};

/// Top-level configuration for every subcommand. Any field missing from the
/// JSON file falls back to its default, so partial configs are fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sample rate files are converted to before feature extraction.
    pub analysis_sample_rate: u32,
    /// Worker threads for batch evaluation.
    pub jobs: usize,
    pub segmenter: SegmenterConfig,
    pub thresholds: DiagnosisThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: 24_000,
            jobs: 4,
            segmenter: SegmenterConfig::default(),
            thresholds: DiagnosisThresholds::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_means_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.analysis_sample_rate, 24_000);
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "jobs": 8, "segmenter": { "min_duration_s": 4.0 } }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.jobs, 8);
        assert_eq!(config.segmenter.min_duration_s, 4.0);
        assert_eq!(config.segmenter.max_duration_s, 11.0);
        assert_eq!(config.thresholds.cer_threshold, 0.05);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
