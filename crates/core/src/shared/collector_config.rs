use std::collections::HashMap;
use std::path::PathBuf;

use crate::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use crate::shared::constants::{CACHE_DIR_NAME, DEFAULT_SAMPLE_RATE, OUTPUT_DIR_NAME};
use crate::shared::face_box::DEFAULT_PADDING_RATIO;

pub const CACHE_DIR_ENV: &str = "FACE_COLLECTOR_CACHE_DIR";
pub const OUTPUT_DIR_ENV: &str = "FACE_COLLECTOR_OUTPUT_DIR";

/// Settings for one collection run.
///
/// The cache root is explicit so callers (and tests) decide where downloaded
/// videos live instead of relying on a process-wide location.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectorConfig {
    pub cache_dir: PathBuf,
    pub output_root: PathBuf,
    /// Stills per second of video.
    pub sample_rate: f64,
    /// Margin around each face as a fraction of its larger side.
    pub padding_ratio: f64,
    /// Detector confidence threshold (0.0-1.0).
    pub confidence: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join(CACHE_DIR_NAME),
            output_root: PathBuf::from(OUTPUT_DIR_NAME),
            sample_rate: DEFAULT_SAMPLE_RATE,
            padding_ratio: DEFAULT_PADDING_RATIO,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl CollectorConfig {
    /// Defaults with directory overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_map(&std::env::vars().collect())
    }

    /// Defaults with directory overrides from `env`. Empty values are ignored.
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = non_empty(env, CACHE_DIR_ENV) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(env, OUTPUT_DIR_ENV) {
            config.output_root = PathBuf::from(dir);
        }
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(format!(
                "Sample rate must be a positive number, got {}",
                self.sample_rate
            ));
        }
        if !(self.padding_ratio >= 0.0 && self.padding_ratio.is_finite()) {
            return Err(format!(
                "Padding ratio must be non-negative, got {}",
                self.padding_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        Ok(())
    }
}

fn non_empty<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert!(config.cache_dir.starts_with(std::env::temp_dir()));
        assert!(config.cache_dir.ends_with("face_collector_cache"));
        assert_eq!(config.output_root, PathBuf::from("output"));
        assert_relative_eq!(config.sample_rate, 1.0);
        assert_relative_eq!(config.padding_ratio, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_directories() {
        let config = CollectorConfig::from_env_map(&env(&[
            (CACHE_DIR_ENV, "/var/cache/faces"),
            (OUTPUT_DIR_ENV, "/srv/faces"),
        ]));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/faces"));
        assert_eq!(config.output_root, PathBuf::from("/srv/faces"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = CollectorConfig::from_env_map(&env(&[(CACHE_DIR_ENV, "  ")]));
        assert_eq!(config.cache_dir, CollectorConfig::default().cache_dir);
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = CollectorConfig {
            sample_rate: 0.0,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_padding() {
        let config = CollectorConfig {
            padding_ratio: -0.1,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let config = CollectorConfig {
            confidence: 1.5,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
