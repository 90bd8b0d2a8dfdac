use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every component of a split run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shortest segment preferred when cutting at a pause (ms).
    pub min_duration: u64,
    /// Longest segment ever emitted (ms).
    pub max_duration: u64,
    /// Loudness at or below which audio counts as silence (dBFS).
    pub silence_threshold: f64,
    /// Minimum length of a pause worth cutting at (ms).
    pub min_silence_len: u64,
    /// Number of files processed in parallel.
    pub max_workers: usize,
    /// Extension of input files and emitted segments.
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_duration: 10_000,
            max_duration: 25_000,
            silence_threshold: -40.0,
            min_silence_len: 500,
            max_workers: 4,
            extension: "mp3".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the user config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str::<Config>(&contents).map_err(|e| {
            SplitError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse("SPEECHSPLIT_MIN_DURATION") {
            self.min_duration = v;
        }
        if let Some(v) = env_parse("SPEECHSPLIT_MAX_DURATION") {
            self.max_duration = v;
        }
        if let Some(v) = env_parse("SPEECHSPLIT_SILENCE_THRESHOLD") {
            self.silence_threshold = v;
        }
        if let Some(v) = env_parse("SPEECHSPLIT_MIN_SILENCE_LEN") {
            self.min_silence_len = v;
        }
        if let Some(v) = env_parse("SPEECHSPLIT_MAX_WORKERS") {
            self.max_workers = v;
        }
        if let Ok(ext) = std::env::var("SPEECHSPLIT_EXTENSION") {
            self.extension = ext;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_duration == 0 {
            return Err(SplitError::Config(
                "min_duration must be greater than 0".to_string(),
            ));
        }

        if self.min_duration > self.max_duration {
            return Err(SplitError::Config(format!(
                "min_duration ({}ms) must not exceed max_duration ({}ms)",
                self.min_duration, self.max_duration
            )));
        }

        if self.min_silence_len == 0 {
            return Err(SplitError::Config(
                "min_silence_len must be greater than 0".to_string(),
            ));
        }

        if !self.silence_threshold.is_finite() || self.silence_threshold > 0.0 {
            return Err(SplitError::Config(format!(
                "silence_threshold must be a finite dBFS value <= 0, got {}",
                self.silence_threshold
            )));
        }

        if self.max_workers == 0 {
            return Err(SplitError::Config(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        if self.extension.trim_start_matches('.').is_empty() {
            return Err(SplitError::Config("extension must not be empty".to_string()));
        }

        Ok(())
    }

    /// Extension without a leading dot, lowercased.
    pub fn normalized_extension(&self) -> String {
        self.extension.trim_start_matches('.').to_lowercase()
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("speechsplit").join("config.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_duration, 10_000);
        assert_eq!(config.max_duration, 25_000);
        assert_eq!(config.silence_threshold, -40.0);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.min_silence_len, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = Config {
            min_duration: 30_000,
            max_duration: 20_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_positive_threshold() {
        let config = Config {
            silence_threshold: 3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            silence_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_extension() {
        let config = Config {
            extension: ".".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalized_extension() {
        let config = Config {
            extension: ".MP3".to_string(),
            ..Default::default()
        };
        assert_eq!(config.normalized_extension(), "mp3");
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_duration = 30000\nextension = \"wav\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.max_duration, 30_000);
        assert_eq!(config.extension, "wav");
        assert_eq!(config.min_duration, 10_000);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_duration = \"soon\"").unwrap();

        match Config::load_from(file.path()) {
            Err(SplitError::Config(msg)) => assert!(msg.contains("Failed to parse")),
            other => panic!("Expected Config error, got: {other:?}"),
        }
    }
}
