use std::path::PathBuf;
use std::time::Duration;

use crate::services::tuning::AccuracyWindow;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_DESIRED_RETENTION: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub max_concurrency: usize,
    pub desired_retention: f64,
    pub tuning: AccuracyWindow,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            desired_retention: DEFAULT_DESIRED_RETENTION,
            tuning: AccuracyWindow::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Missing or
    /// invalid values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let tuning_defaults = AccuracyWindow::default();
        let string = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database_path: string("CLOZE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_connections: parse(string("CLOZE_MAX_CONNECTIONS"))
                .filter(|v: &u32| *v > 0)
                .unwrap_or(defaults.max_connections),
            busy_timeout: parse(string("CLOZE_BUSY_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.busy_timeout),
            max_concurrency: parse(string("CLOZE_MAX_CONCURRENCY"))
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.max_concurrency),
            desired_retention: parse(string("CLOZE_DESIRED_RETENTION"))
                .filter(|v: &f64| *v > 0.0 && *v < 1.0)
                .unwrap_or(defaults.desired_retention),
            tuning: AccuracyWindow {
                window: parse(string("CLOZE_TUNE_WINDOW"))
                    .filter(|v: &i64| *v > 0)
                    .unwrap_or(tuning_defaults.window),
                raise_above: parse(string("CLOZE_TUNE_RAISE_ABOVE"))
                    .filter(|v: &f64| (0.0..=1.0).contains(v))
                    .unwrap_or(tuning_defaults.raise_above),
                lower_below: parse(string("CLOZE_TUNE_LOWER_BELOW"))
                    .filter(|v: &f64| (0.0..=1.0).contains(v))
                    .unwrap_or(tuning_defaults.lower_below),
                step: tuning_defaults.step,
            },
            log_level: string("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cloze-engine")
        .join("review.db")
}

fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.tuning.window, 10);
        assert!(config.database_path.ends_with("cloze-engine/review.db"));
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CLOZE_MAX_CONCURRENCY", "zero"),
            ("CLOZE_TUNE_RAISE_ABOVE", "1.5"),
            ("CLOZE_MAX_CONNECTIONS", "0"),
            ("CLOZE_DB_PATH", "  "),
        ]));
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.tuning.raise_above, 0.8);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.database_path, default_database_path());
    }

    #[test]
    fn test_valid_values_are_read() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CLOZE_DB_PATH", "/tmp/course.db"),
            ("CLOZE_MAX_CONCURRENCY", " 3 "),
            ("CLOZE_TUNE_WINDOW", "4"),
            ("CLOZE_DESIRED_RETENTION", "0.85"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.database_path, PathBuf::from("/tmp/course.db"));
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.tuning.window, 4);
        assert_eq!(config.desired_retention, 0.85);
        assert_eq!(config.log_level, "debug");
    }
}
