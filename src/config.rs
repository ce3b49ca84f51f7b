use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{DomainKeywords, ForestParams, StatusVocabulary};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub labels: LabelSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }

/// Random forest hyperparameters
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    #[serde(default = "default_balanced_class_weight")]
    pub balanced_class_weight: bool,
    /// Extra domain-specialization keywords; empty keeps the SAP set
    #[serde(default)]
    pub domain_keywords: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            random_state: default_random_state(),
            balanced_class_weight: default_balanced_class_weight(),
            domain_keywords: Vec::new(),
        }
    }
}

fn default_n_estimators() -> usize { 100 }
fn default_max_depth() -> usize { 10 }
fn default_min_samples_split() -> usize { 5 }
fn default_min_samples_leaf() -> usize { 2 }
fn default_random_state() -> u64 { 42 }
fn default_balanced_class_weight() -> bool { true }

impl From<&ModelSettings> for ForestParams {
    fn from(settings: &ModelSettings) -> Self {
        Self {
            n_estimators: settings.n_estimators,
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split,
            min_samples_leaf: settings.min_samples_leaf,
            random_state: settings.random_state,
            balanced_class_weight: settings.balanced_class_weight,
        }
    }
}

impl ModelSettings {
    pub fn domain_keywords(&self) -> DomainKeywords {
        if self.domain_keywords.is_empty() {
            DomainKeywords::default()
        } else {
            DomainKeywords::new(&self.domain_keywords)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringSettings {
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            drift_threshold: default_drift_threshold(),
        }
    }
}

fn default_drift_threshold() -> f64 { 0.1 }

/// Outcome status to label mapping
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSettings {
    /// Value for statuses outside the vocabulary
    #[serde(default)]
    pub unknown_status_value: f64,
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,
    /// Additional or overriding status values
    #[serde(default)]
    pub statuses: BTreeMap<String, f64>,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            unknown_status_value: 0.0,
            positive_threshold: default_positive_threshold(),
            statuses: BTreeMap::new(),
        }
    }
}

fn default_positive_threshold() -> f64 { 0.5 }

impl From<&LabelSettings> for StatusVocabulary {
    fn from(settings: &LabelSettings) -> Self {
        StatusVocabulary::new(settings.unknown_status_value, settings.positive_threshold)
            .with_statuses(settings.statuses.iter().map(|(status, value)| (status.as_str(), *value)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_artifacts_dir() -> PathBuf { PathBuf::from("models") }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with TALENT__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TALENT__MODEL__N_ESTIMATORS -> model.n_estimators
            .add_source(
                Environment::with_prefix("TALENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TALENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
