//! Configuration for the MGF offset orchestrator.
//!
//! Settings are read from `mgf_offset.toml` in the working directory (or the
//! file named by `MGF_OFFSET_CONFIG`), then overridden from the environment.
//!
//! ```toml
//! [folders]
//! dia = "/data/mgf/dia"
//! dda = "/data/mgf/dda"
//! hcd = "/data/mgf/hcd"
//! etd = "/data/mgf/etd"
//!
//! [database]
//! path = "/data/ms.sqlite"
//!
//! [processor]
//! command = "mgf-offset-unit"
//!
//! [logging]
//! level = "debug"
//! format = "text"
//! ```

use anyhow::{Context, Result};
use mgf_common::Category;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::OrchestratorError;

pub const LOCK_FILE_NAME: &str = "MGF_Offset.lock";
pub const UPLOAD_DIR: &str = "uploaded";
pub const LOG_FILE_PREFIX: &str = "MGF_Offset";
pub const CONFIG_FILE_NAME: &str = "mgf_offset.toml";

/// Concurrent units per category.
pub const POOL_CAPACITY: usize = 8;

/// Root folder for each category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldersConfig {
    #[serde(default)]
    pub dia: Option<PathBuf>,
    #[serde(default)]
    pub dda: Option<PathBuf>,
    #[serde(default)]
    pub hcd: Option<PathBuf>,
    #[serde(default)]
    pub etd: Option<PathBuf>,
}

impl FoldersConfig {
    pub fn get(&self, category: Category) -> Option<&PathBuf> {
        match category {
            Category::Dia => self.dia.as_ref(),
            Category::Dda => self.dda.as_ref(),
            Category::Hcd => self.hcd.as_ref(),
            Category::Etd => self.etd.as_ref(),
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Option<PathBuf> {
        match category {
            Category::Dia => &mut self.dia,
            Category::Dda => &mut self.dda,
            Category::Hcd => &mut self.hcd,
            Category::Etd => &mut self.etd,
        }
    }
}

/// Metadata database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Query returning the run id for `?1` = file basename
    #[serde(default = "default_run_id_query")]
    pub run_id_query: String,
    /// Query returning the MS2 spectrum count for `?1` = file basename
    #[serde(default = "default_ms2_count_query")]
    pub ms2_count_query: String,
}

fn default_run_id_query() -> String {
    "SELECT run_id FROM ms_run WHERE file_name = ?1".to_string()
}

fn default_ms2_count_query() -> String {
    "SELECT ms2_count FROM ms_run WHERE file_name = ?1".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            run_id_query: default_run_id_query(),
            ms2_count_query: default_ms2_count_query(),
        }
    }
}

/// Processing unit settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Shell command run once per eligible file
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Run log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level of the per-run log file
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// The complete mgf_offset.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetToml {
    #[serde(default)]
    pub folders: FoldersConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OffsetToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mgf_offset.toml")
    }

    /// Load from `MGF_OFFSET_CONFIG` or `<work_dir>/mgf_offset.toml`.
    /// Returns defaults if neither exists.
    pub fn load_or_default(work_dir: &Path) -> Result<Self> {
        Self::load_or_default_with(work_dir, |key| std::env::var(key).ok())
    }

    pub fn load_or_default_with<F>(work_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = env("MGF_OFFSET_CONFIG") {
            return Self::load(Path::new(&explicit));
        }
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides (`MGF_DIA_FOLDER`, `MGF_DATABASE`, ...).
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for category in Category::ALL {
            let key = format!("MGF_{}_FOLDER", category.as_str());
            if let Some(folder) = env(&key) {
                *self.folders.slot_mut(category) = Some(PathBuf::from(folder));
            }
        }
        if let Some(db) = env("MGF_DATABASE") {
            self.database.path = Some(PathBuf::from(db));
        }
        if let Some(cmd) = env("MGF_PROCESSOR_CMD") {
            self.processor.command = Some(cmd);
        }
        if let Some(level) = env("MGF_LOG_LEVEL") {
            self.logging.level = level;
        }
        self
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self
            .logging
            .level
            .parse::<tracing::level_filters::LevelFilter>()
            .is_err()
        {
            warnings.push(format!(
                "Invalid logging level '{}': expected trace, debug, info, warn, error or off",
                self.logging.level
            ));
        }

        for category in Category::ALL {
            if self.folders.get(category).is_none() {
                warnings.push(format!("No root folder configured for {}", category));
            }
        }

        if self.database.path.is_none() {
            warnings.push("No metadata database configured".to_string());
        }
        if self.processor.command.is_none() {
            warnings.push("No processor command configured".to_string());
        }

        warnings
    }
}

/// Runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub lock_file: PathBuf,
    pub toml: OffsetToml,
}

impl Config {
    /// Resolve `work_dir` to an absolute path and load its configuration.
    pub fn new(work_dir: &Path) -> Result<Self> {
        let work_dir = std::path::absolute(work_dir)
            .with_context(|| format!("Failed to resolve working directory {}", work_dir.display()))?;
        let toml = OffsetToml::load_or_default(&work_dir)?.apply_env();
        Ok(Self::from_toml(work_dir, toml))
    }

    pub fn from_toml(work_dir: PathBuf, toml: OffsetToml) -> Self {
        Self {
            upload_dir: work_dir.join(UPLOAD_DIR),
            lock_file: work_dir.join(LOCK_FILE_NAME),
            work_dir,
            toml,
        }
    }

    /// Root folder of `category`. Relative roots are taken from the working directory.
    pub fn category_root(&self, category: Category) -> Result<PathBuf, OrchestratorError> {
        let root = self
            .toml
            .folders
            .get(category)
            .ok_or(OrchestratorError::CategoryRootMissing { category })?;
        if root.is_absolute() {
            Ok(root.clone())
        } else {
            Ok(self.work_dir.join(root))
        }
    }

    /// `<work_dir>/MGF_Offset_<tag>.log`
    pub fn log_file(&self, tag: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}.log", LOG_FILE_PREFIX, tag))
    }

    /// Create the working directory if it does not exist yet.
    pub fn ensure_work_dir(&self) -> Result<bool> {
        if self.work_dir.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.work_dir).with_context(|| {
            format!("Failed to create working directory {}", self.work_dir.display())
        })?;
        Ok(true)
    }
}
