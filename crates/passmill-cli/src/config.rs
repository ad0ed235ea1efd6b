//! CLI configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults. Command-line
//! flags are applied on top by `main`.

use anyhow::{Context, Result};
use passmill_core::{PipelineVersion, DEFAULT_WEAK_TERMS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassmillConfig {
    #[serde(default)]
    pub general: GeneralSection,

    #[serde(default)]
    pub derivation: DerivationSection,

    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Log level (off, error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationSection {
    /// Pipeline version tag: "v1", "v2" or "v3"
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Extra terms the strength estimator penalizes
    #[serde(default = "default_weak_terms")]
    pub weak_terms: Vec<String>,
}

impl Default for DerivationSection {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline(),
            weak_terms: default_weak_terms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,

    /// Print entropy estimates next to the password
    #[serde(default = "default_show_entropy")]
    pub show_entropy: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            show_entropy: default_show_entropy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_pipeline() -> String {
    PipelineVersion::default().to_string()
}

fn default_weak_terms() -> Vec<String> {
    DEFAULT_WEAK_TERMS.iter().map(|t| t.to_string()).collect()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_show_entropy() -> bool {
    true
}

/// `$XDG_CONFIG_HOME/passmill/passmill.toml`, falling back to
/// `~/.config/passmill/passmill.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("passmill").join("passmill.toml"))
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl PassmillConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PassmillConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load an explicit config file, or the default one if it exists.
    ///
    /// A missing default file means defaults; a missing explicit file is an
    /// error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `PASSMILL_LOG_LEVEL`
    /// - `PASSMILL_PIPELINE`
    /// - `PASSMILL_WEAK_TERMS` (comma separated)
    /// - `PASSMILL_OUTPUT_FORMAT`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PASSMILL_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(v) = lookup("PASSMILL_PIPELINE") {
            self.derivation.pipeline = v;
        }
        if let Some(v) = lookup("PASSMILL_WEAK_TERMS") {
            self.derivation.weak_terms = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("PASSMILL_OUTPUT_FORMAT") {
            self.output.format = v;
        }
    }

    pub fn pipeline(&self) -> Result<PipelineVersion> {
        self.derivation
            .pipeline
            .parse()
            .with_context(|| "derivation.pipeline is invalid")
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.output.format.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("output.format must be \"text\" or \"json\", got {:?}", other),
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.pipeline()?;
        self.output_format()?;

        let level = self.general.log_level.trim().to_ascii_lowercase();
        anyhow::ensure!(
            LOG_LEVELS.contains(&level.as_str()),
            "general.log_level must be one of {}, got {:?}",
            LOG_LEVELS.join(", "),
            self.general.log_level
        );

        anyhow::ensure!(
            self.derivation.weak_terms.iter().all(|t| !t.trim().is_empty()),
            "derivation.weak_terms must not contain empty terms"
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
