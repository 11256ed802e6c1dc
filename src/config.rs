use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::archive::{DEFAULT_MAX_ARCHIVE_BYTES, DEFAULT_SYSTEM_PREFIX};
use crate::export::ExportFormat;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl RemoteConfig {
    /// Full URL of the analysis endpoint.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_endpoint() -> String {
    "/process-spreadsheet".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_system_prefix")]
    pub system_prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            system_prefix: default_system_prefix(),
        }
    }
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_ARCHIVE_BYTES
}
fn default_system_prefix() -> String {
    DEFAULT_SYSTEM_PREFIX.to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            formats: default_formats(),
            file_stem: default_file_stem(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}
fn default_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Json]
}
fn default_file_stem() -> String {
    "coding_results".to_string()
}

/// Load the configuration file. A missing file yields the defaults; a file
/// that exists but does not parse or validate is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.dispatch.concurrency == 0 {
        bail!("dispatch.concurrency must be >= 1");
    }

    if config.remote.timeout_secs == 0 {
        bail!("remote.timeout_secs must be >= 1");
    }

    let url = &config.remote.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!(
            "remote.base_url must start with http:// or https:// (got '{}')",
            url
        );
    }

    if config.archive.max_bytes == 0 {
        bail!("archive.max_bytes must be >= 1");
    }

    if config.export.file_stem.trim().is_empty() {
        bail!("export.file_stem must not be empty");
    }

    Ok(())
}
