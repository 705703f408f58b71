//! Configuration management for pdfaudit using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_client::user_agent::DEFAULT_USER_AGENT;
use crate::repository::context::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "pdfaudit.db";

/// Name of the per-site crawl output file.
pub const DEFAULT_CRAWL_FILENAME: &str = "scanned_pdfs.txt";

/// Name of the session ledger file inside the data directory.
pub const LEDGER_FILENAME: &str = "completed_conformance";

const WORK_SUBDIR: &str = "work";
const SITE_FOLDERS_SUBDIR: &str = "sites";

/// Errors raised while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// What `upsert_pdf_and_report` does when a report for the hash already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Existing rows always win; a second upsert is a no-op.
    #[default]
    KeepExisting,
    /// Existing report fields are replaced with the fresh result.
    Replace,
}

impl std::str::FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep-existing" | "keep" => Ok(Self::KeepExisting),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown overwrite policy: {}", other)),
        }
    }
}

/// External conformance checker settings.
#[derive(Debug, Clone)]
pub struct CheckerSettings {
    /// veraPDF executable (name on PATH or absolute path).
    pub command: String,
    /// Validation profile flag passed with `-f`.
    pub profile: String,
    /// Maximum runtime for a single invocation.
    pub timeout: Duration,
    /// Whether to run pdfinfo/pdftotext structure inspection.
    pub inspect_structure: bool,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            command: "verapdf".to_string(),
            profile: "ua1".to_string(),
            timeout: Duration::from_secs(300),
            inspect_structure: true,
        }
    }
}

/// Application settings.
///
/// Constructed once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Root of the per-site crawl output folders.
    pub site_folders: PathBuf,
    /// Fixed location for the downloaded PDF and the checker report.
    pub work_dir: PathBuf,
    /// Crawl output filename inside each site folder.
    pub crawl_filename: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Download timeout in seconds.
    pub request_timeout: u64,
    /// Existence probe timeout in seconds.
    pub probe_timeout: u64,
    /// Retry once without certificate verification on TLS failures.
    pub allow_insecure_retry: bool,
    /// Behavior of upserts that hit an existing report.
    pub overwrite_policy: OverwritePolicy,
    /// Conformance checker settings.
    pub checker: CheckerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdfaudit");

        Self {
            site_folders: data_dir.join(SITE_FOLDERS_SUBDIR),
            work_dir: data_dir.join(WORK_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            crawl_filename: DEFAULT_CRAWL_FILENAME.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: 30,
            probe_timeout: 10,
            allow_insecure_retry: true,
            overwrite_policy: OverwritePolicy::default(),
            checker: CheckerSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            site_folders: data_dir.join(SITE_FOLDERS_SUBDIR),
            work_dir: data_dir.join(WORK_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Path of the session ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILENAME)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    /// Ensure data and work directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (label, dir) in [("data", &self.data_dir), ("work", &self.work_dir)] {
            std::fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }
}

/// Checker section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Maximum runtime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspect_structure: Option<bool>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Root of the per-site crawl folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_folders: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl_filename: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Probe timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_insecure_retry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite_policy: Option<OverwritePolicy>,
    #[serde(default)]
    pub checker: CheckerConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("pdfaudit").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format is picked from the file extension (TOML, YAML, else JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Directory of the config file, if it was loaded from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            let data_dir = self.resolve_path(data_dir, base_dir);
            *settings = Settings {
                database_url: settings.database_url.take(),
                ..Settings::with_data_dir(data_dir)
            };
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref folders) = self.site_folders {
            settings.site_folders = self.resolve_path(folders, base_dir);
        }
        if let Some(ref work_dir) = self.work_dir {
            settings.work_dir = self.resolve_path(work_dir, base_dir);
        }
        if let Some(ref name) = self.crawl_filename {
            settings.crawl_filename = name.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(timeout) = self.probe_timeout {
            settings.probe_timeout = timeout;
        }
        if let Some(allow) = self.allow_insecure_retry {
            settings.allow_insecure_retry = allow;
        }
        if let Some(policy) = self.overwrite_policy {
            settings.overwrite_policy = policy;
        }
        if let Some(ref command) = self.checker.command {
            settings.checker.command = command.clone();
        }
        if let Some(ref profile) = self.checker.profile {
            settings.checker.profile = profile.clone();
        }
        if let Some(timeout) = self.checker.timeout {
            settings.checker.timeout = Duration::from_secs(timeout);
        }
        if let Some(inspect) = self.checker.inspect_structure {
            settings.checker.inspect_structure = inspect;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Explicit config file path (--config).
    pub config_path: Option<PathBuf>,
    /// Explicit data directory (--target).
    pub data_dir: Option<PathBuf>,
    /// Resolve relative config paths against the working directory (--cwd).
    pub use_cwd: bool,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        }),
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd.clone()
    } else {
        config.base_dir().unwrap_or_else(|| cwd.clone())
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --target and PDFAUDIT_DATA_DIR move the data dir but keep explicit folder settings
    let data_dir_override = options
        .data_dir
        .clone()
        .or_else(|| env_var("PDFAUDIT_DATA_DIR").map(PathBuf::from));
    if let Some(data_dir) = data_dir_override {
        let data_dir = config.resolve_path(&data_dir.to_string_lossy(), &cwd);
        if config.site_folders.is_none() {
            settings.site_folders = data_dir.join(SITE_FOLDERS_SUBDIR);
        }
        if config.work_dir.is_none() {
            settings.work_dir = data_dir.join(WORK_SUBDIR);
        }
        settings.data_dir = data_dir;
    }

    if let Some(folders) = env_var("PDFAUDIT_SITE_FOLDERS") {
        tracing::debug!("Using PDFAUDIT_SITE_FOLDERS from environment: {}", folders);
        settings.site_folders = config.resolve_path(&folders, &cwd);
    }

    if let Some(command) = env_var("PDFAUDIT_VERAPDF") {
        settings.checker.command = command;
    }

    // DATABASE_URL environment variable takes highest precedence
    if let Some(database_url) = env_var("DATABASE_URL") {
        tracing::debug!("Using DATABASE_URL from environment: {}", database_url);
        settings.database_url = Some(database_url);
    }

    (settings, config)
}
