//! Conformance checking of a local PDF.
//!
//! Runs veraPDF against the file, reads its JSON report back from a fixed
//! location, inspects the document structure and fingerprints the bytes.

pub mod inspect;
pub mod verapdf;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::{CheckerSettings, Settings};
use crate::models::ConformanceReport;

/// Fixed name of the JSON report inside the work directory.
pub const REPORT_FILENAME: &str = "current_report.json";

/// Errors from the external checker or its output.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Conformance checker not found: {0}")]
    ToolNotFound(String),

    #[error("Conformance checker failed: {0}")]
    Failed(String),

    #[error("Conformance checker exceeded {0:?}")]
    Timeout(Duration),

    #[error("Malformed checker report: {0}")]
    MalformedReport(String),

    #[error("Checker report is missing {0}")]
    MissingField(&'static str),

    #[error("Checker could not process the file: {0}")]
    TaskException(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a local PDF into a normalized report.
#[async_trait]
pub trait ConformanceChecker: Send + Sync {
    async fn check(&self, pdf_path: &Path) -> Result<ConformanceReport, CheckerError>;
}

/// Hex SHA-256 of the PDF bytes, used as the report key.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// [`ConformanceChecker`] backed by the veraPDF command line tool.
#[derive(Debug, Clone)]
pub struct VeraPdfChecker {
    settings: CheckerSettings,
    report_path: PathBuf,
}

impl VeraPdfChecker {
    pub fn new(settings: CheckerSettings, work_dir: &Path) -> Self {
        Self {
            settings,
            report_path: work_dir.join(REPORT_FILENAME),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.checker.clone(), &settings.work_dir)
    }

    /// Whether the configured veraPDF binary can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.settings.command).is_ok()
    }

    /// Run veraPDF with stdout redirected into the report file.
    async fn run_verapdf(&self, pdf_path: &Path) -> Result<Vec<u8>, CheckerError> {
        let report_file = std::fs::File::create(&self.report_path)?;

        let mut cmd = Command::new(&self.settings.command);
        cmd.args(["-f", &self.settings.profile, "--format", "json"])
            .arg(pdf_path)
            .stdout(Stdio::from(report_file))
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.settings.timeout, cmd.output()).await {
            Err(_) => return Err(CheckerError::Timeout(self.settings.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CheckerError::ToolNotFound(self.settings.command.clone()))
            }
            Ok(Err(e)) => return Err(CheckerError::Io(e)),
            Ok(Ok(output)) => output,
        };

        // 1 means "validated, not compliant"; anything else non-zero is a tool failure
        match output.status.code() {
            Some(0) | Some(1) => {}
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CheckerError::Failed(format!(
                    "exit {}: {}",
                    code.map(|c| c.to_string())
                        .unwrap_or_else(|| "by signal".to_string()),
                    stderr.trim()
                )));
            }
        }

        Ok(tokio::fs::read(&self.report_path).await?)
    }
}

#[async_trait]
impl ConformanceChecker for VeraPdfChecker {
    async fn check(&self, pdf_path: &Path) -> Result<ConformanceReport, CheckerError> {
        let bytes = tokio::fs::read(pdf_path).await?;
        let pdf_hash = content_hash(&bytes);

        let json = self.run_verapdf(pdf_path).await?;
        let summary = verapdf::parse_report(&json)?;
        debug!(
            "veraPDF: {} failed rules, {} failed checks",
            summary.violations, summary.failed_checks
        );

        let structure = if self.settings.inspect_structure {
            inspect::inspect(pdf_path, &bytes, self.settings.timeout).await
        } else {
            inspect::inspect_bytes(&bytes)
        };

        Ok(ConformanceReport {
            pdf_hash,
            violations: summary.violations,
            failed_checks: summary.failed_checks,
            tagged: structure.tagged,
            check_for_image_only: structure.image_only,
            pdf_text_type: structure.text_type(),
            title_set: structure.title_set,
            language_set: structure.language_set,
            page_count: structure.page_count,
            has_form: structure.has_form,
        })
    }
}
