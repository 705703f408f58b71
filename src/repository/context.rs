//! Database context for managing connections and repository access.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::failure::FailureRepository;
use super::pdf_file::PdfFileRepository;
use super::pool::{DieselError, SqlitePool};
use super::site::SiteRepository;
use crate::models::{Failure, ReportSummary, Site};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS drupal_site (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain_name TEXT NOT NULL UNIQUE,
    security_group_name TEXT,
    box_folder TEXT
);

CREATE TABLE IF NOT EXISTS pdf_report (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pdf_hash TEXT NOT NULL UNIQUE,
    violations INTEGER NOT NULL,
    failed_checks INTEGER NOT NULL,
    tagged INTEGER NOT NULL DEFAULT 0,
    check_for_image_only INTEGER NOT NULL DEFAULT 0,
    pdf_text_type TEXT NOT NULL,
    title_set INTEGER NOT NULL DEFAULT 0,
    language_set INTEGER NOT NULL DEFAULT 0,
    page_count INTEGER NOT NULL DEFAULT 0,
    has_form INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS drupal_pdf_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pdf_uri TEXT NOT NULL,
    parent_uri TEXT NOT NULL,
    drupal_site_id INTEGER NOT NULL REFERENCES drupal_site(id),
    file_hash TEXT NOT NULL,
    pdf_returns_404 INTEGER NOT NULL DEFAULT 0,
    parent_returns_404 INTEGER NOT NULL DEFAULT 0,
    pdf_is_archived INTEGER NOT NULL DEFAULT 0,
    passed_contains_accessible_in_title INTEGER NOT NULL DEFAULT 0,
    pdf_is_removed INTEGER NOT NULL DEFAULT 0,
    removed_at TEXT,
    scanned_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_pdf_files_identity
    ON drupal_pdf_files(pdf_uri, parent_uri, file_hash);
CREATE INDEX IF NOT EXISTS idx_pdf_files_site ON drupal_pdf_files(drupal_site_id);
CREATE INDEX IF NOT EXISTS idx_pdf_files_hash ON drupal_pdf_files(file_hash);

CREATE TABLE IF NOT EXISTS failure (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drupal_site_id INTEGER NOT NULL REFERENCES drupal_site(id),
    pdf_id INTEGER REFERENCES drupal_pdf_files(id),
    pdf_uri TEXT NOT NULL,
    parent_uri TEXT NOT NULL,
    error_message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failure_site ON failure(drupal_site_id);
"#;

/// Database context that owns the connection pool and hands out repositories.
///
/// Create one context per command or service, then use it to access all repositories.
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: SqlitePool,
}

impl DbContext {
    /// Create a new database context from a file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: SqlitePool::from_path(db_path),
        }
    }

    /// Create a new database context from a database URL (`sqlite:path` or a plain path).
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: SqlitePool::new(database_url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await
    }

    pub fn sites(&self) -> SiteRepository {
        SiteRepository::new(self.pool.clone())
    }

    pub fn pdf_files(&self) -> PdfFileRepository {
        PdfFileRepository::new(self.pool.clone())
    }

    pub fn failures(&self) -> FailureRepository {
        FailureRepository::new(self.pool.clone())
    }

    pub async fn list_sites(&self) -> Result<Vec<Site>, DieselError> {
        self.sites().get_all().await
    }

    /// Report summaries of a site; `None` when the domain is not registered.
    pub async fn list_reports_for_site(
        &self,
        domain: &str,
    ) -> Result<Option<Vec<ReportSummary>>, DieselError> {
        match self.sites().get_by_domain(domain).await? {
            Some(site) => Ok(Some(self.pdf_files().reports_for_site(site.id).await?)),
            None => Ok(None),
        }
    }

    /// Failures of a site; `None` when the domain is not registered.
    pub async fn list_failures_for_site(
        &self,
        domain: &str,
    ) -> Result<Option<Vec<Failure>>, DieselError> {
        match self.sites().get_by_domain(domain).await? {
            Some(site) => Ok(Some(self.failures().get_by_site(site.id).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::setup_test_db;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let (ctx, _dir) = setup_test_db().await;
        ctx.init_schema().await.unwrap();
        assert!(ctx.list_sites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_for_unknown_domain() {
        let (ctx, _dir) = setup_test_db().await;
        assert!(ctx.list_reports_for_site("nope.sfsu.edu").await.unwrap().is_none());
        assert!(ctx.list_failures_for_site("nope.sfsu.edu").await.unwrap().is_none());
    }
}
