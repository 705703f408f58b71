//! Append-only failure log.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::{FailureRecord, NewFailure};
use crate::models::{Failure, PdfPair};
use crate::schema::{drupal_pdf_files, failure};

/// Repository for the `failure` table.
#[derive(Clone)]
pub struct FailureRepository {
    pool: SqlitePool,
}

impl FailureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a processing failure.
    ///
    /// Links the newest PDF row for the pair when one exists; the raw URIs are
    /// always stored so unlinked failures stay readable.
    pub async fn record_failure(
        &self,
        pair: &PdfPair,
        site_id: i32,
        message: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let pdf_id = drupal_pdf_files::table
            .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
            .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
            .order(drupal_pdf_files::id.desc())
            .select(drupal_pdf_files::id)
            .first::<i32>(&mut conn)
            .await
            .optional()?;

        let created_at = Utc::now().to_rfc3339();
        diesel::insert_into(failure::table)
            .values(&NewFailure {
                drupal_site_id: site_id,
                pdf_id,
                pdf_uri: &pair.pdf_uri,
                parent_uri: &pair.parent_uri,
                error_message: message,
                created_at: &created_at,
            })
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Failures of a site, newest first.
    pub async fn get_by_site(&self, site_id: i32) -> Result<Vec<Failure>, DieselError> {
        let mut conn = self.pool.get().await?;
        failure::table
            .filter(failure::drupal_site_id.eq(site_id))
            .order(failure::id.desc())
            .select(FailureRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Failure::from).collect())
    }

    pub async fn count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        failure::table.count().get_result(&mut conn).await
    }
}
