//! Repository for discovered PDFs and their content-addressed reports.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::pool::{DieselError, SqlitePool};
use super::records::{NewPdfFile, NewReport, PdfFileRecord, ReportRecord};
use crate::config::OverwritePolicy;
use crate::models::{ConformanceReport, PdfFile, PdfPair, ReportSummary};
use crate::schema::{drupal_pdf_files, pdf_report};

/// What an upsert actually changed.
///
/// Duplicate keys are not errors: a `false` here means the row was already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub pdf_id: i32,
    pub report_inserted: bool,
    pub report_replaced: bool,
    pub pdf_inserted: bool,
}

impl UpsertOutcome {
    /// True when neither row was created.
    pub fn is_noop(&self) -> bool {
        !self.report_inserted && !self.report_replaced && !self.pdf_inserted
    }
}

/// Repository for `drupal_pdf_files` and `pdf_report`.
#[derive(Clone)]
pub struct PdfFileRepository {
    pool: SqlitePool,
}

impl PdfFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// True only if a row exists for the exact URI pair AND a report exists for its hash.
    pub async fn report_exists(&self, pair: &PdfPair) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let count: i64 = drupal_pdf_files::table
            .inner_join(pdf_report::table.on(pdf_report::pdf_hash.eq(drupal_pdf_files::file_hash)))
            .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
            .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(count > 0)
    }

    /// Insert the report (keyed by hash) and the PDF row (keyed by URI pair and hash)
    /// in one transaction.
    ///
    /// Neither row is ever duplicated. With [`OverwritePolicy::Replace`] an existing
    /// report is overwritten with `report` and an existing PDF row gets its archive
    /// flag and scan time refreshed.
    pub async fn upsert_pdf_and_report(
        &self,
        pair: &PdfPair,
        site_id: i32,
        report: &ConformanceReport,
        archived: bool,
        policy: OverwritePolicy,
    ) -> Result<UpsertOutcome, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        conn.transaction::<_, DieselError, _>(|conn| {
            Box::pin(async move {
                let new_report = NewReport::from_report(report, &now);
                let report_inserted = diesel::insert_into(pdf_report::table)
                    .values(&new_report)
                    .on_conflict(pdf_report::pdf_hash)
                    .do_nothing()
                    .execute(conn)
                    .await?
                    > 0;

                let report_replaced = if !report_inserted && policy == OverwritePolicy::Replace {
                    diesel::update(pdf_report::table.filter(pdf_report::pdf_hash.eq(&report.pdf_hash)))
                        .set(&new_report)
                        .execute(conn)
                        .await?
                        > 0
                } else {
                    false
                };

                let pdf_inserted = diesel::insert_into(drupal_pdf_files::table)
                    .values(&NewPdfFile {
                        pdf_uri: &pair.pdf_uri,
                        parent_uri: &pair.parent_uri,
                        drupal_site_id: site_id,
                        file_hash: &report.pdf_hash,
                        pdf_returns_404: false,
                        parent_returns_404: false,
                        pdf_is_archived: archived,
                        passed_contains_accessible_in_title: pair.mentions_accessible(),
                        pdf_is_removed: false,
                        scanned_at: &now,
                    })
                    .on_conflict((
                        drupal_pdf_files::pdf_uri,
                        drupal_pdf_files::parent_uri,
                        drupal_pdf_files::file_hash,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .await?
                    > 0;

                let identity = || {
                    drupal_pdf_files::table
                        .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
                        .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
                        .filter(drupal_pdf_files::file_hash.eq(&report.pdf_hash))
                };

                if !pdf_inserted && policy == OverwritePolicy::Replace {
                    diesel::update(identity())
                        .set((
                            drupal_pdf_files::pdf_is_archived.eq(archived),
                            drupal_pdf_files::scanned_at.eq(&now),
                            drupal_pdf_files::pdf_is_removed.eq(false),
                            drupal_pdf_files::removed_at.eq(None::<String>),
                        ))
                        .execute(conn)
                        .await?;
                }

                let pdf_id = identity()
                    .select(drupal_pdf_files::id)
                    .first::<i32>(conn)
                    .await?;

                Ok(UpsertOutcome {
                    pdf_id,
                    report_inserted,
                    report_replaced,
                    pdf_inserted,
                })
            })
        })
        .await
    }

    /// Id of the newest row for a URI pair.
    pub async fn get_id(&self, pair: &PdfPair) -> Result<Option<i32>, DieselError> {
        let mut conn = self.pool.get().await?;
        drupal_pdf_files::table
            .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
            .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
            .order(drupal_pdf_files::id.desc())
            .select(drupal_pdf_files::id)
            .first::<i32>(&mut conn)
            .await
            .optional()
    }

    /// Logically remove every active row for a URI pair.
    ///
    /// Returns the number of rows flagged; zero is not an error.
    pub async fn mark_pdf_removed(&self, pair: &PdfPair) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();
        diesel::update(
            drupal_pdf_files::table
                .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
                .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
                .filter(drupal_pdf_files::pdf_is_removed.eq(false)),
        )
        .set((
            drupal_pdf_files::pdf_is_removed.eq(true),
            drupal_pdf_files::removed_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await
    }

    /// Bring back a pair that reappeared in a crawl by clearing the removed
    /// flag on its newest row.
    ///
    /// A pair that still has an active row is left alone, so superseded
    /// hashes stay removed. Returns the number of rows restored.
    pub async fn restore_pdf(&self, pair: &PdfPair) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, DieselError, _>(|conn| {
            Box::pin(async move {
                let rows = || {
                    drupal_pdf_files::table
                        .filter(drupal_pdf_files::pdf_uri.eq(&pair.pdf_uri))
                        .filter(drupal_pdf_files::parent_uri.eq(&pair.parent_uri))
                };

                let active: i64 = rows()
                    .filter(drupal_pdf_files::pdf_is_removed.eq(false))
                    .count()
                    .get_result(conn)
                    .await?;
                if active > 0 {
                    return Ok(0);
                }

                let Some(newest) = rows()
                    .order(drupal_pdf_files::id.desc())
                    .select(drupal_pdf_files::id)
                    .first::<i32>(conn)
                    .await
                    .optional()?
                else {
                    return Ok(0);
                };

                diesel::update(drupal_pdf_files::table.find(newest))
                    .set((
                        drupal_pdf_files::pdf_is_removed.eq(false),
                        drupal_pdf_files::removed_at.eq(None::<String>),
                    ))
                    .execute(conn)
                    .await
            })
        })
        .await
    }

    /// All rows for a site, oldest first.
    pub async fn get_by_site(&self, site_id: i32) -> Result<Vec<PdfFile>, DieselError> {
        let mut conn = self.pool.get().await?;
        drupal_pdf_files::table
            .filter(drupal_pdf_files::drupal_site_id.eq(site_id))
            .order(drupal_pdf_files::id.asc())
            .select(PdfFileRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(PdfFile::from).collect())
    }

    /// All rows, oldest first.
    pub async fn get_all(&self) -> Result<Vec<PdfFile>, DieselError> {
        let mut conn = self.pool.get().await?;
        drupal_pdf_files::table
            .order(drupal_pdf_files::id.asc())
            .select(PdfFileRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(PdfFile::from).collect())
    }

    /// Persist the existence-probe results for one row.
    pub async fn set_404_flags(
        &self,
        id: i32,
        pdf_returns_404: bool,
        parent_returns_404: bool,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(drupal_pdf_files::table.find(id))
            .set((
                drupal_pdf_files::pdf_returns_404.eq(pdf_returns_404),
                drupal_pdf_files::parent_returns_404.eq(parent_returns_404),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn set_archived(&self, id: i32, archived: bool) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(drupal_pdf_files::table.find(id))
            .set(drupal_pdf_files::pdf_is_archived.eq(archived))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Logically remove older rows of a site that share a URI pair with a newer active row.
    ///
    /// Returns the number of rows flagged.
    pub async fn delete_duplicates(&self, site_id: i32) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query(
            r#"UPDATE drupal_pdf_files
               SET pdf_is_removed = 1, removed_at = ?1
               WHERE drupal_site_id = ?2
                 AND pdf_is_removed = 0
                 AND EXISTS (
                     SELECT 1 FROM drupal_pdf_files AS newer
                     WHERE newer.drupal_site_id = drupal_pdf_files.drupal_site_id
                       AND newer.pdf_uri = drupal_pdf_files.pdf_uri
                       AND newer.parent_uri = drupal_pdf_files.parent_uri
                       AND newer.pdf_is_removed = 0
                       AND newer.id > drupal_pdf_files.id
                 )"#,
        )
        .bind::<Text, _>(Utc::now().to_rfc3339())
        .bind::<Integer, _>(site_id)
        .execute(&mut conn)
        .await
    }

    /// Rows of a site joined with their reports, removed ones included.
    pub async fn reports_for_site(&self, site_id: i32) -> Result<Vec<ReportSummary>, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<(PdfFileRecord, ReportRecord)> = drupal_pdf_files::table
            .inner_join(pdf_report::table.on(pdf_report::pdf_hash.eq(drupal_pdf_files::file_hash)))
            .filter(drupal_pdf_files::drupal_site_id.eq(site_id))
            .order(drupal_pdf_files::pdf_uri.asc())
            .select((PdfFileRecord::as_select(), ReportRecord::as_select()))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(file, report)| {
                let file = PdfFile::from(file);
                ReportSummary {
                    pdf_uri: file.pdf_uri,
                    parent_uri: file.parent_uri,
                    pdf_is_archived: file.pdf_is_archived,
                    pdf_returns_404: file.pdf_returns_404,
                    parent_returns_404: file.parent_returns_404,
                    pdf_is_removed: file.pdf_is_removed,
                    report: ConformanceReport::from(report),
                    checked_at: file.scanned_at,
                }
            })
            .collect())
    }

    /// Number of report rows.
    pub async fn count_reports(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        pdf_report::table.count().get_result(&mut conn).await
    }

    /// Number of PDF rows.
    pub async fn count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        drupal_pdf_files::table.count().get_result(&mut conn).await
    }
}
