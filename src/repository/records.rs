//! Diesel ORM records for database tables.

use diesel::prelude::*;

use super::util::{parse_datetime, parse_datetime_opt};
use crate::models::{ConformanceReport, Failure, PdfFile, PdfTextType, Site};
use crate::schema;

/// Site record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::drupal_site)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SiteRecord {
    pub id: i32,
    pub domain_name: String,
    pub security_group_name: Option<String>,
    pub box_folder: Option<String>,
}

/// New site for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::drupal_site)]
pub struct NewSite<'a> {
    pub domain_name: &'a str,
    pub security_group_name: Option<&'a str>,
    pub box_folder: Option<&'a str>,
}

impl From<SiteRecord> for Site {
    fn from(record: SiteRecord) -> Self {
        Site {
            id: record.id,
            domain_name: record.domain_name,
            security_group_name: record.security_group_name,
            box_folder: record.box_folder,
        }
    }
}

/// PDF file record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::drupal_pdf_files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PdfFileRecord {
    pub id: i32,
    pub pdf_uri: String,
    pub parent_uri: String,
    pub drupal_site_id: i32,
    pub file_hash: String,
    pub pdf_returns_404: bool,
    pub parent_returns_404: bool,
    pub pdf_is_archived: bool,
    pub passed_contains_accessible_in_title: bool,
    pub pdf_is_removed: bool,
    pub removed_at: Option<String>,
    pub scanned_at: String,
}

/// New PDF file for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::drupal_pdf_files)]
pub struct NewPdfFile<'a> {
    pub pdf_uri: &'a str,
    pub parent_uri: &'a str,
    pub drupal_site_id: i32,
    pub file_hash: &'a str,
    pub pdf_returns_404: bool,
    pub parent_returns_404: bool,
    pub pdf_is_archived: bool,
    pub passed_contains_accessible_in_title: bool,
    pub pdf_is_removed: bool,
    pub scanned_at: &'a str,
}

impl From<PdfFileRecord> for PdfFile {
    fn from(record: PdfFileRecord) -> Self {
        PdfFile {
            id: record.id,
            pdf_uri: record.pdf_uri,
            parent_uri: record.parent_uri,
            site_id: record.drupal_site_id,
            file_hash: record.file_hash,
            pdf_returns_404: record.pdf_returns_404,
            parent_returns_404: record.parent_returns_404,
            pdf_is_archived: record.pdf_is_archived,
            passed_contains_accessible_in_title: record.passed_contains_accessible_in_title,
            pdf_is_removed: record.pdf_is_removed,
            removed_at: parse_datetime_opt(record.removed_at.as_deref()),
            scanned_at: parse_datetime(&record.scanned_at),
        }
    }
}

/// Conformance report record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::pdf_report)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReportRecord {
    pub id: i32,
    pub pdf_hash: String,
    pub violations: i32,
    pub failed_checks: i32,
    pub tagged: bool,
    pub check_for_image_only: bool,
    pub pdf_text_type: String,
    pub title_set: bool,
    pub language_set: bool,
    pub page_count: i32,
    pub has_form: bool,
    pub created_at: String,
}

/// New report for insertion.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = schema::pdf_report)]
pub struct NewReport<'a> {
    pub pdf_hash: &'a str,
    pub violations: i32,
    pub failed_checks: i32,
    pub tagged: bool,
    pub check_for_image_only: bool,
    pub pdf_text_type: &'a str,
    pub title_set: bool,
    pub language_set: bool,
    pub page_count: i32,
    pub has_form: bool,
    pub created_at: &'a str,
}

impl<'a> NewReport<'a> {
    pub fn from_report(report: &'a ConformanceReport, created_at: &'a str) -> Self {
        Self {
            pdf_hash: &report.pdf_hash,
            violations: report.violations,
            failed_checks: report.failed_checks,
            tagged: report.tagged,
            check_for_image_only: report.check_for_image_only,
            pdf_text_type: report.pdf_text_type.as_str(),
            title_set: report.title_set,
            language_set: report.language_set,
            page_count: report.page_count,
            has_form: report.has_form,
            created_at,
        }
    }
}

impl From<ReportRecord> for ConformanceReport {
    fn from(record: ReportRecord) -> Self {
        ConformanceReport {
            pdf_hash: record.pdf_hash,
            violations: record.violations,
            failed_checks: record.failed_checks,
            tagged: record.tagged,
            check_for_image_only: record.check_for_image_only,
            pdf_text_type: PdfTextType::from_str(&record.pdf_text_type),
            title_set: record.title_set,
            language_set: record.language_set,
            page_count: record.page_count,
            has_form: record.has_form,
        }
    }
}

/// Failure record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::failure)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FailureRecord {
    pub id: i32,
    pub drupal_site_id: i32,
    pub pdf_id: Option<i32>,
    pub pdf_uri: String,
    pub parent_uri: String,
    pub error_message: String,
    pub created_at: String,
}

/// New failure for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::failure)]
pub struct NewFailure<'a> {
    pub drupal_site_id: i32,
    pub pdf_id: Option<i32>,
    pub pdf_uri: &'a str,
    pub parent_uri: &'a str,
    pub error_message: &'a str,
    pub created_at: &'a str,
}

impl From<FailureRecord> for Failure {
    fn from(record: FailureRecord) -> Self {
        Failure {
            id: record.id,
            site_id: record.drupal_site_id,
            pdf_id: record.pdf_id,
            pdf_uri: record.pdf_uri,
            parent_uri: record.parent_uri,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
        }
    }
}
