//! Schema tests
//!
//! Inspects the database written by `init_schema` with rusqlite, independently
//! of Diesel, and checks the store-enforced uniqueness rules.

use std::collections::BTreeSet;

use pdfaudit::repository::DbContext;
use rusqlite::{params, Connection, Result as SqliteResult};

async fn create_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pdfaudit.db");
    let ctx = DbContext::new(&path);
    ctx.init_schema().await.unwrap();
    // Running it twice must be harmless.
    ctx.init_schema().await.unwrap();
    (dir, path)
}

fn table_names(conn: &Connection) -> SqliteResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<BTreeSet<String>>>()?;
    Ok(names)
}

fn column_names(conn: &Connection, table: &str) -> SqliteResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let names = stmt
        .query_map([], |row| row.get(1))?
        .collect::<SqliteResult<BTreeSet<String>>>()?;
    Ok(names)
}

/// Columns of each unique index on a table.
fn unique_indexes(conn: &Connection, table: &str) -> SqliteResult<Vec<Vec<String>>> {
    let mut list = conn.prepare(&format!("PRAGMA index_list(\"{}\")", table))?;
    let indexes: Vec<(String, bool)> = list
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?
        .collect::<SqliteResult<_>>()?;

    let mut result = Vec::new();
    for (name, unique) in indexes {
        if !unique {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name))?;
        let columns = info
            .query_map([], |row| row.get(2))?
            .collect::<SqliteResult<Vec<String>>>()?;
        result.push(columns);
    }
    Ok(result)
}

#[tokio::test]
async fn schema_has_all_tables_and_columns() {
    let (_dir, path) = create_db().await;
    let conn = Connection::open(&path).unwrap();

    let tables = table_names(&conn).unwrap();
    for table in ["drupal_site", "drupal_pdf_files", "pdf_report", "failure"] {
        assert!(tables.contains(table), "missing table {}", table);
    }

    let pdf_columns = column_names(&conn, "drupal_pdf_files").unwrap();
    for column in [
        "pdf_uri",
        "parent_uri",
        "drupal_site_id",
        "file_hash",
        "pdf_returns_404",
        "parent_returns_404",
        "pdf_is_archived",
        "passed_contains_accessible_in_title",
        "pdf_is_removed",
        "removed_at",
        "scanned_at",
    ] {
        assert!(pdf_columns.contains(column), "missing column {}", column);
    }

    let report_columns = column_names(&conn, "pdf_report").unwrap();
    for column in [
        "pdf_hash",
        "violations",
        "failed_checks",
        "tagged",
        "check_for_image_only",
        "pdf_text_type",
        "title_set",
        "language_set",
        "page_count",
        "has_form",
    ] {
        assert!(report_columns.contains(column), "missing column {}", column);
    }
}

#[tokio::test]
async fn uniqueness_is_enforced_by_the_store() {
    let (_dir, path) = create_db().await;
    let conn = Connection::open(&path).unwrap();

    assert!(unique_indexes(&conn, "drupal_pdf_files")
        .unwrap()
        .contains(&vec![
            "pdf_uri".to_string(),
            "parent_uri".to_string(),
            "file_hash".to_string()
        ]));
    assert!(unique_indexes(&conn, "pdf_report")
        .unwrap()
        .contains(&vec!["pdf_hash".to_string()]));
    assert!(unique_indexes(&conn, "drupal_site")
        .unwrap()
        .contains(&vec!["domain_name".to_string()]));

    conn.execute("INSERT INTO drupal_site (domain_name) VALUES (?1)", params!["x.sfsu.edu"])
        .unwrap();
    let insert = "INSERT INTO drupal_pdf_files (pdf_uri, parent_uri, drupal_site_id, file_hash, scanned_at) \
                  VALUES (?1, ?2, 1, ?3, '2024-01-01T00:00:00+00:00')";
    conn.execute(insert, params!["https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H"])
        .unwrap();
    assert!(conn
        .execute(insert, params!["https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H"])
        .is_err());
    // A new hash for the same pair is a new row.
    conn.execute(insert, params!["https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H2"])
        .unwrap();
}

#[tokio::test]
async fn connections_use_write_ahead_log() {
    let (_dir, path) = create_db().await;
    let conn = Connection::open(&path).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
