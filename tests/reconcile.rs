//! Reconciliation job tests: removal safety, 404 refresh and archive detection.

mod common;

use std::sync::Arc;

use common::{report, FakeFetcher, Workspace, CRAWL_FILENAME};
use pdfaudit::config::OverwritePolicy;
use pdfaudit::fetch::ProbeOutcome;
use pdfaudit::models::{PdfFile, PdfPair};
use pdfaudit::services::ReconcileService;

/// Store a checked PDF row directly.
async fn seed(ws: &Workspace, site_id: i32, pdf_uri: &str, parent_uri: &str, hash: &str) {
    seed_archived(ws, site_id, pdf_uri, parent_uri, hash, false).await;
}

async fn seed_archived(
    ws: &Workspace,
    site_id: i32,
    pdf_uri: &str,
    parent_uri: &str,
    hash: &str,
    archived: bool,
) {
    ws.db
        .pdf_files()
        .upsert_pdf_and_report(
            &PdfPair::new(pdf_uri, parent_uri),
            site_id,
            &report(hash, 1),
            archived,
            OverwritePolicy::KeepExisting,
        )
        .await
        .unwrap();
}

async fn row(ws: &Workspace, pdf_uri: &str) -> PdfFile {
    ws.db
        .pdf_files()
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .find(|f| f.pdf_uri == pdf_uri)
        .unwrap()
}

fn service(ws: &Workspace, fetcher: &Arc<FakeFetcher>) -> ReconcileService {
    ReconcileService::new(ws.db.clone(), fetcher.clone())
}

#[tokio::test]
async fn missing_or_empty_crawl_removes_nothing() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/b.pdf", "https://x.sfsu.edu/page1", "H2").await;
    let fetcher = Arc::new(FakeFetcher::new());

    // Folder exists, crawl file does not.
    std::fs::create_dir_all(ws.site_folders().join("x-sfsu-edu")).unwrap();
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
        .await
        .unwrap();
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.folders_skipped, 1);

    // Crawl file exists but lists nothing.
    ws.write_crawl("x-sfsu-edu", &[]);
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, Some("x.sfsu.edu"))
        .await
        .unwrap();
    assert_eq!(summary.removed, 0);

    let files = ws.db.pdf_files().get_by_site(site.id).await.unwrap();
    assert!(files.iter().all(|f| !f.pdf_is_removed));
}

#[tokio::test]
async fn pairs_missing_from_crawl_are_removed_and_restored() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/b.pdf", "https://x.sfsu.edu/page1", "H2").await;
    seed(&ws, site.id, "https://sfsu.box.com/s/abc123", "https://x.sfsu.edu/page2", "H3").await;
    let fetcher = Arc::new(FakeFetcher::new());

    // b.pdf is gone; the Box link now appears in its app.box.com form.
    ws.write_crawl(
        "x-sfsu-edu",
        &[
            "https://x.sfsu.edu/a.pdf https://x.sfsu.edu/page1",
            "https://sfsu.app.box.com/s/abc123/ https://x.sfsu.edu/page2",
        ],
    );
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
        .await
        .unwrap();
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.folders, 1);

    assert!(row(&ws, "https://x.sfsu.edu/b.pdf").await.pdf_is_removed);
    assert!(row(&ws, "https://x.sfsu.edu/b.pdf").await.removed_at.is_some());
    assert!(!row(&ws, "https://x.sfsu.edu/a.pdf").await.pdf_is_removed);
    assert!(!row(&ws, "https://sfsu.box.com/s/abc123").await.pdf_is_removed);

    // Re-running with the same crawl changes nothing.
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
        .await
        .unwrap();
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.restored, 0);

    // b.pdf comes back.
    ws.write_crawl(
        "x-sfsu-edu",
        &[
            "https://x.sfsu.edu/a.pdf https://x.sfsu.edu/page1",
            "https://x.sfsu.edu/b.pdf https://x.sfsu.edu/page1",
            "https://sfsu.box.com/s/abc123 https://x.sfsu.edu/page2",
        ],
    );
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
        .await
        .unwrap();
    assert_eq!(summary.restored, 1);
    assert!(!row(&ws, "https://x.sfsu.edu/b.pdf").await.pdf_is_removed);
}

#[tokio::test]
async fn superseded_hashes_stay_removed_across_runs() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H2").await;
    assert_eq!(ws.db.pdf_files().delete_duplicates(site.id).await.unwrap(), 1);
    let fetcher = Arc::new(FakeFetcher::new());

    ws.write_crawl("x-sfsu-edu", &["https://x.sfsu.edu/a.pdf https://x.sfsu.edu/page1"]);
    let before = ws.db.pdf_files().get_by_site(site.id).await.unwrap();

    for _ in 0..2 {
        let summary = service(&ws, &fetcher)
            .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
            .await
            .unwrap();
        assert_eq!(summary.removed, 0);
        assert_eq!(summary.restored, 0);
    }

    let after = ws.db.pdf_files().get_by_site(site.id).await.unwrap();
    let old = after.iter().find(|f| f.file_hash == "H1").unwrap();
    assert!(old.pdf_is_removed);
    assert_eq!(
        old.removed_at,
        before.iter().find(|f| f.file_hash == "H1").unwrap().removed_at
    );
    assert!(!after.iter().find(|f| f.file_hash == "H2").unwrap().pdf_is_removed);
}

#[tokio::test]
async fn reappearing_pair_restores_only_its_newest_row() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/a.pdf", "https://x.sfsu.edu/page1", "H2").await;
    seed(&ws, site.id, "https://x.sfsu.edu/b.pdf", "https://x.sfsu.edu/page1", "H3").await;
    let fetcher = Arc::new(FakeFetcher::new());

    ws.write_crawl("x-sfsu-edu", &["https://x.sfsu.edu/b.pdf https://x.sfsu.edu/page1"]);
    let summary = service(&ws, &fetcher)
        .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
        .await
        .unwrap();
    assert_eq!(summary.removed, 2);

    ws.write_crawl(
        "x-sfsu-edu",
        &[
            "https://x.sfsu.edu/a.pdf https://x.sfsu.edu/page1",
            "https://x.sfsu.edu/b.pdf https://x.sfsu.edu/page1",
        ],
    );
    for expected in [1, 0] {
        let summary = service(&ws, &fetcher)
            .remove_stale(&ws.site_folders(), CRAWL_FILENAME, None)
            .await
            .unwrap();
        assert_eq!(summary.restored, expected);
    }

    let files = ws.db.pdf_files().get_by_site(site.id).await.unwrap();
    assert!(files.iter().find(|f| f.file_hash == "H1").unwrap().pdf_is_removed);
    assert!(!files.iter().find(|f| f.file_hash == "H2").unwrap().pdf_is_removed);
}

#[tokio::test]
async fn link_check_includes_removed_rows() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/gone.pdf", "https://x.sfsu.edu/page1", "H1").await;
    ws.db
        .pdf_files()
        .mark_pdf_removed(&PdfPair::new("https://x.sfsu.edu/gone.pdf", "https://x.sfsu.edu/page1"))
        .await
        .unwrap();

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.set_probe("https://x.sfsu.edu/gone.pdf", ProbeOutcome::Status(404));

    let summary = service(&ws, &fetcher).refresh_404_flags(None, false).await.unwrap();
    assert_eq!(summary.checked, 1);
    assert!(row(&ws, "https://x.sfsu.edu/gone.pdf").await.pdf_returns_404);
}

#[tokio::test]
async fn link_check_records_404_flags() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/gone.pdf", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/ok.pdf", "https://x.sfsu.edu/page1", "H2").await;
    seed(&ws, site.id, "https://x.sfsu.edu/down.pdf", "https://x.sfsu.edu/moved", "H3").await;
    seed(&ws, site.id, "https://x.sfsu.edu/forbidden.pdf", "https://x.sfsu.edu/page1", "H4").await;
    seed(&ws, site.id, "https://x.sfsu.edu/has space.pdf", "https://x.sfsu.edu/page1", "H5").await;

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.set_probe("https://x.sfsu.edu/gone.pdf", ProbeOutcome::Status(404));
    fetcher.set_probe(
        "https://x.sfsu.edu/down.pdf",
        ProbeOutcome::Unreachable("connection refused".to_string()),
    );
    fetcher.set_probe("https://x.sfsu.edu/moved", ProbeOutcome::Status(404));
    fetcher.set_probe("https://x.sfsu.edu/forbidden.pdf", ProbeOutcome::Status(403));

    let summary = service(&ws, &fetcher)
        .refresh_404_flags(Some("x.sfsu.edu"), false)
        .await
        .unwrap();
    assert_eq!(summary.checked, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.pdf_404, 2);
    assert_eq!(summary.parent_404, 1);

    let gone = row(&ws, "https://x.sfsu.edu/gone.pdf").await;
    assert!(gone.pdf_returns_404);
    assert!(!gone.parent_returns_404);

    let down = row(&ws, "https://x.sfsu.edu/down.pdf").await;
    assert!(down.pdf_returns_404);
    assert!(down.parent_returns_404);

    assert!(!row(&ws, "https://x.sfsu.edu/forbidden.pdf").await.pdf_returns_404);
    assert!(!row(&ws, "https://x.sfsu.edu/ok.pdf").await.pdf_returns_404);

    // page1 is shared by three probed rows but probed once.
    let probed = fetcher.probed.lock().unwrap();
    assert_eq!(
        probed.iter().filter(|u| *u == "https://x.sfsu.edu/page1").count(),
        1
    );
    assert!(!probed.iter().any(|u| u.contains("has space")));
}

#[tokio::test]
async fn box_only_link_check_resolves_shares() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://sfsu.box.com/s/live", "https://x.sfsu.edu/page1", "H1").await;
    seed(&ws, site.id, "https://sfsu.box.com/s/deleted", "https://x.sfsu.edu/page1", "H2").await;
    seed(&ws, site.id, "https://x.sfsu.edu/plain.pdf", "https://x.sfsu.edu/page1", "H3").await;

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.set_share(
        "https://sfsu.box.com/s/live",
        "https://sfsu.app.box.com/index.php?rm=box_download_shared_file&shared_name=live&file_id=f_1",
        "handbook.pdf",
    );

    let summary = service(&ws, &fetcher).refresh_404_flags(None, true).await.unwrap();
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.pdf_404, 1);

    assert!(!row(&ws, "https://sfsu.box.com/s/live").await.pdf_returns_404);
    assert!(row(&ws, "https://sfsu.box.com/s/deleted").await.pdf_returns_404);

    let probed = fetcher.probed.lock().unwrap();
    assert!(probed.iter().any(|u| u.contains("shared_name=live")));
    assert!(!probed.iter().any(|u| u.contains("plain.pdf")));
}

#[tokio::test]
async fn archive_detection_uses_page_markers_and_url_tokens() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/current.pdf", "https://x.sfsu.edu/forms", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/2016.pdf", "https://x.sfsu.edu/forms", "H2").await;
    seed(&ws, site.id, "https://x.sfsu.edu/old/plan.pdf", "https://x.sfsu.edu/unreachable", "H3").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/plain.pdf", "https://x.sfsu.edu/unreachable", "H4").await;

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.set_page(
        "https://x.sfsu.edu/forms",
        r#"<h2>Forms</h2>
           <a href="/files/current.pdf">Current</a>
           <h2>Past Events</h2>
           <a href="/files/2016.pdf">2016</a>"#,
    );

    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.checked, 4);
    assert_eq!(summary.flagged, 2);
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.page_failures, 1);

    assert!(row(&ws, "https://x.sfsu.edu/files/2016.pdf").await.pdf_is_archived);
    assert!(row(&ws, "https://x.sfsu.edu/old/plan.pdf").await.pdf_is_archived);
    assert!(!row(&ws, "https://x.sfsu.edu/files/current.pdf").await.pdf_is_archived);
    assert!(!row(&ws, "https://x.sfsu.edu/files/plain.pdf").await.pdf_is_archived);

    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.flagged, 0);
}

#[tokio::test]
async fn archive_flag_follows_page_markers_between_runs() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/2016.pdf", "https://x.sfsu.edu/forms", "H1").await;
    let fetcher = Arc::new(FakeFetcher::new());

    fetcher.set_page(
        "https://x.sfsu.edu/forms",
        r#"<h2>Archive</h2><a href="/files/2016.pdf">2016</a>"#,
    );
    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.flagged, 1);
    assert!(row(&ws, "https://x.sfsu.edu/files/2016.pdf").await.pdf_is_archived);

    // A page that can't be read leaves the verdict alone.
    fetcher.remove_page("https://x.sfsu.edu/forms");
    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.page_failures, 1);
    assert_eq!(summary.cleared, 0);
    assert!(row(&ws, "https://x.sfsu.edu/files/2016.pdf").await.pdf_is_archived);

    // The marker is gone from the page.
    fetcher.set_page(
        "https://x.sfsu.edu/forms",
        r#"<h2>Forms</h2><a href="/files/2016.pdf">2016</a>"#,
    );
    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.cleared, 1);
    assert_eq!(summary.flagged, 0);
    assert!(!row(&ws, "https://x.sfsu.edu/files/2016.pdf").await.pdf_is_archived);
}

#[tokio::test]
async fn box_links_are_judged_by_resolved_file_name() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    let parent = "https://x.sfsu.edu/forms";
    seed_archived(&ws, site.id, "https://sfsu.box.com/s/k1", parent, "H1", true).await;
    seed_archived(&ws, site.id, "https://sfsu.box.com/s/k2", parent, "H2", true).await;
    seed_archived(&ws, site.id, "https://sfsu.box.com/s/k3", parent, "H3", true).await;

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.set_page(parent, "<h1>Forms</h1>");
    fetcher.set_share(
        "https://sfsu.box.com/s/k1",
        "https://sfsu.app.box.com/index.php?rm=box_download_shared_file&shared_name=k1&file_id=f_1",
        "legacy_catalog.pdf",
    );
    fetcher.set_share(
        "https://sfsu.box.com/s/k2",
        "https://sfsu.app.box.com/index.php?rm=box_download_shared_file&shared_name=k2&file_id=f_2",
        "catalog.pdf",
    );

    let summary = service(&ws, &fetcher).update_archived(None, false).await.unwrap();
    assert_eq!(summary.cleared, 1);
    assert!(row(&ws, "https://sfsu.box.com/s/k1").await.pdf_is_archived);
    assert!(!row(&ws, "https://sfsu.box.com/s/k2").await.pdf_is_archived);
    // Not resolvable: the stored verdict stands.
    assert!(row(&ws, "https://sfsu.box.com/s/k3").await.pdf_is_archived);
}

#[tokio::test]
async fn url_only_archive_detection_fetches_no_pages() {
    let ws = Workspace::new().await;
    let site = ws.add_site("x.sfsu.edu").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/legacy_report.pdf", "https://x.sfsu.edu/", "H1").await;
    seed(&ws, site.id, "https://x.sfsu.edu/files/spring_report.pdf", "https://x.sfsu.edu/", "H2").await;

    let fetcher = Arc::new(FakeFetcher::new());
    let summary = service(&ws, &fetcher).update_archived(Some("x.sfsu.edu"), true).await.unwrap();
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.pages_fetched + summary.page_failures, 0);

    assert!(row(&ws, "https://x.sfsu.edu/files/legacy_report.pdf").await.pdf_is_archived);
    assert!(!row(&ws, "https://x.sfsu.edu/files/spring_report.pdf").await.pdf_is_archived);
}

#[tokio::test]
async fn unknown_domain_is_an_error() {
    let ws = Workspace::new().await;
    let fetcher = Arc::new(FakeFetcher::new());
    assert!(service(&ws, &fetcher)
        .refresh_404_flags(Some("nope.sfsu.edu"), false)
        .await
        .is_err());
}
