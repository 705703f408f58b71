//! Service layer for the scan pipeline and reconciliation jobs.
//!
//! Services hold no UI concerns; the CLI drives them and renders their events.

pub mod reconcile;
pub mod scan;

pub use reconcile::{ArchiveSummary, LinkCheckSummary, ReconcileService, RemovalSummary};
pub use scan::{
    CompletedScanSet, FailureKind, ScanConfig, ScanEvent, ScanOrchestrator, ScanOutcome,
    ScanSummary,
};
