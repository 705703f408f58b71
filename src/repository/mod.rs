//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM against SQLite. Every uniqueness and
//! idempotence rule of the scan pipeline is enforced here, by the store.

pub mod context;
pub mod failure;
pub mod pdf_file;
pub mod pool;
pub mod records;
pub mod site;
pub mod util;

pub use context::DbContext;
pub use failure::FailureRepository;
pub use pdf_file::{PdfFileRepository, UpsertOutcome};
pub use pool::{DieselError, SqlitePool};
pub use site::SiteRepository;
pub use util::{parse_datetime, to_diesel_error};
