//! pdfaudit - PDF accessibility conformance scanning for university websites.
//!
//! Reads per-site crawl output, checks every discovered PDF with veraPDF,
//! stores content-addressed reports in SQLite and keeps their 404, archive
//! and removal flags in line with the live sites.

pub mod archive;
pub mod cli;
pub mod config;
pub mod conformance;
pub mod crawl;
pub mod fetch;
pub mod http_client;
pub mod models;
pub mod repository;
pub mod schema;
pub mod services;
