//! Remote fetching of PDFs, share pages, parent pages and existence probes.

pub mod box_share;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::http_client::{is_tls_error, HttpClient, HttpResponse};
pub use box_share::{is_box_share_url, normalize_box_url, ResolvedShare, UnsupportedShareError};

/// Transport-level failure of a fetch.
///
/// The display text is what gets stored in the failure log.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Couldn't download {status} {url}")]
    Status { status: u16, url: String },

    #[error("Couldn't download (insecure retry) {status} {url}")]
    InsecureStatus { status: u16, url: String },

    #[error("SSL error: {0}")]
    Tls(String),

    #[error("Couldn't download: request timed out ({0})")]
    Timeout(String),

    #[error("Couldn't download {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Downloaded content is not a PDF ({detected}): {url}")]
    NotPdf { url: String, detected: String },

    #[error(transparent)]
    UnsupportedShare(#[from] UnsupportedShareError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::InsecureStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if is_tls_error(&e) {
            Self::Tls(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A downloaded PDF.
#[derive(Debug, Clone)]
pub struct FetchedPdf {
    pub bytes: Vec<u8>,
    /// Name the server or share gave the file, if any.
    pub filename: Option<String>,
}

/// Result of an existence probe. Transport failures are not errors here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Status(u16),
    Unreachable(String),
}

impl ProbeOutcome {
    /// A 404 or no answer at all. Unreachable counts as broken.
    pub fn returns_404(&self) -> bool {
        match self {
            Self::Status(status) => *status == 404,
            Self::Unreachable(_) => true,
        }
    }
}

/// Everything the scan pipeline and reconciliation jobs need from the network.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Download a PDF, resolving share links first.
    async fn fetch_pdf(&self, url: &str) -> Result<FetchedPdf, FetchError>;

    /// Resolve a share link to its direct download.
    async fn resolve_share(&self, url: &str) -> Result<ResolvedShare, FetchError>;

    /// HEAD-style existence probe.
    async fn probe(&self, url: &str) -> ProbeOutcome;

    /// Fetch an HTML page.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Network-backed [`RemoteFetcher`].
#[derive(Clone)]
pub struct Fetcher {
    client: HttpClient,
    probe_timeout: Duration,
}

impl Fetcher {
    pub fn new(client: HttpClient, probe_timeout: Duration) -> Self {
        Self {
            client,
            probe_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let client = HttpClient::new(
            settings.request_timeout(),
            Some(&settings.user_agent),
            settings.allow_insecure_retry,
        )
        .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::new(client, settings.probe_timeout()))
    }

    /// GET with a single insecure retry on TLS failures.
    ///
    /// Returns the response and whether the insecure client served it.
    async fn send_get(&self, url: &str) -> Result<(HttpResponse, bool), FetchError> {
        match self.client.get(url).await {
            Ok(response) => Ok((response, false)),
            Err(e) if is_tls_error(&e) && self.client.can_retry_insecure() => {
                warn!("TLS verification failed for {}, retrying insecurely: {}", url, e);
                let response = self
                    .client
                    .get_insecure(url)
                    .await
                    .map_err(|e| FetchError::Tls(e.to_string()))?;
                Ok((response, true))
            }
            Err(e) => Err(FetchError::from_reqwest(e)),
        }
    }

    async fn checked_get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        let (response, insecure) = self.send_get(url).await?;
        if response.is_success() {
            return Ok(response);
        }

        let status = response.status.as_u16();
        let url = url.to_string();
        Err(if insecure {
            FetchError::InsecureStatus { status, url }
        } else {
            FetchError::Status { status, url }
        })
    }

    async fn download(&self, url: &str) -> Result<FetchedPdf, FetchError> {
        let response = self.checked_get(url).await?;
        let filename = response
            .content_disposition_filename()
            .or_else(|| filename_from_url(url));
        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;

        if !looks_like_pdf(&bytes) {
            let detected = infer::get(&bytes)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(FetchError::NotPdf {
                url: url.to_string(),
                detected,
            });
        }

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(FetchedPdf { bytes, filename })
    }
}

#[async_trait]
impl RemoteFetcher for Fetcher {
    async fn fetch_pdf(&self, url: &str) -> Result<FetchedPdf, FetchError> {
        if is_box_share_url(url) {
            let resolved = self.resolve_share(url).await?;
            let mut pdf = self.download(&resolved.download_url).await?;
            pdf.filename = Some(resolved.filename);
            return Ok(pdf);
        }
        self.download(url).await
    }

    async fn resolve_share(&self, url: &str) -> Result<ResolvedShare, FetchError> {
        let html = self.fetch_page(url).await?;
        let resolved = box_share::resolve_from_page(url, &html)?;
        debug!("Resolved share {} to {}", url, resolved.download_url);
        Ok(resolved)
    }

    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.head(url, self.probe_timeout).await {
            Ok(response) => ProbeOutcome::Status(response.status.as_u16()),
            Err(e) => {
                debug!("Probe of {} failed: {}", url, e);
                ProbeOutcome::Unreachable(e.to_string())
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.checked_get(url).await?;
        response.text().await.map_err(FetchError::from_reqwest)
    }
}

/// Whether bytes are a PDF, tolerating a little junk before the header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    if infer::get(bytes).is_some_and(|kind| kind.mime_type() == "application/pdf") {
        return true;
    }
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Last path segment of a URL, percent-decoded.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}
