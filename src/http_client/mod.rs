//! HTTP client with a browser-like identity and an optional insecure fallback.

mod response;
pub mod user_agent;

pub use response::{parse_content_disposition_filename, HeadResponse, HttpResponse};

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;

use user_agent::resolve_user_agent;

/// HTTP client used for downloads, share lookups and existence probes.
///
/// Holds a second client with certificate verification disabled when the
/// insecure retry is enabled; it is only used after a TLS failure.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    insecure: Option<Client>,
}

impl HttpClient {
    /// Build the client pair.
    pub fn new(
        timeout: Duration,
        user_agent_config: Option<&str>,
        allow_insecure_retry: bool,
    ) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Self::builder(&user_agent, timeout).build()?;
        let insecure = if allow_insecure_retry {
            Some(
                Self::builder(&user_agent, timeout)
                    .danger_accept_invalid_certs(true)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { client, insecure })
    }

    fn builder(user_agent: &str, timeout: Duration) -> reqwest::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(user_agent::ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
    }

    /// Whether an insecure retry is available.
    pub fn can_retry_insecure(&self) -> bool {
        self.insecure.is_some()
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        Ok(HttpResponse::from_response(response))
    }

    /// Make a GET request without certificate verification.
    ///
    /// Falls back to the verifying client when the insecure retry is disabled.
    pub async fn get_insecure(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let client = self.insecure.as_ref().unwrap_or(&self.client);
        let response = client.get(url).send().await?;
        Ok(HttpResponse::from_response(response))
    }

    /// Make a HEAD request with its own timeout.
    pub async fn head(&self, url: &str, timeout: Duration) -> Result<HeadResponse, reqwest::Error> {
        let response = self.client.head(url).timeout(timeout).send().await?;
        Ok(HeadResponse::from_response(&response))
    }
}

/// Whether a request failed because of certificate or TLS handshake problems.
pub fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(err) = source {
        let text = err.to_string().to_lowercase();
        if ["certificate", "tls", "ssl", "handshake", "unknownissuer"]
            .iter()
            .any(|marker| text.contains(marker))
        {
            return true;
        }
        source = err.source();
    }
    false
}
