use crate::core::fetch::{FetchError, Fetcher};
use anyhow::Context;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{REFERER, USER_AGENT};
use std::time::Duration;
use tracing::debug;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// GET-only transport with a per-request timeout and a host allow-list.
pub struct HttpFetcher {
    client: reqwest::Client,
    allowed_domains: Vec<String>,
    referer: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, allowed_domains: &[String], referer: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            allowed_domains: allowed_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            referer: referer.to_string(),
        })
    }

    /// An empty allow-list admits every host.
    fn is_allowed(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.allowed_domains.is_empty() || self.allowed_domains.iter().any(|d| *d == host)
    }

    fn random_user_agent() -> &'static str {
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed.host_str().unwrap_or_default();
        if !self.is_allowed(host) {
            return Err(FetchError::DomainNotAllowed {
                host: host.to_string(),
            });
        }

        debug!("Requesting {}", url);
        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, Self::random_user_agent())
            .header(REFERER, &self.referer)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Request {
                        url: url.to_string(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer, timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(timeout, &["127.0.0.1".to_string()], &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .and(header_exists("user-agent"))
            .and(header("referer", server.uri().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, Duration::from_secs(5));
        let body = fetcher
            .fetch(&format!("{}/data.json", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, Duration::from_secs(5));
        let url = format!("{}/down.json", server.uri());
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), format!("http status 503 for {url}"));
    }

    #[tokio::test]
    async fn test_disallowed_domain_is_rejected_without_request() {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(5),
            &["api.vanguard.com".to_string()],
            "https://api.vanguard.com",
        )
        .unwrap();

        let err = fetcher
            .fetch("https://example.com/anything.json")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::DomainNotAllowed { ref host } if host == "example.com"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5), &[], "").unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, Duration::from_millis(50));
        let err = fetcher
            .fetch(&format!("{}/slow.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
