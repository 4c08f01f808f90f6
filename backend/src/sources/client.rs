use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::config::SourceConfig;
use crate::sources::errors::SourceError;
use crate::sources::parser::Extractor;
use crate::sources::types::{RawResponse, SourceAdapter, SourceResult};

/// HTTP-backed source adapter: one GET per cycle, parsed by an `Extractor`.
#[derive(Clone)]
pub struct HttpSource {
    name: &'static str,
    http: Client,
    url: String,
    timeout: Duration,
    extractor: Extractor,
}

impl HttpSource {
    pub fn new(
        name: &'static str,
        cfg: &SourceConfig,
        headers: &[(HeaderName, &str)],
        extractor: Extractor,
    ) -> Result<Self, SourceError> {
        let mut default_headers = HeaderMap::new();
        for (key, value) in headers {
            let value = HeaderValue::from_str(value).map_err(|e| SourceError::InvalidHeader {
                name,
                reason: format!("{key}: {e}"),
            })?;
            default_headers.insert(key.clone(), value);
        }

        let http = Client::builder()
            .timeout(cfg.timeout)
            .default_headers(default_headers)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            name,
            http,
            url: cfg.url.clone(),
            timeout: cfg.timeout,
            extractor,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_raw(&self) -> Result<RawResponse, SourceError> {
        let resp = self.http.get(&self.url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.text().await?;

        Ok(RawResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[async_trait]
impl SourceAdapter for HttpSource {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self), fields(source = self.name), level = "debug")]
    async fn fetch(&self) -> SourceResult {
        let raw = match self.fetch_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = self.name, url = %self.url, error = %e, "source fetch failed");
                return SourceResult::absent();
            }
        };

        match self.extractor.extract(&raw) {
            Ok(v) => {
                debug!(source = self.name, value = v, "source value parsed");
                SourceResult {
                    value: Some(v),
                    raw: Some(raw),
                }
            }
            Err(e) => {
                warn!(
                    source = self.name,
                    content_type = raw.content_type.as_deref().unwrap_or("-"),
                    error = %e,
                    "source response unparseable"
                );
                SourceResult {
                    value: None,
                    raw: Some(raw),
                }
            }
        }
    }
}
