use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::{FetchError, SegmentSource};
use crate::config::HttpConfig;

/// Fetches segments over HTTP(S) with browser-like headers.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client from the `[http]` config section.
    ///
    /// `referer` is sent with every request when given.
    pub fn new(config: &HttpConfig, referer: Option<&str>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = referer {
            match HeaderValue::from_str(referer) {
                Ok(value) => {
                    headers.insert(REFERER, value);
                }
                Err(_) => tracing::warn!("Ignoring invalid referer: {}", referer),
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SegmentSource for HttpSource {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = File::create(dest).await?;
        let mut total = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        file.flush().await?;

        if total == 0 {
            return Err(FetchError::Empty);
        }

        tracing::debug!("Wrote {} bytes to {:?}", total, dest);
        Ok(total)
    }
}

/// `scheme://host[:port]/` of a URL, used as the default Referer.
///
/// ```
/// use segforge::fetch::origin_of;
///
/// assert_eq!(
///     origin_of("https://cdn.example:8443/a/b.ts?x=1").as_deref(),
///     Some("https://cdn.example:8443/")
/// );
/// assert_eq!(origin_of("not a url"), None);
/// ```
pub fn origin_of(location: &str) -> Option<String> {
    let url = url::Url::parse(location).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(format!("{}/", origin.ascii_serialization()))
}
