//! HTTP transport backed by [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;

use super::Transport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 5;

/// Feeds larger than this are refused outright.
const MAX_FEED_SIZE: u64 = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("feedsweep/", env!("CARGO_PKG_VERSION"));

/// Fetches feed documents over HTTP(S).
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` bounds each request end to end.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(size) = response.content_length() {
            if size > MAX_FEED_SIZE {
                return Err(FetchError::TooLarge { size, max: MAX_FEED_SIZE });
            }
        }

        let body = response.bytes().await?;
        if body.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchError::TooLarge {
                size: body.len() as u64,
                max: MAX_FEED_SIZE,
            });
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_short_timeout() {
        assert!(HttpTransport::new(Duration::from_millis(500)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let err = transport.fetch("http://127.0.0.1:1/feed.xml").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
