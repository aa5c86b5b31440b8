use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION};
use http::{HeaderMap, HeaderValue};
use rand::Rng;
use reqwest::{Client, Response};

use crate::config::FetchConfig;
use crate::logger::ILogger;

/// Gets the content of an url, `None` means the content could not be retrieved even after
/// retrying, implementors are expected to log why
pub trait Fetch: Send + Sync {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Option<Bytes>> + Send;
}

#[derive(Debug)]
enum Content {
    Text(String),
    Binary(Bytes),
}

/// Http implementation of [`Fetch`] which retries failed requests and waits a random amount of
/// time after each successful one so that the site is not overloaded
#[derive(Debug, Clone)]
pub struct HttpFetcher<L: ILogger> {
    client: Client,
    config: FetchConfig,
    logger: L,
}

/// Picks a random duration between `min` and `max`, both inclusive
fn random_delay((min, max): (Duration, Duration)) -> Duration {
    if min >= max {
        return min;
    }

    let to_millis = |delay: Duration| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let millis = rand::rng().random_range(to_millis(min)..=to_millis(max));

    Duration::from_millis(millis)
}

impl<L: ILogger + Send + Sync> HttpFetcher<L> {
    pub fn new(config: FetchConfig, logger: L) -> Result<Self, reqwest::Error> {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
        );
        default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers)
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, config, logger })
    }

    async fn send(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.client.get(url).send().await?.error_for_status()
    }

    async fn try_fetch(&self, url: &str, as_binary: bool) -> Result<Content, reqwest::Error> {
        let response = self.send(url).await?;

        if as_binary { Ok(Content::Binary(response.bytes().await?)) } else { Ok(Content::Text(response.text().await?)) }
    }

    async fn fetch(&self, url: &str, as_binary: bool) -> Option<Content> {
        let attempts = self.config.attempts();

        for attempt in 1..=attempts {
            match self.try_fetch(url, as_binary).await {
                Ok(content) => {
                    tokio::time::sleep(random_delay(self.config.courtesy_delay())).await;
                    return Some(content);
                },
                Err(e) => {
                    self.logger.error(format!("HTTP request failed: {e}. Retrying {attempt}/{attempts}").into());
                    if attempt < attempts {
                        tokio::time::sleep(random_delay(self.config.retry_backoff())).await;
                    }
                },
            }
        }

        self.logger.error(format!("Failed to retrieve data from {url} after {attempts} attempts.").into());
        None
    }
}

impl<L: ILogger + Send + Sync> Fetch for HttpFetcher<L> {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        match self.fetch(url, false).await? {
            Content::Text(text) => Some(text),
            Content::Binary(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Option<Bytes> {
        match self.fetch(url, true).await? {
            Content::Binary(bytes) => Some(bytes),
            Content::Text(text) => Some(Bytes::from(text)),
        }
    }
}
