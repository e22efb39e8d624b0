// src/fetcher.rs - Bounded-concurrency page retrieval
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::config::FetcherConfig;
use crate::models::Result;

/// Retrieves one page body, or `None` on any failure. Fetch errors are a
/// normal part of a run and must never surface as run failures.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
            max_retries: config.max_retries,
        })
    }

    async fn fetch_once(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Could not fetch {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Fetch of {} returned HTTP {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => {
                debug!("Fetched {} bytes from {}", body.len(), url);
                Some(body)
            }
            Err(e) => {
                debug!("Could not read body of {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Fetch slots closed, skipping {}", url);
                return None;
            }
        };

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Short jittered pause so retries do not hammer a site that
                // just rejected us.
                let backoff = 250 * attempt as u64 + fastrand::u64(0..250);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            if let Some(body) = self.fetch_once(url).await {
                return Some(body);
            }
        }

        warn!("Giving up on {} after {} attempts", url, self.max_retries + 1);
        None
    }
}

/// Find a likely contact page linked from a page, resolved against the page
/// URL. Picks the first anchor whose text mentions "contact".
pub fn find_contact_page(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").ok()?;
    let base = Url::parse(base_url).ok()?;

    for element in document.select(&link_selector) {
        let text = element.text().collect::<String>().to_lowercase();
        if !text.contains("contact") {
            continue;
        }
        if let Some(href) = element.value().attr("href") {
            if href.starts_with("mailto:") || href.starts_with("tel:") {
                continue;
            }
            if let Ok(resolved) = base.join(href) {
                return Some(resolved.to_string());
            }
        }
    }

    None
}
