// src/searchers/google.rs - Google Custom Search JSON API client shared by
// the source searchers.
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{SearchConfig, Secrets};
use crate::models::{Result, SearchHit};

pub struct CseClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    cse_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl CseClient {
    pub fn new(config: &SearchConfig, secrets: &Secrets) -> Result<Self> {
        if secrets.google_api_key.is_none() || secrets.custom_search_engine_id.is_none() {
            warn!("GOOGLE_API_KEY / CUSTOM_SEARCH_ENGINE_ID not set, searches will return nothing");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: secrets.google_api_key.clone(),
            cse_id: secrets.custom_search_engine_id.clone(),
        })
    }

    /// Query the custom search index. Failures of any kind are logged and
    /// produce an empty list; callers fan out over several sources and must
    /// never be blocked by one of them.
    pub async fn search(&self, query: &str, num: usize, offset: usize) -> Vec<SearchHit> {
        let (api_key, cse_id) = match (&self.api_key, &self.cse_id) {
            (Some(key), Some(id)) => (key, id),
            _ => return Vec::new(),
        };

        // The API rejects num outside 1..=10 and uses 1-based start indexes.
        let num = num.clamp(1, 10);
        let start = offset + 1;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", cse_id.as_str()),
                ("q", query),
                ("num", &num.to_string()),
                ("start", &start.to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                error!("Request error during search '{}': {}", query, e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            error!(
                "Search for '{}' returned HTTP {}",
                query,
                response.status()
            );
            return Vec::new();
        }

        let body: CseResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Malformed search payload for '{}': {}", query, e);
                return Vec::new();
            }
        };

        debug!("Search '{}' returned {} items", query, body.items.len());

        body.items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| {
                let telephone = item
                    .pagemap
                    .as_ref()
                    .and_then(|pm| pm.metatags.first())
                    .and_then(|tags| tags.get("telephone"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                SearchHit {
                    title: item.title,
                    url: item.link,
                    snippet: item.snippet,
                    telephone,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CseClient {
        let config = SearchConfig {
            max_results_per_source: 10,
            endpoint: server.uri(),
            timeout_seconds: 5,
        };
        let secrets = Secrets {
            google_api_key: Some("key".to_string()),
            custom_search_engine_id: Some("cse".to_string()),
            email_verification_api_key: None,
        };
        CseClient::new(&config, &secrets).unwrap()
    }

    #[tokio::test]
    async fn parses_items_and_pagemap_telephone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "plumber in miami"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "title": "Acme Plumbing",
                        "link": "https://acmeplumbing.example",
                        "snippet": "24/7 plumbing in Miami",
                        "pagemap": {"metatags": [{"telephone": "+1 305 555 0100"}]}
                    },
                    {
                        "title": "No link item",
                        "snippet": "dropped"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("plumber in miami", 10, 0).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Acme Plumbing");
        assert_eq!(hits[0].telephone.as_deref(), Some("+1 305 555 0100"));
    }

    #[tokio::test]
    async fn http_error_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("anything", 10, 0).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("anything", 10, 0).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let config = SearchConfig {
            max_results_per_source: 10,
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_seconds: 5,
        };
        let client = CseClient::new(&config, &Secrets::default()).unwrap();
        assert!(client.search("anything", 10, 0).await.is_empty());
    }
}
