// src/searchers/maps.rs - Maps-style business search over the custom
// search index.
use async_trait::async_trait;
use std::sync::Arc;

use super::{Channel, CseClient, LeadSource};
use crate::models::{Candidate, SearchHit};

pub struct GoogleMapsSource {
    client: Arc<CseClient>,
}

impl GoogleMapsSource {
    pub fn new(client: Arc<CseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LeadSource for GoogleMapsSource {
    fn name(&self) -> &str {
        "Google Maps"
    }

    fn channel(&self) -> Channel {
        Channel::GoogleMaps
    }

    fn build_query(&self, niche: &str, location: &str) -> String {
        if location.is_empty() {
            niche.to_string()
        } else {
            format!("{} in {}", niche, location)
        }
    }

    async fn search(&self, query: &str, max_results: usize, offset: usize) -> Vec<SearchHit> {
        self.client.search(query, max_results, offset).await
    }

    fn candidate_from_hit(&self, hit: &SearchHit) -> Option<Candidate> {
        let company_name = hit.title.trim();
        if company_name.is_empty() {
            return None;
        }

        Some(Candidate {
            company_name: company_name.to_string(),
            website: Some(hit.url.clone()),
            phone: hit.telephone.clone(),
            linkedin: None,
            source: self.name().to_string(),
        })
    }
}
