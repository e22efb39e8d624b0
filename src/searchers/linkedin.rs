// src/searchers/linkedin.rs - Company-page search scoped to LinkedIn via
// the custom search index.
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

use super::{Channel, CseClient, LeadSource};
use crate::models::{Candidate, SearchHit};

pub struct LinkedinSource {
    client: Arc<CseClient>,
    phone_regex: Regex,
    website_regex: Regex,
}

impl LinkedinSource {
    pub fn new(client: Arc<CseClient>) -> Self {
        Self {
            client,
            phone_regex: Regex::new(r"(\+\d{1,2}\s?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
                .unwrap(),
            website_regex: Regex::new(r"https?://[^\s/$.?#].[^\s]*").unwrap(),
        }
    }
}

#[async_trait]
impl LeadSource for LinkedinSource {
    fn name(&self) -> &str {
        "LinkedIn"
    }

    fn channel(&self) -> Channel {
        Channel::Linkedin
    }

    fn build_query(&self, niche: &str, location: &str) -> String {
        if location.is_empty() {
            format!(r#"site:linkedin.com/company "{}""#, niche)
        } else {
            format!(r#"site:linkedin.com/company "{}" "{}""#, niche, location)
        }
    }

    async fn search(&self, query: &str, max_results: usize, offset: usize) -> Vec<SearchHit> {
        self.client.search(query, max_results, offset).await
    }

    fn candidate_from_hit(&self, hit: &SearchHit) -> Option<Candidate> {
        // LinkedIn page titles look like "Acme Corp | LinkedIn".
        let company_name = hit.title.split(" | ").next().unwrap_or("").trim();
        if company_name.is_empty() || hit.url.is_empty() {
            return None;
        }

        // The snippet sometimes carries a phone number or the company's own
        // site; mine both so a candidate can qualify without a page fetch.
        let phone = self
            .phone_regex
            .find(&hit.snippet)
            .map(|m| m.as_str().to_string());
        let website = self
            .website_regex
            .find(&hit.snippet)
            .map(|m| m.as_str().to_string());

        Some(Candidate {
            company_name: company_name.to_string(),
            website,
            phone,
            linkedin: Some(hit.url.clone()),
            source: self.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchConfig, Secrets};

    fn source() -> LinkedinSource {
        let client =
            CseClient::new(&SearchConfig {
                max_results_per_source: 10,
                endpoint: "http://127.0.0.1:1".to_string(),
                timeout_seconds: 1,
            }, &Secrets::default())
            .unwrap();
        LinkedinSource::new(Arc::new(client))
    }

    #[test]
    fn query_is_scoped_to_company_pages() {
        assert_eq!(
            source().build_query("plumber", "miami"),
            r#"site:linkedin.com/company "plumber" "miami""#
        );
    }

    #[test]
    fn company_name_is_title_before_separator() {
        let hit = SearchHit {
            title: "Acme Plumbing | LinkedIn".to_string(),
            url: "https://linkedin.com/company/acme-plumbing".to_string(),
            ..Default::default()
        };
        let cand = source().candidate_from_hit(&hit).unwrap();
        assert_eq!(cand.company_name, "Acme Plumbing");
        assert_eq!(
            cand.linkedin.as_deref(),
            Some("https://linkedin.com/company/acme-plumbing")
        );
    }

    #[test]
    fn snippet_is_mined_for_phone_and_website() {
        let hit = SearchHit {
            title: "Acme Plumbing | LinkedIn".to_string(),
            url: "https://linkedin.com/company/acme-plumbing".to_string(),
            snippet: "Call (305) 555-0100 or visit https://acmeplumbing.example for quotes"
                .to_string(),
            telephone: None,
        };
        let cand = source().candidate_from_hit(&hit).unwrap();
        assert_eq!(cand.phone.as_deref(), Some("(305) 555-0100"));
        assert_eq!(
            cand.website.as_deref(),
            Some("https://acmeplumbing.example")
        );
    }

    #[test]
    fn hit_without_title_is_discarded() {
        let hit = SearchHit {
            url: "https://linkedin.com/company/unknown".to_string(),
            ..Default::default()
        };
        assert!(source().candidate_from_hit(&hit).is_none());
    }
}
