use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::searchers::Channel;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A qualified business contact. Only ever emitted with at least one of
/// `email`, `phone` or `linkedin` populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub company_name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub source: String,
    pub verified: bool,
}

impl Lead {
    pub fn has_contact_channel(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.linkedin.is_some()
    }

    /// Dedup key: lowercase, trimmed company name.
    pub fn normalized_name(&self) -> String {
        self.company_name.trim().to_lowercase()
    }
}

/// One search result from a source searcher, in the source's relevance order.
#[derive(Debug, Clone, Default)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Phone number surfaced by the search index itself (page metadata),
    /// available before any page fetch.
    pub telephone: Option<String>,
}

/// A business surfaced by a searcher, not yet enriched or validated.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub company_name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub source: String,
}

/// Raw contact data pulled out of a single page. Consumed by the validator
/// and discarded.
#[derive(Debug, Clone, Default)]
pub struct ContactRecord {
    pub emails: HashSet<String>,
    pub phones: HashSet<String>,
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
}

impl ContactRecord {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
            && self.phones.is_empty()
            && self.business_name.is_none()
            && self.address.is_none()
            && self.linkedin.is_none()
            && self.twitter.is_none()
            && self.facebook.is_none()
    }
}

/// Parameters for one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub niche: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_desired_count")]
    pub desired_count: usize,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: u64,
}

pub fn default_desired_count() -> usize {
    10
}

pub fn default_time_limit_seconds() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_lead() -> Lead {
        Lead {
            company_name: "Acme Plumbing".to_string(),
            website: None,
            phone: None,
            email: None,
            linkedin: None,
            source: "Google Maps".to_string(),
            verified: false,
        }
    }

    #[test]
    fn lead_without_any_channel_is_not_contactable() {
        assert!(!bare_lead().has_contact_channel());
    }

    #[test]
    fn any_single_channel_makes_lead_contactable() {
        let mut lead = bare_lead();
        lead.phone = Some("+1 305 555 0100".to_string());
        assert!(lead.has_contact_channel());

        let mut lead = bare_lead();
        lead.linkedin = Some("https://linkedin.com/company/acme".to_string());
        assert!(lead.has_contact_channel());
    }

    #[test]
    fn normalized_name_is_lowercase_and_trimmed() {
        let mut lead = bare_lead();
        lead.company_name = "  Acme PLUMBING ".to_string();
        assert_eq!(lead.normalized_name(), "acme plumbing");
    }
}
