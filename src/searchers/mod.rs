// src/searchers/mod.rs - Source searcher trait and channel selection
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Candidate, SearchHit};

pub mod google;
pub mod linkedin;
pub mod maps;

pub use google::CseClient;
pub use linkedin::LinkedinSource;
pub use maps::GoogleMapsSource;

/// A source of candidate leads. Split into query building, searching and
/// result mapping so each step can be exercised on its own.
///
/// `search` never fails: transport errors, non-2xx responses and malformed
/// payloads are logged and yield an empty list so one broken source can
/// never take down a whole fan-out batch.
#[async_trait]
pub trait LeadSource: Send + Sync {
    fn name(&self) -> &str;

    fn channel(&self) -> Channel;

    /// Channel-specific query for a niche/location pair.
    fn build_query(&self, niche: &str, location: &str) -> String;

    /// `offset` is the 0-based index of the first result wanted, used to
    /// page through a source across rounds.
    async fn search(&self, query: &str, max_results: usize, offset: usize) -> Vec<SearchHit>;

    /// Map one hit to a candidate business, or `None` when the hit carries
    /// too little to identify one.
    fn candidate_from_hit(&self, hit: &SearchHit) -> Option<Candidate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    GoogleMaps,
    Linkedin,
}

/// Resolve caller-supplied channel names to sources. Two vocabularies are
/// accepted: source names (`google_maps`, `linkedin`) and outreach modes
/// (`email`, `whatsapp`, `phone`). Unknown names are ignored; an empty or
/// fully unrecognized set falls back to all sources.
pub fn resolve_channels(raw: &[String]) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut push = |c: Channel, channels: &mut Vec<Channel>| {
        if !channels.contains(&c) {
            channels.push(c);
        }
    };

    for name in raw {
        match name.trim().to_lowercase().as_str() {
            "google_maps" | "maps" => push(Channel::GoogleMaps, &mut channels),
            "linkedin" => push(Channel::Linkedin, &mut channels),
            // Outreach-mode vocabulary: phone numbers come from the maps
            // index, emails can come from anywhere.
            "phone" => push(Channel::GoogleMaps, &mut channels),
            "email" | "whatsapp" => {
                push(Channel::GoogleMaps, &mut channels);
                push(Channel::Linkedin, &mut channels);
            }
            "" => {}
            other => warn!("Ignoring unrecognized channel '{}'", other),
        }
    }

    if channels.is_empty() {
        channels = vec![Channel::GoogleMaps, Channel::Linkedin];
    }
    channels
}
