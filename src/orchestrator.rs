// src/orchestrator.rs - Real-time lead discovery coordinator
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{RunConfig, SearchConfig};
use crate::extractor::ContactExtractor;
use crate::fetcher::{find_contact_page, PageFetcher};
use crate::ledger::DedupLedger;
use crate::models::{Candidate, Lead, Result, RunParams};
use crate::runs::{RecentLeads, RunEvents};
use crate::searchers::{resolve_channels, LeadSource};
use crate::store::LeadStore;
use crate::validator::{is_plausible_email, EmailVerifier};

/// Coordinates one discovery run: fans the query out across the selected
/// sources, pushes candidates through fetch -> extract -> verify, and stops
/// on the desired count, the time budget, or source exhaustion - whichever
/// comes first.
pub struct RealtimeFinder {
    sources: Vec<Arc<dyn LeadSource>>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContactExtractor,
    verifier: Arc<dyn EmailVerifier>,
    store: Arc<dyn LeadStore>,
    recent: Arc<RecentLeads>,
    enrich_concurrency: usize,
    max_results_per_source: usize,
    max_search_rounds: usize,
}

impl RealtimeFinder {
    pub fn new(
        run_config: &RunConfig,
        search_config: &SearchConfig,
        sources: Vec<Arc<dyn LeadSource>>,
        fetcher: Arc<dyn PageFetcher>,
        verifier: Arc<dyn EmailVerifier>,
        store: Arc<dyn LeadStore>,
        recent: Arc<RecentLeads>,
    ) -> Self {
        Self {
            sources,
            fetcher,
            extractor: ContactExtractor::new(),
            verifier,
            store,
            recent,
            enrich_concurrency: run_config.enrich_concurrency.max(1),
            max_results_per_source: search_config.max_results_per_source.max(1),
            max_search_rounds: run_config.max_search_rounds.max(1),
        }
    }

    pub async fn run(&self, params: &RunParams, events: &RunEvents) -> Result<Vec<Lead>> {
        let started = Instant::now();
        let time_limit = Duration::from_secs(params.time_limit_seconds);
        let desired = params.desired_count;
        let location = params.location.clone().unwrap_or_default();

        info!(
            "Starting real-time lead search: niche='{}', location='{}', channels={:?}, desired_count={}",
            params.niche, location, params.channels, desired
        );
        events.log(format!(
            "Real-time search started for niche='{}', location='{}', desired_count={}",
            params.niche, location, desired
        ));

        let channels = if params.channels.is_empty() {
            resolve_channels(&[])
        } else {
            params.channels.clone()
        };

        let selected: Vec<&Arc<dyn LeadSource>> = self
            .sources
            .iter()
            .filter(|source| channels.contains(&source.channel()))
            .collect();

        if selected.is_empty() {
            warn!("No searchers available for channels {:?}", channels);
            events.log("No searchers available for the requested channels");
            return Ok(Vec::new());
        }

        let ledger = DedupLedger::new();
        match self.store.get_all_company_names().await {
            Ok(names) => {
                debug!("Seeding dedup ledger with {} stored companies", names.len());
                ledger.seed(names);
            }
            Err(e) => warn!("Could not seed dedup ledger from store: {}", e),
        }

        let mut collected: Vec<Lead> = Vec::new();

        'rounds: for round in 0..self.max_search_rounds {
            if collected.len() >= desired {
                break;
            }
            let remaining = time_limit.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                events.log("Time budget exhausted");
                break;
            }

            let offset = round * self.max_results_per_source;
            let (candidates, hit_count) = self
                .search_round(selected.as_slice(), &params.niche, &location, offset, remaining)
                .await;

            // Claiming happens here, before any enrichment starts, so two
            // sources surfacing the same business in one batch cannot both
            // get enriched.
            let fresh: Vec<Candidate> = candidates
                .into_iter()
                .filter(|c| !c.company_name.trim().is_empty())
                .filter(|c| ledger.claim(&c.company_name))
                .collect();

            if fresh.is_empty() {
                // A page full of already-known businesses is not exhaustion;
                // the next round queries every source at a higher offset.
                if hit_count == 0 {
                    info!("Sources exhausted after round {}, stopping", round + 1);
                    events.log("Sources exhausted with no new candidates");
                    break;
                }
                debug!(
                    "Round {}: all {} hits already known, paging on",
                    round + 1,
                    hit_count
                );
                continue;
            }
            debug!("Round {}: {} fresh candidates", round + 1, fresh.len());

            let mut enriched = stream::iter(fresh)
                .map(|candidate| self.enrich(candidate))
                .buffer_unordered(self.enrich_concurrency);

            loop {
                let remaining = time_limit.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    events.log("Time budget exhausted");
                    break 'rounds;
                }

                let lead = match timeout(remaining, enriched.next()).await {
                    Ok(Some(Some(lead))) => lead,
                    Ok(Some(None)) => continue,
                    Ok(None) => break,
                    Err(_) => {
                        // In-flight enrichments are dropped, never half-kept.
                        events.log("Time budget exhausted");
                        break 'rounds;
                    }
                };

                collected.push(lead.clone());
                events.lead(lead.clone());
                events.log(format!(
                    "Found lead: {} (source: {})",
                    lead.company_name, lead.source
                ));
                self.recent.push(lead.clone());

                if let Err(e) = self.store.add_lead(&lead).await {
                    warn!("Failed to persist lead '{}': {}", lead.company_name, e);
                }

                if collected.len() >= desired {
                    break 'rounds;
                }
            }
        }

        info!("Found {} leads in total", collected.len());
        events.log(format!("Search completed with {} leads", collected.len()));
        Ok(collected)
    }

    /// One concurrent pass over the selected sources, returning the mapped
    /// candidates and the raw hit count so the caller can tell an empty
    /// page from a page of known businesses. Individual searchers already
    /// swallow their own failures; the budget cap here only guards against
    /// a source that stalls past the run deadline.
    async fn search_round(
        &self,
        selected: &[&Arc<dyn LeadSource>],
        niche: &str,
        location: &str,
        offset: usize,
        budget: Duration,
    ) -> (Vec<Candidate>, usize) {
        let searches = selected.iter().map(|source| {
            let query = source.build_query(niche, location);
            async move {
                let hits = match timeout(
                    budget,
                    source.search(&query, self.max_results_per_source, offset),
                )
                .await
                {
                    Ok(hits) => hits,
                    Err(_) => {
                        warn!("Source '{}' timed out, using partial batch", source.name());
                        Vec::new()
                    }
                };
                debug!("Source '{}' returned {} hits", source.name(), hits.len());
                let candidates: Vec<Candidate> = hits
                    .iter()
                    .filter_map(|hit| source.candidate_from_hit(hit))
                    .collect();
                (candidates, hits.len())
            }
        });

        join_all(searches).await.into_iter().fold(
            (Vec::new(), 0),
            |(mut candidates, hit_count), (batch, count)| {
                candidates.extend(batch);
                (candidates, hit_count + count)
            },
        )
    }

    /// Enrich one claimed candidate into a Lead, or `None` when no contact
    /// channel survives validation.
    async fn enrich(&self, candidate: Candidate) -> Option<Lead> {
        let mut lead = Lead {
            company_name: candidate.company_name,
            website: candidate.website,
            phone: candidate.phone,
            email: None,
            linkedin: candidate.linkedin,
            source: candidate.source,
            verified: false,
        };

        if let Some(website) = lead.website.clone() {
            if let Some(home_html) = self.fetcher.fetch(&website).await {
                let home = self.extractor.extract(&home_html, &website);
                if lead.linkedin.is_none() {
                    lead.linkedin = home.linkedin.clone();
                }
                if lead.phone.is_none() {
                    lead.phone = pick_deterministic(&home.phones);
                }

                // The contact page is the best email source; the homepage is
                // the fallback.
                let mut email = None;
                if let Some(contact_url) = find_contact_page(&home_html, &website) {
                    if let Some(contact_html) = self.fetcher.fetch(&contact_url).await {
                        let contact = self.extractor.extract(&contact_html, &contact_url);
                        email = first_plausible(&contact.emails);
                        if lead.phone.is_none() {
                            lead.phone = pick_deterministic(&contact.phones);
                        }
                        if lead.linkedin.is_none() {
                            lead.linkedin = contact.linkedin;
                        }
                    }
                }
                if email.is_none() {
                    email = first_plausible(&home.emails);
                }
                lead.email = email;
            }
        }

        if let Some(email) = lead.email.clone() {
            let outcome = self.verifier.verify(&email).await;
            if outcome.is_valid {
                lead.verified = true;
            } else {
                warn!(
                    "Email '{}' for '{}' discarded: {}",
                    email, lead.company_name, outcome.reason
                );
                lead.email = None;
            }
        }

        if lead.has_contact_channel() {
            Some(lead)
        } else {
            debug!("Candidate '{}' has no contact channel, dropped", lead.company_name);
            None
        }
    }
}

fn first_plausible(emails: &HashSet<String>) -> Option<String> {
    // Set iteration order is arbitrary; sort so reruns pick the same address.
    let mut plausible: Vec<&String> = emails
        .iter()
        .filter(|email| is_plausible_email(email))
        .collect();
    plausible.sort();
    plausible.first().map(|email| email.to_string())
}

fn pick_deterministic(values: &HashSet<String>) -> Option<String> {
    values.iter().min().cloned()
}
