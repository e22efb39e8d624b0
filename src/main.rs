// src/main.rs
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod extractor;
mod fetcher;
mod ledger;
mod models;
mod orchestrator;
mod runs;
mod searchers;
mod server;
mod store;
mod validator;

use config::{load_config, Config, Secrets};
use fetcher::HttpFetcher;
use models::Result;
use orchestrator::RealtimeFinder;
use runs::{RecentLeads, RunRegistry};
use searchers::{CseClient, GoogleMapsSource, LeadSource, LinkedinSource};
use server::ServerState;
use store::SqliteLeadStore;
use validator::AbstractApiVerifier;

#[rocket::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    std::env::set_var("RUST_LOG", "lead_finder=info,hyper=warn,reqwest=warn");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("lead_finder={}", config.logging.level)
                    .parse()
                    .unwrap(),
            ),
        )
        .init();

    let secrets = Secrets::from_env();

    info!("Initializing lead store...");
    let store = Arc::new(SqliteLeadStore::open(&config.database.path).await?);

    let cse = Arc::new(CseClient::new(&config.search, &secrets)?);
    let sources: Vec<Arc<dyn LeadSource>> = vec![
        Arc::new(GoogleMapsSource::new(cse.clone())),
        Arc::new(LinkedinSource::new(cse)),
    ];

    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let verifier = Arc::new(AbstractApiVerifier::new(
        secrets.email_verification_api_key.clone(),
    )?);
    let recent = Arc::new(RecentLeads::new());

    let finder = Arc::new(RealtimeFinder::new(
        &config.run,
        &config.search,
        sources,
        fetcher,
        verifier,
        store,
        recent.clone(),
    ));

    let state = ServerState {
        config,
        registry: RunRegistry::new(),
        recent,
        finder,
    };

    info!("Starting API server...");
    let _ = server::build_rocket(state).launch().await?;

    Ok(())
}
