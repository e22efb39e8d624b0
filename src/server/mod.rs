// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::orchestrator::RealtimeFinder;
use crate::runs::{RecentLeads, RunRegistry};
use rocket::{routes, Build, Rocket};
use std::sync::Arc;

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub registry: RunRegistry,
    pub recent: Arc<RecentLeads>,
    pub finder: Arc<RealtimeFinder>,
}

pub fn build_rocket(state: ServerState) -> Rocket<Build> {
    rocket::build().manage(state).mount(
        "/api",
        routes![
            routes::health::health_check,
            routes::health::index,
            start_realtime_leads,
            realtime_leads_status,
            get_recent_leads,
        ],
    )
}
