// src/api/leads.rs - Real-time lead discovery control endpoints
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::ApiResponse;
use crate::models::{Lead, RunParams};
use crate::runs::{spawn_run, LogLine, RunStatus};
use crate::searchers::resolve_channels;
use crate::server::ServerState;

/// Logs included in a status response, newest last.
const STATUS_LOG_TAIL: usize = 50;

#[derive(Deserialize)]
pub struct StartRequest {
    /// Also accepted as `target_audience`.
    #[serde(alias = "target_audience")]
    pub niche: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Also accepted as `count`.
    #[serde(default, alias = "count")]
    pub desired_count: Option<usize>,
    /// Also accepted as `channels`.
    #[serde(default, alias = "channels")]
    pub preferred_channels: Vec<String>,
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
}

#[derive(Serialize)]
pub struct StartedRun {
    pub run_id: Uuid,
}

#[derive(Serialize)]
pub struct RunResults {
    pub leads: Vec<Lead>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct RunStatusResponse {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub parameters: RunParams,
    pub results: RunResults,
    pub logs: Vec<LogLine>,
    pub elapsed_seconds: i64,
}

#[derive(Serialize)]
pub struct RecentLeadsResponse {
    pub leads: Vec<Lead>,
    pub count: usize,
}

/// Start a discovery run in the background; poll its status by the
/// returned id.
#[post("/leads/realtime/start", format = "json", data = "<request>")]
pub async fn start_realtime_leads(
    state: &State<ServerState>,
    request: Json<StartRequest>,
) -> Json<ApiResponse<StartedRun>> {
    let request = request.into_inner();

    let niche = match request.niche.filter(|n| !n.trim().is_empty()) {
        Some(niche) => niche,
        None => return Json(ApiResponse::error("Missing 'niche'".to_string())),
    };

    let params = RunParams {
        niche,
        location: request.location,
        desired_count: request
            .desired_count
            .unwrap_or(state.config.run.desired_count),
        channels: resolve_channels(&request.preferred_channels),
        time_limit_seconds: request
            .time_limit_seconds
            .unwrap_or(state.config.run.time_limit_seconds),
    };

    let run_id = spawn_run(&state.registry, state.finder.clone(), params).await;
    info!("Started real-time lead run {}", run_id);

    Json(ApiResponse::success(StartedRun { run_id }))
}

/// Best-known state of a run: partial results while running, the final
/// list once completed, and the error string when failed.
#[get("/leads/realtime/status/<run_id>")]
pub async fn realtime_leads_status(
    state: &State<ServerState>,
    run_id: Uuid,
) -> Json<ApiResponse<RunStatusResponse>> {
    let handle = match state.registry.get(&run_id).await {
        Some(handle) => handle,
        None => return Json(ApiResponse::error("run_id not found".to_string())),
    };

    let snapshot = handle.snapshot();
    let elapsed_seconds = snapshot.elapsed_seconds();
    let tail_start = snapshot.logs.len().saturating_sub(STATUS_LOG_TAIL);

    Json(ApiResponse::success(RunStatusResponse {
        run_id,
        status: snapshot.status,
        parameters: snapshot.params,
        results: RunResults {
            count: snapshot.leads.len(),
            leads: snapshot.leads,
        },
        logs: snapshot.logs[tail_start..].to_vec(),
        elapsed_seconds,
    }))
}

#[get("/leads/recent")]
pub async fn get_recent_leads(state: &State<ServerState>) -> Json<ApiResponse<RecentLeadsResponse>> {
    let leads = state.recent.all();
    Json(ApiResponse::success(RecentLeadsResponse {
        count: leads.len(),
        leads,
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::fetcher::HttpFetcher;
    use crate::orchestrator::RealtimeFinder;
    use crate::runs::{RecentLeads, RunRegistry};
    use crate::server::{build_rocket, ServerState};
    use crate::store::SqliteLeadStore;
    use crate::validator::AbstractApiVerifier;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    // No sources configured: runs start, find nothing and complete, which
    // is all the HTTP contract needs.
    async fn client() -> Client {
        let config = Config::default();
        let db_path = std::env::temp_dir()
            .join(format!("lead-finder-api-{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        let store = Arc::new(SqliteLeadStore::open(&db_path).await.unwrap());
        let fetcher = Arc::new(HttpFetcher::new(&config.fetcher).unwrap());
        let verifier = Arc::new(AbstractApiVerifier::new(None).unwrap());
        let recent = Arc::new(RecentLeads::new());
        let finder = Arc::new(RealtimeFinder::new(
            &config.run,
            &config.search,
            Vec::new(),
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
        Client::tracked(build_rocket(state)).await.unwrap()
    }

    async fn body_json(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn start_without_niche_returns_error_envelope() {
        let client = client().await;
        let response = client
            .post("/api/leads/realtime/start")
            .header(ContentType::JSON)
            .body(r#"{"location": "miami"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("niche"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn start_then_status_reports_a_completed_run() {
        let client = client().await;
        // The alternate field names must be accepted.
        let response = client
            .post("/api/leads/realtime/start")
            .header(ContentType::JSON)
            .body(r#"{"target_audience": "plumber", "location": "miami", "count": 2, "channels": ["email"]}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let run_id = body["data"]["run_id"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..100 {
            let response = client
                .get(format!("/api/leads/realtime/status/{}", run_id))
                .dispatch()
                .await;
            status = body_json(response).await;
            let state = status["data"]["status"].as_str().unwrap_or_default().to_string();
            if state == "completed" || state == "failed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // The log stream is folded in by a separate task; give it one more
        // tick before reading the final record.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let response = client
            .get(format!("/api/leads/realtime/status/{}", run_id))
            .dispatch()
            .await;
        status = body_json(response).await;

        assert_eq!(status["success"], true);
        let data = &status["data"];
        assert_eq!(data["status"], "completed");
        assert_eq!(data["results"]["count"], 0);
        assert!(data["results"]["leads"].as_array().unwrap().is_empty());
        assert!(data["logs"].as_array().unwrap().len() > 0);
        assert!(data["elapsed_seconds"].as_i64().unwrap() >= 0);
        assert_eq!(data["parameters"]["niche"], "plumber");
    }

    #[tokio::test]
    async fn status_for_unknown_run_id_is_an_error_envelope() {
        let client = client().await;
        let response = client
            .get(format!("/api/leads/realtime/status/{}", uuid::Uuid::new_v4()))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("run_id"));
    }

    #[tokio::test]
    async fn recent_leads_endpoint_returns_the_ring_buffer() {
        let client = client().await;
        let response = client.get("/api/leads/recent").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["count"], 0);
        assert!(body["data"]["leads"].as_array().unwrap().is_empty());
    }
}
