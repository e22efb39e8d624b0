// src/server/routes.rs
pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "lead-finder-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Lead Finder API",
            "version": "0.1.0",
            "description": "Real-time lead discovery and enrichment",
            "endpoints": {
                "health": "/api/health",
                "start_run": "/api/leads/realtime/start",
                "run_status": "/api/leads/realtime/status/<run_id>",
                "recent_leads": "/api/leads/recent"
            }
        }))
    }
}
