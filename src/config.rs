use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub search: SearchConfig,
    pub fetcher: FetcherConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Results requested per source per round (the API caps this at 10).
    pub max_results_per_source: usize,
    pub endpoint: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    pub timeout_seconds: u64,
    pub max_concurrent_fetches: usize,
    pub max_retries: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    pub desired_count: usize,
    pub time_limit_seconds: u64,
    pub enrich_concurrency: usize,
    /// How many result pages to pull from each source before declaring it
    /// exhausted.
    pub max_search_rounds: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                max_results_per_source: 10,
                endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
                timeout_seconds: 15,
            },
            fetcher: FetcherConfig {
                timeout_seconds: 10,
                max_concurrent_fetches: 8,
                max_retries: 1,
                user_agent: "Mozilla/5.0 (compatible; LeadFinder/0.1)".to_string(),
            },
            run: RunConfig {
                desired_count: 10,
                time_limit_seconds: 600,
                enrich_concurrency: 4,
                max_search_rounds: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            database: DatabaseConfig {
                path: "data/leads.db".to_string(),
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Secrets come from the environment, not config.yml.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub google_api_key: Option<String>,
    pub custom_search_engine_id: Option<String>,
    pub email_verification_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            custom_search_engine_id: std::env::var("CUSTOM_SEARCH_ENGINE_ID").ok(),
            email_verification_api_key: std::env::var("EMAIL_VERIFICATION_API_KEY").ok(),
        }
    }
}
