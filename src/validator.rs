// src/validator.rs - Email plausibility and external verification
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::Result;

/// Role addresses are reachable but never answered by a person; they are
/// worthless as sales leads.
const GENERIC_PREFIXES: [&str; 12] = [
    "info", "contact", "support", "admin", "hello", "sales", "team", "office", "mail", "no-reply",
    "noreply", "donotreply",
];

/// Cheap local check: `local@domain.tld` shape and a non-generic local part.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.contains(char::is_whitespace) {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs an interior dot with something on both sides.
    let (host, tld) = match domain.rsplit_once('.') {
        Some(parts) => parts,
        None => return false,
    };
    if host.is_empty() || tld.len() < 2 {
        return false;
    }

    let local_lower = local.to_lowercase();
    !GENERIC_PREFIXES.contains(&local_lower.as_str())
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub is_valid: bool,
    pub reason: String,
}

impl Verification {
    pub fn unverified(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Deliverability check against an external service. Implementations are
/// best-effort: any failure reports "unverified", never an error.
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    async fn verify(&self, email: &str) -> Verification;
}

/// AbstractAPI email validation client.
pub struct AbstractApiVerifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AbstractResponse {
    deliverability: Option<String>,
    is_valid_format: Option<BoolField>,
    is_smtp_valid: Option<BoolField>,
    is_disposable_email: Option<BoolField>,
    #[serde(alias = "is_catchall")]
    is_catchall_email: Option<BoolField>,
}

// The API wraps booleans as {"value": true, "text": "TRUE"}.
#[derive(Debug, Deserialize)]
struct BoolField {
    value: Option<bool>,
}

impl BoolField {
    fn truthy(field: &Option<BoolField>) -> bool {
        field
            .as_ref()
            .and_then(|f| f.value)
            .unwrap_or(false)
    }
}

const ABSTRACT_ENDPOINT: &str = "https://emailvalidation.abstractapi.com/v1/";

impl AbstractApiVerifier {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_endpoint(api_key, ABSTRACT_ENDPOINT.to_string())
    }

    pub fn with_endpoint(api_key: Option<String>, endpoint: String) -> Result<Self> {
        if api_key.is_none() {
            warn!("EMAIL_VERIFICATION_API_KEY is not set, emails will be treated as unverified");
        }

        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl EmailVerifier for AbstractApiVerifier {
    async fn verify(&self, email: &str) -> Verification {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => return Verification::unverified("verification API key not configured"),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", api_key.as_str()), ("email", email)])
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                error!("Verification request for {} failed: {}", email, e);
                return Verification::unverified("verification service unreachable");
            }
        };

        if !response.status().is_success() {
            error!(
                "Verification of {} returned HTTP {}",
                email,
                response.status()
            );
            return Verification::unverified("verification service error");
        }

        let body: AbstractResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Malformed verification payload for {}: {}", email, e);
                return Verification::unverified("malformed verification response");
            }
        };

        if !BoolField::truthy(&body.is_valid_format) {
            return Verification::unverified("invalid format");
        }
        if BoolField::truthy(&body.is_disposable_email) {
            return Verification::unverified("disposable address");
        }
        // A catch-all domain accepts any recipient, so a positive SMTP
        // check proves nothing about this address.
        if BoolField::truthy(&body.is_catchall_email) {
            return Verification::unverified("catch-all domain");
        }

        let deliverable = body.deliverability.as_deref() == Some("DELIVERABLE");
        let smtp_valid = BoolField::truthy(&body.is_smtp_valid);
        if deliverable && smtp_valid {
            info!("Verified {} as deliverable", email);
            Verification {
                is_valid: true,
                reason: "deliverable".to_string(),
            }
        } else {
            Verification::unverified(format!(
                "deliverability={}",
                body.deliverability.as_deref().unwrap_or("UNKNOWN")
            ))
        }
    }
}
