// src/store/mod.rs - External lead store boundary
use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::{Lead, Result};

pub mod sqlite;

pub use sqlite::SqliteLeadStore;

/// The system of record for accepted leads. The pipeline only ever needs
/// these three operations; schema management lives with the store.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist a lead. Returns `false` when the company was already on
    /// record and nothing was written.
    async fn add_lead(&self, lead: &Lead) -> Result<bool>;

    /// Every company name currently on record, used to seed the dedup
    /// ledger at run start.
    async fn get_all_company_names(&self) -> Result<Vec<String>>;

    /// Patch individual fields of an existing lead by company name.
    async fn update_lead_data(
        &self,
        company_name: &str,
        updates: HashMap<String, String>,
    ) -> Result<bool>;
}
