// src/store/sqlite.rs - SQLite-backed lead store
use async_trait::async_trait;
use chrono::Utc;
use mobc::{Manager, Pool};
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::LeadStore;
use crate::models::{Lead, Result};

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        debug!("Opening database: {}", self.db_path);
        let conn = Connection::open(&self.db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "memory")?;

        init_schema(&conn)?;
        Ok(conn)
    }

    async fn check(
        &self,
        conn: Self::Connection,
    ) -> std::result::Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

fn init_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            website TEXT,
            phone TEXT,
            email TEXT,
            linkedin TEXT,
            source TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_leads_company_name ON leads(company_name)",
        [],
    )?;
    Ok(())
}

pub type StorePool = Pool<SqliteManager>;

pub struct SqliteLeadStore {
    pool: StorePool,
}

impl SqliteLeadStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let manager = SqliteManager::new(db_path.to_string());
        let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

        // Fail fast on an unusable path instead of at first write.
        let conn = pool.get().await?;
        drop(conn);

        info!("Lead store ready at {}", db_path);
        Ok(Self { pool })
    }
}

/// Columns callers are allowed to patch through `update_lead_data`.
const UPDATABLE_COLUMNS: [&str; 6] = ["website", "phone", "email", "linkedin", "source", "verified"];

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn add_lead(&self, lead: &Lead) -> Result<bool> {
        let conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO leads
             (company_name, website, phone, email, linkedin, source, verified, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                lead.company_name,
                lead.website,
                lead.phone,
                lead.email,
                lead.linkedin,
                lead.source,
                lead.verified as i64,
                now,
            ],
        )?;

        if inserted == 0 {
            debug!("Lead '{}' already on record, skipped", lead.company_name);
        }
        Ok(inserted > 0)
    }

    async fn get_all_company_names(&self) -> Result<Vec<String>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare("SELECT company_name FROM leads ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(names)
    }

    async fn update_lead_data(
        &self,
        company_name: &str,
        updates: HashMap<String, String>,
    ) -> Result<bool> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (key, value) in updates {
            if UPDATABLE_COLUMNS.contains(&key.as_str()) {
                columns.push(key);
                values.push(value);
            } else {
                warn!("Ignoring non-updatable column '{}'", key);
            }
        }

        if columns.is_empty() {
            return Ok(false);
        }

        let set_clause = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE leads SET {}, last_updated = ?{} WHERE company_name = ?{} COLLATE NOCASE",
            set_clause,
            columns.len() + 1,
            columns.len() + 2,
        );

        values.push(Utc::now().to_rfc3339());
        values.push(company_name.to_string());

        let conn = self.pool.get().await?;
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> String {
        std::env::temp_dir()
            .join(format!("lead-finder-test-{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    fn lead(name: &str) -> Lead {
        Lead {
            company_name: name.to_string(),
            website: Some("https://acme.example".to_string()),
            phone: None,
            email: Some("jane@acme.example".to_string()),
            linkedin: None,
            source: "Google Maps".to_string(),
            verified: true,
        }
    }

    #[tokio::test]
    async fn add_then_list_roundtrip() {
        let store = SqliteLeadStore::open(&temp_db()).await.unwrap();

        assert!(store.add_lead(&lead("Acme Plumbing")).await.unwrap());
        assert!(store.add_lead(&lead("Miami Pipe Pros")).await.unwrap());

        let names = store.get_all_company_names().await.unwrap();
        assert_eq!(names, vec!["Acme Plumbing", "Miami Pipe Pros"]);
    }

    #[tokio::test]
    async fn duplicate_company_is_not_written_twice() {
        let store = SqliteLeadStore::open(&temp_db()).await.unwrap();

        assert!(store.add_lead(&lead("Acme Plumbing")).await.unwrap());
        assert!(!store.add_lead(&lead("acme plumbing")).await.unwrap());
        assert_eq!(store.get_all_company_names().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_patches_allowed_columns_only() {
        let store = SqliteLeadStore::open(&temp_db()).await.unwrap();
        store.add_lead(&lead("Acme Plumbing")).await.unwrap();

        let mut updates = HashMap::new();
        updates.insert("phone".to_string(), "+1 305 555 0100".to_string());
        updates.insert("company_name".to_string(), "Hijacked".to_string());
        assert!(store
            .update_lead_data("acme plumbing", updates)
            .await
            .unwrap());

        let names = store.get_all_company_names().await.unwrap();
        assert_eq!(names, vec!["Acme Plumbing"]);
    }

    #[tokio::test]
    async fn update_of_unknown_company_reports_false() {
        let store = SqliteLeadStore::open(&temp_db()).await.unwrap();
        let mut updates = HashMap::new();
        updates.insert("phone".to_string(), "+1 305 555 0100".to_string());
        assert!(!store.update_lead_data("Nobody", updates).await.unwrap());
    }
}
