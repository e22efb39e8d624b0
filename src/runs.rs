// src/runs.rs - Per-run state, progress events and the run registry
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::{Lead, RunParams};
use crate::orchestrator::RealtimeFinder;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const RECENT_LEADS_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Lead(Lead),
    Log(LogLine),
}

/// Progress publisher for one run. Fan-out goes through a broadcast channel
/// so a slow or dead subscriber can never stall the orchestrator; sending
/// never blocks and failures are ignored.
#[derive(Clone)]
pub struct RunEvents {
    tx: broadcast::Sender<RunEvent>,
}

impl RunEvents {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (tx, rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    pub fn lead(&self, lead: Lead) {
        let _ = self.tx.send(RunEvent::Lead(lead));
    }

    pub fn log(&self, message: impl Into<String>) {
        let _ = self.tx.send(RunEvent::Log(LogLine {
            timestamp: Utc::now(),
            message: message.into(),
        }));
    }
}

/// Everything the status endpoint can report about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub params: RunParams,
    pub status: RunStatus,
    pub leads: Vec<Lead>,
    pub error: Option<String>,
    pub logs: Vec<LogLine>,
    pub started_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}

/// One run's mutable state. The orchestrator never touches this directly;
/// a subscriber task folds the run's event stream into it.
pub struct RunHandle {
    record: Mutex<RunRecord>,
}

impl RunHandle {
    fn new(run_id: Uuid, params: RunParams) -> Self {
        Self {
            record: Mutex::new(RunRecord {
                run_id,
                params,
                status: RunStatus::Pending,
                leads: Vec::new(),
                error: None,
                logs: Vec::new(),
                started_at: Utc::now(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunRecord> {
        self.record.lock().expect("run record poisoned")
    }

    pub fn set_running(&self) {
        self.lock().status = RunStatus::Running;
    }

    pub fn push_lead(&self, lead: Lead) {
        self.lock().leads.push(lead);
    }

    pub fn push_log(&self, line: LogLine) {
        self.lock().logs.push(line);
    }

    /// Final success: the orchestrator's list replaces the streamed copy so
    /// the record matches the run result exactly.
    pub fn complete(&self, leads: Vec<Lead>) {
        let mut record = self.lock();
        record.leads = leads;
        record.status = RunStatus::Completed;
    }

    /// Failure keeps whatever the stream delivered before the error.
    pub fn fail(&self, error: String) {
        let mut record = self.lock();
        record.error = Some(error);
        record.status = RunStatus::Failed;
    }

    pub fn snapshot(&self) -> RunRecord {
        self.lock().clone()
    }
}

#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, Arc<RunHandle>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, run_id: &Uuid) -> Option<Arc<RunHandle>> {
        self.runs.read().await.get(run_id).cloned()
    }

    async fn insert(&self, run_id: Uuid, handle: Arc<RunHandle>) {
        self.runs.write().await.insert(run_id, handle);
    }
}

/// Start a discovery run in the background and return its id for polling.
/// An error escaping the orchestrator marks this run failed; it never
/// touches other runs or the process.
pub async fn spawn_run(
    registry: &RunRegistry,
    finder: Arc<RealtimeFinder>,
    params: RunParams,
) -> Uuid {
    let run_id = Uuid::new_v4();
    let (events, mut rx) = RunEvents::new();
    let handle = Arc::new(RunHandle::new(run_id, params.clone()));
    registry.insert(run_id, handle.clone()).await;

    // Status subscriber: ends when the runner drops the last sender.
    let stream_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(RunEvent::Lead(lead)) => stream_handle.push_lead(lead),
                Ok(RunEvent::Log(line)) => stream_handle.push_log(line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Run {} status stream lagged, {} events dropped", run_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        handle.set_running();
        match finder.run(&params, &events).await {
            Ok(leads) => handle.complete(leads),
            Err(e) => {
                error!("Run {} failed: {}", run_id, e);
                handle.fail(e.to_string());
            }
        }
    });

    run_id
}

/// Bounded ring buffer of the most recently accepted leads, shared across
/// runs.
pub struct RecentLeads {
    inner: Mutex<VecDeque<Lead>>,
    capacity: usize,
}

impl RecentLeads {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_LEADS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, lead: Lead) {
        let mut leads = self.inner.lock().expect("recent leads poisoned");
        if leads.len() == self.capacity {
            leads.pop_front();
        }
        leads.push_back(lead);
    }

    pub fn all(&self) -> Vec<Lead> {
        self.inner
            .lock()
            .expect("recent leads poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for RecentLeads {
    fn default() -> Self {
        Self::new()
    }
}
