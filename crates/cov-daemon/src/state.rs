//! Shared runtime state for cov-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The delegation registry
//! and snapshot store are shared seams; the assertion book and audit writer
//! sit behind async locks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use cov_audit::AuditWriter;
use cov_config::{LoadedConfig, Settings};
use cov_delegation::{DelegationRegistry, DelegationStore, InMemoryDelegationStore};
use cov_hash::{InMemorySnapshotStore, SnapshotStore};
use cov_schemas::AssertionBook;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::warn;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    LogLine { level: String, msg: String },
}

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Source of "now". Swappable so tests can pin the date that delegation
/// decay and effectiveness are evaluated against.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub settings: Settings,
    /// Hash of the effective config, when loaded from YAML.
    pub config_hash: Option<String>,
    pub registry: Arc<DelegationRegistry>,
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Serializes compare + upsert per request so concurrent submissions
    /// of the same document never compare against a stale snapshot.
    pub hash_lock: Arc<Mutex<()>>,
    pub book: Arc<RwLock<AssertionBook>>,
    pub audit: Option<Arc<Mutex<AuditWriter>>>,
    clock: Clock,
}

impl AppState {
    /// State with default settings, no seed records and no audit trail.
    pub fn new() -> Self {
        let store: Arc<dyn DelegationStore> = Arc::new(InMemoryDelegationStore::new());
        let registry = DelegationRegistry::new(store, Settings::default().delegation.evidence_policy());
        Self::assemble(Settings::default(), None, registry, None)
    }

    /// State from validated settings: seeds the registry and opens (or
    /// resumes) the audit trail when `audit.path` is set.
    pub fn from_settings(settings: Settings, config_hash: Option<String>) -> Result<Self> {
        let store: Arc<dyn DelegationStore> = Arc::new(InMemoryDelegationStore::new());
        let registry = settings.delegation.build_registry(store)?;

        let audit = match settings.audit.path.as_deref() {
            Some(path) => {
                let writer = AuditWriter::resume(path, settings.audit.hash_chain)
                    .with_context(|| format!("open audit trail {path}"))?;
                Some(Arc::new(Mutex::new(writer)))
            }
            None => None,
        };

        Ok(Self::assemble(settings, config_hash, registry, audit))
    }

    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_settings(loaded.settings()?, Some(loaded.config_hash.clone()))
    }

    fn assemble(
        settings: Settings,
        config_hash: Option<String>,
        registry: DelegationRegistry,
        audit: Option<Arc<Mutex<AuditWriter>>>,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "cov-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            settings,
            config_hash,
            registry: Arc::new(registry),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
            hash_lock: Arc::new(Mutex::new(())),
            book: Arc::new(RwLock::new(AssertionBook::new())),
            audit,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn log(&self, level: &str, msg: impl Into<String>) {
        let _ = self.bus.send(BusMsg::LogLine {
            level: level.to_string(),
            msg: msg.into(),
        });
    }

    /// Append to the audit trail if one is configured and mirror the line on
    /// the SSE bus. A failed write is logged, never surfaced to the caller.
    pub async fn audit(&self, subject: &str, topic: &str, event_type: &str, payload: Value) {
        self.log("AUDIT", format!("{topic} {event_type} {subject}"));

        let Some(writer) = &self.audit else {
            return;
        };
        let mut w = writer.lock().await;
        if let Err(err) = w.append(subject, topic, event_type, payload) {
            warn!(subject, topic, event_type, error = %err, "audit append failed");
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
