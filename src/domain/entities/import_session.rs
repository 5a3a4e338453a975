use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier of one streaming import: millisecond timestamp plus random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen();
        SessionId(format!("{:x}-{:08x}", millis, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared cancellation switch. Set once, polled at chunk boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that flipped the switch.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A row that did not make it into the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based position in the source.
    pub row: usize,
    pub id: String,
    pub error: String,
}

/// Cumulative counts for one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub success: usize,
    pub failed: usize,
    /// First failures only, capped by the engine.
    pub errors: Vec<RowFailure>,
    #[serde(skip)]
    pub fallbacks: usize,
    #[serde(skip)]
    pub chunks: usize,
}

impl ImportSummary {
    pub fn processed(&self) -> usize {
        self.success + self.failed
    }
}

/// Event pushed to the consumer of a streaming import.
///
/// Order is always `Session`, then one `Progress` per processed row with a
/// strictly increasing `processed`, then exactly one `Done` or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    Session {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    Progress {
        processed: usize,
        id: String,
        ok: bool,
    },
    Done {
        success: usize,
        failed: usize,
        errors: Vec<RowFailure>,
    },
    Cancelled {
        #[serde(rename = "rolledBack")]
        rolled_back: u64,
        /// Set when the rollback itself failed; tagged rows may remain.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ImportEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportEvent::Done { .. } | ImportEvent::Cancelled { .. })
    }
}
