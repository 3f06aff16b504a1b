//! Session state for one orchestration run

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::agent::AgentName;
use crate::event_log::EventLog;
use crate::pr::PrDraft;
use crate::store::AgentStore;

/// Trace id shown before the backend assigns one
pub const UNSET_TRACE_ID: &str = "unset";

/// Lifecycle of the stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Done,
    Error,
}

impl ConnectionStatus {
    /// Connecting or connected
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Done => "done",
            ConnectionStatus::Error => "error",
        }
    }
}

/// Everything the dashboard renders, threaded through the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Correlation token from the backend
    pub trace_id: String,
    pub connection: ConnectionStatus,
    /// Human-readable status text
    pub status_line: String,
    /// Agents the router chose for this run
    pub selected_agents: Option<Vec<AgentName>>,
    pub last_update_at: Option<DateTime<Utc>>,
    /// Bumped on every progress tick
    pub progress_pulse: u64,
    /// Seconds until the next expected progress tick
    pub next_tick_in: u32,
    pub log: EventLog,
    pub agents: AgentStore,
    pub pr_draft: Option<PrDraft>,
    pub pr_status: String,
    pub creating_pr: bool,
}

impl SessionState {
    /// Fresh session with a log of the given capacity
    pub fn new(log_capacity: usize) -> Self {
        Self {
            trace_id: UNSET_TRACE_ID.to_string(),
            connection: ConnectionStatus::Disconnected,
            status_line: "Ready.".to_string(),
            selected_agents: None,
            last_update_at: None,
            progress_pulse: 0,
            next_tick_in: 0,
            log: EventLog::new(log_capacity),
            agents: AgentStore::new(),
            pr_draft: None,
            pr_status: String::new(),
            creating_pr: false,
        }
    }

    /// Back to initial values, keeping the configured log capacity
    pub fn reset(&mut self) {
        *self = Self::new(self.log.capacity());
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::event_log::DEFAULT_LOG_CAPACITY)
    }
}

/// Shared read access to the session for observers
///
/// Only the stream client writes; renderers take snapshots.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> SessionState {
        self.inner.read().clone()
    }

    /// Read a value without cloning the whole state
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.inner.read())
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.inner.write())
    }
}
