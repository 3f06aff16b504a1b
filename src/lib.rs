//! # Agent Relay
//!
//! Client for a multi-agent orchestration backend.
//!
//! Opens a server-push stream for a goal, folds the stream's events into a
//! per-agent view of the run, and submits the pull-request draft an agent
//! may produce.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         STREAM CLIENT                            │
//! │  start / stop / reset / request_pr          handle(Signal)       │
//! └───────┬──────────────────────────────────────────▲───────────────┘
//!         │ spawn                                    │ Signal (run id / epoch)
//!         ▼                                          │
//!   ┌─────────────┐   ┌─────────────┐   ┌────────────┴──┐
//!   │   Reader    │   │   Ticker    │   │  PR submitter │
//!   │ (transport) │   │   (1 s)     │   │  (POST /api)  │
//!   └──────┬──────┘   └─────────────┘   └───────────────┘
//!          │ bytes → SseDecoder → frames
//!          ▼
//!   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//!   │ StreamEvent │ ─▶ │ Dispatcher  │ ─▶ │SessionState │ ─▶ widget cards
//!   └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Event**: one message from the backend (router update, tick, agent start/done/error, done)
//! - **Dispatcher**: deterministic reducer from events to session state, returning effects
//! - **Session**: everything the dashboard shows, shared read-only through a handle
//! - **Signal**: what background tasks report back to the client

pub mod agent;
pub mod channel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod event_log;
pub mod goal;
pub mod pr;
pub mod session;
pub mod sse;
pub mod store;
pub mod transport;
pub mod widget;

pub use agent::{AgentName, AgentStatus, AgentViewState, ALL_AGENTS};
pub use channel::Signal;
pub use client::{ClientOptions, StreamClient};
pub use config::RelayConfig;
pub use dispatch::{DispatchOptions, Dispatcher, Effect};
pub use error::RelayError;
pub use event::StreamEvent;
pub use event_log::EventLog;
pub use goal::ProjectForm;
pub use pr::{HttpPrClient, PrDraft, PrSubmitter};
pub use session::{ConnectionStatus, SessionHandle, SessionState};
pub use store::AgentStore;
pub use transport::{HttpTransport, StreamTransport};
pub use widget::{render_cards, AgentCard};
