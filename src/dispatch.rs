//! Reducer from stream events to session state
//!
//! [`Dispatcher::apply`] is deterministic: the caller supplies `now`, and
//! anything that needs timers or the network comes back as an [`Effect`]
//! for the stream client to carry out.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::agent::{AgentName, AgentStatus};
use crate::event::StreamEvent;
use crate::pr::extract_pr_draft;
use crate::session::{ConnectionStatus, SessionState};

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Restart the "next update in" countdown
    ArmCountdown,
    /// Close the stream; the run is over
    Disconnect,
}

/// Which high-frequency events also go to the log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub log_heartbeat: bool,
    pub log_progress: bool,
}

/// Applies events to a [`SessionState`]
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        Self { options }
    }

    /// Apply one event. Never fails; unknown events are ignored.
    pub fn apply(
        &self,
        state: &mut SessionState,
        event: StreamEvent,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        if matches!(event, StreamEvent::Unknown) {
            trace!("ignoring unknown event");
            return Vec::new();
        }

        if self.should_log(&event) {
            let body = serde_json::to_string(&event).unwrap_or_else(|_| event.kind().to_string());
            state.log.push(format!("{} {}", stamp(now), body));
        }

        state.last_update_at = Some(now);
        let mut effects = Vec::new();

        match event {
            StreamEvent::RouterUpdate {
                trace_id,
                message,
                targets,
                ..
            } => {
                state.status_line = message;
                if !trace_id.is_empty() {
                    state.trace_id = trace_id;
                }
                if let Some(targets) = targets {
                    let mut selected = Vec::with_capacity(targets.len());
                    for name in &targets {
                        match name.parse::<AgentName>() {
                            Ok(agent) => {
                                if let Some(view) = state.agents.get_mut(agent) {
                                    view.status = AgentStatus::Queued;
                                }
                                selected.push(agent);
                            }
                            Err(_) => debug!(agent = %name, "router target is not a known agent"),
                        }
                    }
                    state.selected_agents = Some(selected);
                }
            }

            StreamEvent::Heartbeat { .. } => {}

            StreamEvent::ProgressTick {
                elapsed_s,
                message,
                agents,
                ..
            } => {
                state.progress_pulse += 1;
                effects.push(Effect::ArmCountdown);
                state.status_line = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("Working… (elapsed {elapsed_s}s)"));

                for (name, progress) in agents {
                    match state.agents.get_by_name_mut(&name) {
                        Some(view) => {
                            view.status = progress.status;
                            if let Some(elapsed) = progress.elapsed_s {
                                view.live_elapsed_s = Some(elapsed);
                            }
                        }
                        None => debug!(agent = %name, "progress for unknown agent"),
                    }
                }
            }

            StreamEvent::AgentStart { agent, .. } => {
                state.status_line = format!("Running {}…", agent.label());
                if let Some(view) = state.agents.get_mut(agent) {
                    view.status = AgentStatus::Running;
                    view.started_at = Some(now);
                    view.finished_at = None;
                    view.error = None;
                }
            }

            StreamEvent::AgentDone {
                agent,
                summary,
                result,
                ..
            } => {
                state.status_line = format!("{} completed.", agent.label());
                if let Some(view) = state.agents.get_mut(agent) {
                    view.status = AgentStatus::Done;
                    view.summary = summary;
                    view.result = result;
                    view.finished_at = Some(now);
                    view.live_elapsed_s = None;
                }

                if let Some(draft) = extract_pr_draft(&state.agents) {
                    debug!(title = %draft.title, "PR draft detected");
                    state.pr_draft = Some(draft);
                }
            }

            StreamEvent::AgentError { agent, error, .. } => {
                state.status_line = format!("{} failed.", agent.label());
                if let Some(view) = state.agents.get_mut(agent) {
                    view.status = AgentStatus::Error;
                    view.error = Some(error);
                    view.finished_at = Some(now);
                    view.live_elapsed_s = None;
                }
            }

            StreamEvent::StreamDone { trace_id } => {
                if !trace_id.is_empty() {
                    state.trace_id = trace_id;
                }
                state.connection = ConnectionStatus::Done;
                state.status_line = "All agents finished".to_string();
                effects.push(Effect::Disconnect);
            }

            StreamEvent::Unknown => {}
        }

        effects
    }

    /// Record a frame that could not be decoded; state is otherwise untouched
    pub fn record_malformed(
        &self,
        state: &mut SessionState,
        raw: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        state
            .log
            .push(format!("{} Failed to parse frame: {reason} | raw={raw}", stamp(now)));
    }

    /// Record a diagnostic line
    pub fn record_diagnostic(&self, state: &mut SessionState, message: &str, now: DateTime<Utc>) {
        state.log.push(format!("{} {message}", stamp(now)));
    }

    fn should_log(&self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Heartbeat { .. } => self.options.log_heartbeat,
            StreamEvent::ProgressTick { .. } => self.options.log_progress,
            StreamEvent::Unknown => false,
            _ => true,
        }
    }
}

/// `[HH:MM:SS]` prefix for log lines
fn stamp(now: DateTime<Utc>) -> String {
    format!("[{}]", now.format("%H:%M:%S"))
}
