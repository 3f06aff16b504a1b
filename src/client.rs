//! Stream client - owns the connection and drives the dispatcher
//!
//! Background tasks (stream reader, countdown ticker, PR submission) never
//! touch the session. They send [`Signal`]s back and the client applies them
//! one at a time in [`StreamClient::handle`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::channel::{signal_channel, Signal, SignalReceiver, SignalSender};
use crate::dispatch::{DispatchOptions, Dispatcher, Effect};
use crate::error::RelayError;
use crate::event::StreamEvent;
use crate::event_log::DEFAULT_LOG_CAPACITY;
use crate::pr::{extract_pr_draft, PrSubmitter};
use crate::session::{ConnectionStatus, SessionHandle, SessionState};
use crate::sse::SseItem;
use crate::transport::StreamTransport;

/// Seconds the "next update in" countdown restarts from
pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;

/// Shown when a PR is requested but no agent produced a draft
pub const MISSING_DRAFT_MESSAGE: &str =
    "Could not find { ok: true, pr: { title, body } } in agent results.";

/// Client tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub dispatch: DispatchOptions,
    pub log_capacity: usize,
    pub countdown_secs: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            dispatch: DispatchOptions::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }
}

/// Controller for one dashboard session
///
/// At most one stream is live at a time. Every connection gets a fresh run
/// id and signals carrying any other id are dropped.
pub struct StreamClient {
    transport: Arc<dyn StreamTransport>,
    submitter: Arc<dyn PrSubmitter>,
    dispatcher: Dispatcher,
    session: SessionHandle,
    tx: SignalSender,
    rx: SignalReceiver,
    /// Run id of the live connection
    active_run: Option<Uuid>,
    /// Changes on start/reset; PR outcomes from older epochs are dropped
    epoch: Uuid,
    reader: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    countdown_secs: u32,
}

impl StreamClient {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        submitter: Arc<dyn PrSubmitter>,
        options: ClientOptions,
    ) -> Self {
        let (tx, rx) = signal_channel();
        Self {
            transport,
            submitter,
            dispatcher: Dispatcher::new(options.dispatch),
            session: SessionHandle::new(SessionState::new(options.log_capacity)),
            tx,
            rx,
            active_run: None,
            epoch: Uuid::new_v4(),
            reader: None,
            ticker: None,
            countdown_secs: options.countdown_secs,
        }
    }

    /// Handle for observers
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Run id of the live connection, if any
    pub fn active_run(&self) -> Option<Uuid> {
        self.active_run
    }

    /// No live stream and no PR request in flight
    pub fn is_settled(&self) -> bool {
        self.active_run.is_none() && !self.session.read(|s| s.creating_pr)
    }

    /// Open a stream for `goal`, replacing any current one
    #[instrument(skip(self, goal), fields(goal_len = goal.len()))]
    pub fn start(&mut self, goal: &str) -> Uuid {
        self.stop();

        let run = Uuid::new_v4();
        self.active_run = Some(run);
        self.epoch = Uuid::new_v4();

        self.session.write(|state| {
            state.reset();
            state.connection = ConnectionStatus::Connecting;
            state.status_line = "Connecting…".to_string();
        });

        info!(run = %run, "Starting stream");

        let reader = read_stream(self.transport.clone(), goal.to_string(), run, self.tx.clone());
        self.reader = Some(tokio::spawn(reader));
        run
    }

    /// Close the stream and cancel the ticker. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(run) = self.active_run.take() {
            debug!(run = %run, "Stream stopped");
        }

        self.session.write(|state| {
            if state.connection.is_live() {
                state.connection = ConnectionStatus::Disconnected;
            }
        });
    }

    /// Stop and return to a pristine session
    pub fn reset(&mut self) {
        self.stop();
        self.epoch = Uuid::new_v4();
        self.session.write(SessionState::reset);
        info!("Session reset");
    }

    /// Submit the current PR draft in the background
    ///
    /// Returns false when nothing was sent: no draft, or a request already
    /// in flight.
    pub fn request_pr(&mut self) -> bool {
        let draft = self.session.write(|state| {
            if state.creating_pr {
                return None;
            }
            state.pr_status.clear();

            let draft = state
                .pr_draft
                .clone()
                .or_else(|| extract_pr_draft(&state.agents));
            match draft {
                Some(draft) => {
                    state.pr_draft = Some(draft.clone());
                    state.creating_pr = true;
                    Some(draft)
                }
                None => {
                    state.pr_status = MISSING_DRAFT_MESSAGE.to_string();
                    None
                }
            }
        });

        let Some(draft) = draft else {
            return false;
        };

        let request = draft.to_request();
        let submitter = self.submitter.clone();
        let tx = self.tx.clone();
        let epoch = self.epoch;

        info!(title = %request.title, "Submitting PR");
        tokio::spawn(async move {
            let outcome = submitter.submit(&request).await.map_err(|e| e.to_string());
            if tx.send(Signal::PrOutcome { epoch, outcome }).is_err() {
                debug!("Client gone before PR outcome");
            }
        });
        true
    }

    /// Wait for the next background signal
    pub async fn next_signal(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Handle signals until the stream ends and any PR request completes
    pub async fn run_until_settled(&mut self) {
        while !self.is_settled() {
            match self.rx.recv().await {
                Some(signal) => self.handle(signal),
                None => break,
            }
        }
    }

    /// Apply one signal to the session
    pub fn handle(&mut self, signal: Signal) {
        if let Some(run) = signal.run() {
            if self.active_run != Some(run) {
                trace!(run = %run, "Dropping signal from stale run");
                return;
            }
        }

        let now = Utc::now();
        match signal {
            Signal::Opened { run } => {
                info!(run = %run, "Stream connected");
                let countdown = self.countdown_secs;
                self.session.write(|state| {
                    state.connection = ConnectionStatus::Connected;
                    state.status_line = "Connected. Routing…".to_string();
                    state.next_tick_in = countdown;
                });
                self.spawn_ticker(run);
            }

            Signal::Frame { item, .. } => match item {
                SseItem::Frame(data) => match StreamEvent::decode(&data) {
                    Ok(event) => {
                        trace!(
                            kind = event.kind(),
                            trace_id = event.trace_id().unwrap_or_default(),
                            "Event received"
                        );
                        let effects = self
                            .session
                            .write(|state| self.dispatcher.apply(state, event, now));
                        for effect in effects {
                            self.execute(effect);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Malformed frame");
                        self.session.write(|state| {
                            self.dispatcher
                                .record_malformed(state, &data, &e.to_string(), now)
                        });
                    }
                },
                SseItem::Rejected(reason) => {
                    warn!(reason = %reason, "Frame rejected by decoder");
                    let error = RelayError::Frame(reason);
                    self.session.write(|state| {
                        self.dispatcher
                            .record_malformed(state, "<dropped>", &error.to_string(), now)
                    });
                }
            },

            Signal::Failed { reason, .. } => self.fail(&reason),

            Signal::Closed { .. } => {
                let error = RelayError::Transport("stream closed before done".to_string());
                self.fail(&error.to_string());
            }

            Signal::Tick { .. } => self.session.write(|state| {
                state.next_tick_in = state.next_tick_in.saturating_sub(1);
            }),

            Signal::PrOutcome { epoch, outcome } => {
                if epoch != self.epoch {
                    debug!("Dropping PR outcome from a previous session");
                    return;
                }
                let status = match outcome {
                    Ok(receipt) => receipt.status_line(),
                    Err(message) => {
                        warn!(error = %message, "PR submission failed");
                        format!("PR failed: {message}")
                    }
                };
                self.session.write(|state| {
                    state.creating_pr = false;
                    state.pr_status = status;
                });
            }
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ArmCountdown => {
                let countdown = self.countdown_secs;
                self.session.write(|state| state.next_tick_in = countdown);
            }
            Effect::Disconnect => {
                info!("Stream finished");
                self.stop();
            }
        }
    }

    fn fail(&mut self, reason: &str) {
        warn!(reason = %reason, "Stream error");
        let now = Utc::now();
        self.session.write(|state| {
            state.connection = ConnectionStatus::Error;
            state.status_line = "stream error".to_string();
            self.dispatcher
                .record_diagnostic(state, &format!("Stream error: {reason}"), now);
        });
        self.stop();
    }

    fn spawn_ticker(&mut self, run: Uuid) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        let tx = self.tx.clone();
        self.ticker = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(Signal::Tick { run }).is_err() {
                    break;
                }
            }
        }));
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Reader task: connect, forward every decoder item, report how it ended
async fn read_stream(
    transport: Arc<dyn StreamTransport>,
    goal: String,
    run: Uuid,
    tx: SignalSender,
) {
    if let Err(e) = forward_stream(transport.as_ref(), &goal, run, &tx).await {
        debug!(run = %run, error = %e, "Reader stopped");
    }
}

async fn forward_stream(
    transport: &dyn StreamTransport,
    goal: &str,
    run: Uuid,
    tx: &SignalSender,
) -> Result<(), RelayError> {
    let mut frames = match transport.connect(goal).await {
        Ok(frames) => frames,
        Err(e) => {
            tx.send(Signal::Failed { run, reason: e.to_string() })?;
            return Ok(());
        }
    };
    tx.send(Signal::Opened { run })?;

    while let Some(item) = frames.next().await {
        match item {
            Ok(item) => tx.send(Signal::Frame { run, item })?,
            Err(e) => {
                tx.send(Signal::Failed { run, reason: e.to_string() })?;
                return Ok(());
            }
        }
    }

    tx.send(Signal::Closed { run })?;
    Ok(())
}
