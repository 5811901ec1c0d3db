//! Async Runtime Driver
//!
//! Runs a [`Companion`] inside one tokio task and maps wall-clock time onto
//! its timeline.
//!
//! # Event Loop
//!
//! ```text
//!                       ┌──────────────────────────────────────┐
//!   CompanionHandle ──► │ commands (mpsc)                      │
//!                       │ next timeline deadline (sleep_until) │──► Companion ──► RenderSink
//!                       │ reply futures (JoinSet)              │
//!                       │ idle nudge deadline (sleep_until)    │
//!                       └──────────────────────────────────────┘
//! ```
//!
//! Every wake-up first advances the companion's timeline to the elapsed time
//! since the runtime started, then handles whatever woke it, then hands due
//! reply futures to the `JoinSet` and flushes render intents to the sink.
//! The loop waits on deadlines and channels only; nothing polls.
//!
//! Reply futures run as separate tasks. A handler that panics is caught and
//! reported to the companion as a failed reply, like any other error.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use crate::bus::MessageBus;
use crate::config::CompanionConfig;
use crate::error::RuntimeClosed;
use crate::handler::ReplyId;
use crate::render::{Output, RenderSink};
use crate::timeline::millis;
use crate::Companion;

/// A closure run against the companion inside the runtime task
pub type CompanionCall = Box<dyn FnOnce(&mut Companion) + Send>;

/// Commands accepted by the runtime
pub enum RuntimeCommand {
    /// An inbound `{action, payload}` bus message
    Inbound(Value),
    /// Run a closure against the companion
    Call(CompanionCall),
    /// Stop once every timer and reply has finished
    Drain,
    /// Stop now
    Shutdown,
}

impl std::fmt::Debug for RuntimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound(value) => f.debug_tuple("Inbound").field(value).finish(),
            Self::Call(_) => f.write_str("Call"),
            Self::Drain => f.write_str("Drain"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Runtime tuning
#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    /// Command channel capacity
    pub command_capacity: usize,
    /// Whether idle nudges run
    pub idle_behavior: bool,
    /// Shortest pause between idle nudges
    pub idle_interval_min: Duration,
    /// Longest pause between idle nudges
    pub idle_interval_max: Duration,
}

impl RuntimeSettings {
    /// Settings matching a companion configuration
    #[must_use]
    pub fn from_config(config: &CompanionConfig) -> Self {
        Self {
            idle_behavior: config.idle_behavior,
            idle_interval_min: config.idle_interval_min,
            idle_interval_max: config.idle_interval_max,
            ..Self::default()
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            idle_behavior: false,
            idle_interval_min: Duration::from_secs(30),
            idle_interval_max: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable handle for talking to a running companion
#[derive(Clone, Debug)]
pub struct CompanionHandle {
    tx: mpsc::Sender<RuntimeCommand>,
}

impl CompanionHandle {
    /// Deliver an inbound bus message
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeClosed`] if the runtime has stopped.
    pub async fn send(&self, value: Value) -> Result<(), RuntimeClosed> {
        self.command(RuntimeCommand::Inbound(value)).await
    }

    /// Run `f` against the companion and return its result
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeClosed`] if the runtime has stopped.
    pub async fn with<R, F>(&self, f: F) -> Result<R, RuntimeClosed>
    where
        F: FnOnce(&mut Companion) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let call: CompanionCall = Box::new(move |companion| {
            let _ = reply_tx.send(f(companion));
        });
        self.command(RuntimeCommand::Call(call)).await?;
        reply_rx.await.map_err(|_| RuntimeClosed)
    }

    /// Ask the runtime to stop once it has nothing left to do
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeClosed`] if the runtime has stopped.
    pub async fn drain(&self) -> Result<(), RuntimeClosed> {
        self.command(RuntimeCommand::Drain).await
    }

    /// Ask the runtime to stop immediately
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeClosed`] if the runtime has stopped.
    pub async fn shutdown(&self) -> Result<(), RuntimeClosed> {
        self.command(RuntimeCommand::Shutdown).await
    }

    async fn command(&self, command: RuntimeCommand) -> Result<(), RuntimeClosed> {
        self.tx.send(command).await.map_err(|_| RuntimeClosed)
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Drives a companion from a tokio task
pub struct CompanionRuntime {
    companion: Companion,
    sink: Box<dyn RenderSink>,
    commands: mpsc::Receiver<RuntimeCommand>,
    replies: JoinSet<(ReplyId, anyhow::Result<String>)>,
    epoch: Instant,
    settings: RuntimeSettings,
    next_idle: Option<Instant>,
    rng: StdRng,
    draining: bool,
}

impl CompanionRuntime {
    /// Wrap `companion`, rendering into `sink`
    pub fn new<S>(
        companion: Companion,
        sink: S,
        settings: RuntimeSettings,
    ) -> (Self, CompanionHandle)
    where
        S: RenderSink + 'static,
    {
        let (tx, commands) = mpsc::channel(settings.command_capacity.max(1));
        let now = Instant::now();
        let elapsed = Duration::from_millis(companion.now_ms());
        let mut runtime = Self {
            epoch: now.checked_sub(elapsed).unwrap_or(now),
            companion,
            sink: Box::new(sink),
            commands,
            replies: JoinSet::new(),
            settings,
            next_idle: None,
            rng: StdRng::from_entropy(),
            draining: false,
        };
        runtime.schedule_idle();
        (runtime, CompanionHandle { tx })
    }

    /// Run on a new tokio task. The task yields the companion when it stops.
    pub fn spawn(self) -> JoinHandle<Companion> {
        tokio::spawn(self.run())
    }

    /// Run until shut down, drained, or every handle is dropped
    pub async fn run(mut self) -> Companion {
        tracing::debug!(companion = %self.companion.id(), "Companion runtime started");

        loop {
            self.sync_clock();
            self.spawn_replies();
            self.flush();

            if self.draining && self.companion.is_settled() && self.replies.is_empty() {
                tracing::debug!("Companion runtime drained");
                break;
            }

            let timer_at = self
                .companion
                .next_deadline()
                .map(|ms| self.epoch + Duration::from_millis(ms));
            let idle_at = if self.draining { None } else { self.next_idle };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(RuntimeCommand::Inbound(value)) => {
                        self.sync_clock();
                        MessageBus::handle(&mut self.companion, &value);
                    }
                    Some(RuntimeCommand::Call(call)) => {
                        self.sync_clock();
                        call(&mut self.companion);
                    }
                    Some(RuntimeCommand::Drain) => self.draining = true,
                    Some(RuntimeCommand::Shutdown) | None => break,
                },

                Some(joined) = self.replies.join_next(), if !self.replies.is_empty() => {
                    self.sync_clock();
                    match joined {
                        Ok((id, result)) => self.companion.complete_reply(id, result),
                        Err(err) => tracing::warn!(error = %err, "Reply task did not finish"),
                    }
                }

                () = sleep_until_some(timer_at) => {}

                () = sleep_until_some(idle_at) => {
                    self.sync_clock();
                    let action = self.companion.idle_nudge();
                    tracing::trace!(action = ?action, "Idle nudge");
                    self.schedule_idle();
                }
            }
        }

        self.flush();
        self.replies.abort_all();
        tracing::debug!(companion = %self.companion.id(), "Companion runtime stopped");
        self.companion
    }

    /// Advance the companion to the time elapsed since the epoch
    fn sync_clock(&mut self) {
        let elapsed = millis(self.epoch.elapsed());
        self.companion.advance_to(elapsed);
    }

    fn spawn_replies(&mut self) {
        for reply in self.companion.take_pending_replies() {
            let id = reply.id;
            self.replies.spawn(async move {
                let result = AssertUnwindSafe(reply.future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("message handler panicked")));
                (id, result)
            });
        }
    }

    fn flush(&mut self) {
        for output in self.companion.drain_output() {
            match output {
                Output::Intent(intent) => self.sink.apply(&intent),
                Output::Event(event) => self.sink.notify(&event),
            }
        }
    }

    fn schedule_idle(&mut self) {
        if !self.settings.idle_behavior {
            self.next_idle = None;
            return;
        }
        let min = millis(self.settings.idle_interval_min);
        let max = millis(self.settings.idle_interval_max).max(min);
        let wait = Duration::from_millis(self.rng.gen_range(min..=max));
        self.next_idle = Some(Instant::now() + wait);
    }
}

impl std::fmt::Debug for CompanionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionRuntime")
            .field("companion", &self.companion)
            .field("replies", &self.replies.len())
            .field("draining", &self.draining)
            .finish_non_exhaustive()
    }
}

/// Wait until `deadline`, or forever if there is none
async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
