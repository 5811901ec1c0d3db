//! Companion Context
//!
//! [`Companion`] is one complete, independent companion: it owns the mood
//! controller, typing scheduler, conversation, observer list and timeline,
//! and exposes the programmatic API hosts call.
//!
//! # Driving a Companion
//!
//! The companion never reads a clock. Time moves when the owner calls
//! [`Companion::advance`] (tests) or when [`CompanionRuntime`] maps wall
//! clock time onto it. Reply handlers are never polled here either: when a
//! reply is due the companion queues a [`PendingReply`], the driver polls it
//! and hands the outcome back through [`Companion::complete_reply`].
//!
//! ```text
//!              calls / bus requests
//!   host ────────────────────────────► Companion ──► drain_intents() ──► RenderSink
//!                                         │  ▲
//!                 take_pending_replies()  │  │  complete_reply(id, result)
//!                                         ▼  │
//!                                       driver (tests, CompanionRuntime)
//! ```
//!
//! [`CompanionRuntime`]: crate::runtime::CompanionRuntime

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityShortcut;
use crate::config::CompanionConfig;
use crate::controller::{CompanionState, MoodController};
use crate::conversation::{Conversation, Message};
use crate::error::UnknownMoodError;
use crate::events::{CompanionEvent, EventKind, SubscriptionToken};
use crate::handler::{MessageHandler, PendingReply, ReplyId};
use crate::mood::{Mood, MoodMeta, MoodRegistry};
use crate::render::{Outbox, Output, RenderIntent};
use crate::timeline::{millis, Timeline};
use crate::typing::{PendingCommit, SessionId, TypingScheduler, TypingState, TypingTick};

/// How long an idle mood flash lasts
pub const IDLE_FLASH_DURATION: Duration = Duration::from_secs(2);

/// Probability that an idle nudge flashes a mood
const IDLE_FLASH_CHANCE: f64 = 0.3;
/// Probability that an idle nudge says a line (after the flash band)
const IDLE_LINE_CHANCE: f64 = 0.2;

// =============================================================================
// Identifiers & Identity
// =============================================================================

/// Companion instance identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanionId(pub String);

impl CompanionId {
    /// Generate a new unique companion ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for CompanionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompanionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name and emoji shown in the title bar
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name
    pub name: String,
    /// Title emoji
    pub emoji: String,
}

/// What an idle nudge did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdleAction {
    /// The mood is not idle or happy; nothing happened
    Skipped,
    /// Flashed a mood that will relax after [`IDLE_FLASH_DURATION`]
    Flash(Mood),
    /// Said an idle line
    Line(String),
    /// Rolled the quiet band
    Nothing,
}

// =============================================================================
// Timer Tasks
// =============================================================================

/// Work scheduled on a companion's timeline
#[derive(Debug)]
pub(crate) enum TimerTask {
    /// Next pacing step of a reveal session
    Type(TypingTick),
    /// Grace period of a finished reveal elapsed
    RestoreIdle(SessionId),
    /// Pre-reply delay elapsed
    BeginReply {
        /// User text being answered
        prompt: String,
        /// Conversation generation the reply belongs to
        generation: u64,
    },
    /// An idle mood flash is over
    EndFlash(Mood),
}

// =============================================================================
// Companion
// =============================================================================

/// One independent companion instance
pub struct Companion {
    id: CompanionId,
    identity: Identity,
    default_mood: Mood,
    default_message: String,
    idle_messages: Vec<String>,
    registry: MoodRegistry,
    mood: MoodController,
    typing: TypingScheduler,
    conversation: Conversation,
    timeline: Timeline<TimerTask>,
    outbox: Outbox,
    rng: StdRng,
}

impl Companion {
    /// Create a companion from configuration
    #[must_use]
    pub fn new(config: &CompanionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a companion whose random choices are reproducible
    #[must_use]
    pub fn with_seed(config: &CompanionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &CompanionConfig, mut rng: StdRng) -> Self {
        let conversation_rng = StdRng::seed_from_u64(rng.gen());
        Self {
            id: CompanionId::new(),
            identity: Identity {
                name: config.name.clone(),
                emoji: config.emoji.clone(),
            },
            default_mood: config.default_mood,
            default_message: config.default_message.clone(),
            idle_messages: config.idle_messages.clone(),
            registry: MoodRegistry::new(),
            mood: MoodController::new(CompanionState::new(
                config.initial_status.clone(),
                config.initial_energy,
            )),
            typing: TypingScheduler::new(config.typing_speed, config.grace_delay),
            conversation: Conversation::new(
                config.pre_reply_delay,
                config.fallback_message.clone(),
                config.canned_responses.clone(),
                conversation_rng,
            ),
            timeline: Timeline::new(),
            outbox: Outbox::default(),
            rng,
        }
    }

    /// Show the startup state: default mood, default message, energy, identity
    pub fn start(&mut self) {
        self.outbox.push(RenderIntent::Identity {
            name: self.identity.name.clone(),
            emoji: self.identity.emoji.clone(),
        });
        self.mood.publish(&mut self.outbox);
        self.mood.set_mood(self.default_mood, false, &mut self.outbox);
        let message = self.default_message.clone();
        self.say(&message, true);
        tracing::info!(companion = %self.id, name = %self.identity.name, "Companion started");
    }

    // =========================================================================
    // Mood & Status
    // =========================================================================

    /// Show the mood named `mood`
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMoodError`] if `mood` is not in the catalog. The
    /// request is logged and the state is left unchanged.
    pub fn set_mood(&mut self, mood: &str, cascade: bool) -> Result<(), UnknownMoodError> {
        self.mood
            .set_mood_by_id(mood, cascade, &mut self.outbox)
            .map(|_| ())
    }

    /// Show `mood`
    pub fn set_mood_to(&mut self, mood: Mood, cascade: bool) {
        self.mood.set_mood(mood, cascade, &mut self.outbox);
    }

    /// Replace the status text
    pub fn set_status(&mut self, text: &str) {
        self.mood.set_status(text, &mut self.outbox);
    }

    /// Set the energy level, clamped to `[0, 100]`. NaN is ignored.
    pub fn set_energy_level(&mut self, level: f64) {
        self.mood.set_energy_level(level, &mut self.outbox);
    }

    /// Apply an activity label, optionally speaking `message`
    pub fn set_activity(&mut self, activity: &str, message: Option<&str>) {
        let released = self.mood.set_activity(
            activity,
            message,
            &mut self.typing,
            &mut self.timeline,
            &mut self.outbox,
        );
        self.commit_all(released);
    }

    /// Apply a canned activity transition
    pub fn shortcut(&mut self, shortcut: ActivityShortcut, message: Option<&str>) {
        let text = shortcut.message(message).to_string();
        self.set_activity(shortcut.activity(), Some(&text));
    }

    /// Every mood with its metadata
    #[must_use]
    pub fn moods(&self) -> Vec<(Mood, MoodMeta)> {
        self.registry.catalog()
    }

    // =========================================================================
    // Speech
    // =========================================================================

    /// Reveal `text` in the speech bubble
    pub fn say(&mut self, text: &str, instant: bool) {
        let released = self.typing.reveal(
            text,
            instant,
            &mut self.mood,
            &mut self.timeline,
            &mut self.outbox,
        );
        self.commit_all(released);
    }

    /// Text currently in the speech bubble
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.typing.display()
    }

    /// Typing scheduler state
    #[must_use]
    pub fn typing_state(&self) -> TypingState {
        self.typing.state()
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Change the display name
    pub fn set_name(&mut self, name: &str) {
        self.identity.name = name.to_string();
        self.push_identity();
    }

    /// Change the title emoji
    pub fn set_emoji(&mut self, emoji: &str) {
        self.identity.emoji = emoji.to_string();
        self.push_identity();
    }

    /// Current name and emoji
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Instance identifier
    #[must_use]
    pub fn id(&self) -> &CompanionId {
        &self.id
    }

    fn push_identity(&mut self) {
        self.outbox.push(RenderIntent::Identity {
            name: self.identity.name.clone(),
            emoji: self.identity.emoji.clone(),
        });
    }

    // =========================================================================
    // Conversation
    // =========================================================================

    /// Handle a message typed by the user. Returns `false` if it was blank.
    pub fn handle_user_input(&mut self, text: &str) -> bool {
        self.conversation.handle_user_input(
            text,
            &mut self.mood,
            &mut self.timeline,
            &mut self.outbox,
        )
    }

    /// Register the reply handler, replacing any previous one
    pub fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        self.conversation.set_message_handler(Some(handler));
    }

    /// Remove the reply handler; replies fall back to canned lines
    pub fn clear_message_handler(&mut self) {
        self.conversation.set_message_handler(None);
    }

    /// Conversation so far, oldest first
    #[must_use]
    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    /// Empty the conversation and forget replies in flight
    pub fn clear(&mut self) {
        self.conversation.clear(&mut self.outbox);
        self.timeline
            .cancel_where(|task| matches!(task, TimerTask::BeginReply { .. }));
    }

    /// Handler calls that are due and must be driven to completion
    pub fn take_pending_replies(&mut self) -> Vec<PendingReply> {
        self.conversation.take_pending()
    }

    /// Feed back the outcome of a handler call
    pub fn complete_reply(&mut self, id: ReplyId, result: anyhow::Result<String>) {
        self.conversation.complete_reply(
            id,
            result,
            &mut self.typing,
            &mut self.mood,
            &mut self.timeline,
            &mut self.outbox,
        );
    }

    /// Number of handler calls started but not completed
    #[must_use]
    pub fn awaiting_replies(&self) -> usize {
        self.conversation.awaiting_replies()
    }

    fn commit_all(&mut self, commits: Vec<PendingCommit>) {
        for commit in commits {
            self.conversation.commit(commit, &mut self.outbox);
        }
    }

    // =========================================================================
    // State & Observers
    // =========================================================================

    /// Snapshot of the visible state
    #[must_use]
    pub fn state(&self) -> CompanionState {
        self.mood.state().clone()
    }

    /// Observe one kind of notification
    pub fn subscribe<F>(&mut self, kind: EventKind, observer: F) -> SubscriptionToken
    where
        F: Fn(&CompanionEvent) + Send + Sync + 'static,
    {
        self.mood.observers_mut().subscribe(kind, observer)
    }

    /// Stop observing. Returns `false` if the token was not registered.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.mood.observers_mut().unsubscribe(token)
    }

    /// Render intents produced since the last call
    ///
    /// Events queued alongside are discarded; use [`Companion::drain_output`]
    /// to receive both in order.
    pub fn drain_intents(&mut self) -> Vec<RenderIntent> {
        self.outbox.drain()
    }

    /// Render intents and observer events produced since the last call, in
    /// the order they happened
    pub fn drain_output(&mut self) -> Vec<Output> {
        self.outbox.drain_output()
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Current virtual time in milliseconds since creation
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    /// Time since creation
    #[must_use]
    pub fn uptime(&self) -> Duration {
        Duration::from_millis(self.timeline.now_ms())
    }

    /// Virtual time of the next scheduled work, if any
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timeline.next_due()
    }

    /// Whether no timers are pending and no replies are outstanding
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.timeline.is_empty()
            && self.conversation.awaiting_replies() == 0
            && self.conversation.pending_replies() == 0
    }

    /// Run everything scheduled within the next `by`
    pub fn advance(&mut self, by: Duration) {
        let target = self.timeline.now_ms().saturating_add(millis(by));
        self.advance_to(target);
    }

    /// Run everything scheduled up to virtual time `target_ms`
    pub fn advance_to(&mut self, target_ms: u64) {
        while let Some(task) = self.timeline.pop_due(target_ms) {
            self.run_task(task);
        }
        self.timeline.set_now(target_ms);
    }

    fn run_task(&mut self, task: TimerTask) {
        match task {
            TimerTask::Type(tick) => {
                let released =
                    self.typing
                        .step(&tick, &mut self.mood, &mut self.timeline, &mut self.outbox);
                self.commit_all(released.into_iter().collect());
            }
            TimerTask::RestoreIdle(session) => {
                if self.typing.should_restore_idle(session) {
                    self.mood.set_mood(Mood::Idle, false, &mut self.outbox);
                }
            }
            TimerTask::BeginReply { prompt, generation } => {
                self.conversation.begin_reply(
                    prompt,
                    generation,
                    &mut self.typing,
                    &mut self.mood,
                    &mut self.timeline,
                    &mut self.outbox,
                );
            }
            TimerTask::EndFlash(mood) => {
                if self.mood.current_mood() == mood {
                    self.mood.set_mood(Mood::Idle, false, &mut self.outbox);
                }
            }
        }
    }

    // =========================================================================
    // Idle Behavior
    // =========================================================================

    /// One round of ambient idle behavior
    ///
    /// Only acts while the mood is idle or happy: flashes `happy` or
    /// `excited` for [`IDLE_FLASH_DURATION`] 30% of the time, says a random
    /// idle line 20% of the time, and otherwise does nothing.
    pub fn idle_nudge(&mut self) -> IdleAction {
        if !matches!(self.mood.current_mood(), Mood::Idle | Mood::Happy) {
            return IdleAction::Skipped;
        }

        let roll: f64 = self.rng.gen();
        if roll < IDLE_FLASH_CHANCE {
            let mood = if self.rng.gen_bool(0.5) {
                Mood::Happy
            } else {
                Mood::Excited
            };
            self.mood.set_mood(mood, false, &mut self.outbox);
            self.timeline
                .schedule(IDLE_FLASH_DURATION, TimerTask::EndFlash(mood));
            return IdleAction::Flash(mood);
        }
        if roll < IDLE_FLASH_CHANCE + IDLE_LINE_CHANCE {
            if let Some(line) = self.idle_messages.choose(&mut self.rng).cloned() {
                self.say(&line, false);
                return IdleAction::Line(line);
            }
        }
        IdleAction::Nothing
    }
}

impl Default for Companion {
    fn default() -> Self {
        Self::new(&CompanionConfig::default())
    }
}

impl std::fmt::Debug for Companion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Companion")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("state", self.mood.state())
            .field("typing", &self.typing.state())
            .field("conversation", &self.conversation)
            .field("now_ms", &self.timeline.now_ms())
            .finish_non_exhaustive()
    }
}

/// Format a duration as `HH:MM:SS`
///
/// Hours keep counting past 99.
#[must_use]
pub fn format_uptime(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
