//! Conversation
//!
//! Message history between the user and the companion, and the reply flow
//! that turns a user message into a revealed companion answer.
//!
//! # Reply Flow
//!
//! ```text
//!   handle_user_input("hi")
//!        │  append user message, mood thinking (cascade)
//!        ▼
//!   ── pre-reply delay (timeline) ──
//!        │  typing indicator on
//!        ▼
//!   begin_reply ──► handler registered? ──no──► random canned line ─┐
//!        │ yes                                                      │
//!        ▼                                                          │
//!   PendingReply ──► driver polls ──► complete_reply(Ok | Err) ◄────┘
//!                                          │  typing indicator off
//!                                          ├─ Ok(text): reveal text
//!                                          └─ Err: mood confused, reveal fallback
//!                                          ▼
//!                            companion message recorded when the reveal ends
//! ```
//!
//! History only ever grows, except through an explicit [`clear`]. Clearing
//! bumps a generation counter so replies and reveals that were in flight at
//! the time never land in the fresh history.
//!
//! The conversation is owned by [`Companion`](crate::Companion), which is
//! the only way to add messages or read the history.
//!
//! [`clear`]: crate::Companion::clear

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::controller::MoodController;
use crate::handler::{MessageHandler, PendingReply, ReplyId};
use crate::mood::Mood;
use crate::render::{Outbox, RenderIntent};
use crate::timeline::Timeline;
use crate::typing::{MoodPolicy, PendingCommit, TypingScheduler};
use crate::TimerTask;

/// Default pause between a user message and the reply starting
pub const DEFAULT_PRE_REPLY_DELAY: Duration = Duration::from_millis(600);

/// Line revealed when the reply handler fails
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Oops, my circuits got tangled. Can you try that again?";

// =============================================================================
// Messages
// =============================================================================

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human
    User,
    /// The companion
    Companion,
}

/// A message in the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Message text
    pub text: String,
    /// Who wrote it
    pub sender: Sender,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Message history plus the reply pipeline
pub(crate) struct Conversation {
    history: Vec<Message>,
    handler: Option<Arc<dyn MessageHandler>>,
    generation: u64,
    next_reply: u64,
    /// Outstanding replies and the generation they belong to
    awaiting: HashMap<ReplyId, u64>,
    pending: Vec<PendingReply>,
    canned_responses: Vec<String>,
    fallback_message: String,
    pre_reply_delay: Duration,
    rng: StdRng,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub(crate) fn new(
        pre_reply_delay: Duration,
        fallback_message: impl Into<String>,
        canned_responses: Vec<String>,
        rng: StdRng,
    ) -> Self {
        Self {
            history: Vec::new(),
            handler: None,
            generation: 0,
            next_reply: 0,
            awaiting: HashMap::new(),
            pending: Vec::new(),
            canned_responses,
            fallback_message: fallback_message.into(),
            pre_reply_delay,
            rng,
        }
    }

    /// Messages so far, oldest first
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Whether a reply handler is registered
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Number of replies started but not yet completed
    #[must_use]
    pub fn awaiting_replies(&self) -> usize {
        self.awaiting.len()
    }

    /// Number of handler calls waiting to be picked up by a driver
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    /// Replace (or with `None`, remove) the reply handler
    pub fn set_message_handler(&mut self, handler: Option<Arc<dyn MessageHandler>>) {
        self.handler = handler;
    }

    /// Append a message to history
    pub(crate) fn add_message(&mut self, text: &str, sender: Sender, out: &mut Outbox) -> Message {
        let message = Message::new(text, sender);
        self.history.push(message.clone());
        out.push(RenderIntent::TranscriptAppend {
            message: message.clone(),
        });
        message
    }

    /// Record a user message and schedule the reply. Returns `false` for
    /// blank input, which is ignored.
    pub(crate) fn handle_user_input(
        &mut self,
        text: &str,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.add_message(text, Sender::User, out);
        mood.set_mood(Mood::Thinking, true, out);
        timeline.schedule(
            self.pre_reply_delay,
            TimerTask::BeginReply {
                prompt: text.to_string(),
                generation: self.generation,
            },
        );
        true
    }

    /// Pre-reply delay elapsed: ask the handler, or answer from the canned set
    pub(crate) fn begin_reply(
        &mut self,
        prompt: String,
        generation: u64,
        typing: &mut TypingScheduler,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) {
        if generation != self.generation {
            tracing::debug!("Dropping reply for a cleared conversation");
            return;
        }

        let id = ReplyId(self.next_reply);
        self.next_reply += 1;
        self.awaiting.insert(id, generation);
        out.push(RenderIntent::TypingIndicator { visible: true });

        if let Some(handler) = self.handler.clone() {
            tracing::debug!(reply = id.0, "Reply handed to message handler");
            let history = self.history.clone();
            self.pending.push(PendingReply::new(id, handler, prompt, history));
        } else {
            let reply = self.canned_response();
            self.complete_reply(id, Ok(reply), typing, mood, timeline, out);
        }
    }

    /// Feed back the outcome of a reply
    ///
    /// Unknown or stale ids (for instance after a clear) are ignored.
    pub(crate) fn complete_reply(
        &mut self,
        id: ReplyId,
        result: anyhow::Result<String>,
        typing: &mut TypingScheduler,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) {
        let Some(generation) = self.awaiting.remove(&id) else {
            tracing::debug!(reply = id.0, "Ignoring completion of unknown reply");
            return;
        };
        if self.awaiting.is_empty() {
            out.push(RenderIntent::TypingIndicator { visible: false });
        }

        let released = match result {
            Ok(text) => {
                let commit = PendingCommit {
                    text: text.clone(),
                    generation,
                };
                typing.reveal_with(
                    &text,
                    false,
                    MoodPolicy::Speaking,
                    Some(commit),
                    mood,
                    timeline,
                    out,
                )
            }
            Err(err) => {
                tracing::warn!(reply = id.0, error = %err, "Message handler failed");
                mood.set_mood(Mood::Confused, true, out);
                let commit = PendingCommit {
                    text: self.fallback_message.clone(),
                    generation,
                };
                let fallback = self.fallback_message.clone();
                typing.reveal_with(
                    &fallback,
                    false,
                    MoodPolicy::Keep,
                    Some(commit),
                    mood,
                    timeline,
                    out,
                )
            }
        };
        for commit in released {
            self.commit(commit, out);
        }
    }

    /// Record the companion message of a finished reveal
    pub(crate) fn commit(&mut self, commit: PendingCommit, out: &mut Outbox) {
        if commit.generation != self.generation {
            tracing::debug!("Dropping reply text for a cleared conversation");
            return;
        }
        self.add_message(&commit.text, Sender::Companion, out);
    }

    /// Handler calls waiting for a driver
    pub(crate) fn take_pending(&mut self) -> Vec<PendingReply> {
        std::mem::take(&mut self.pending)
    }

    /// Empty history and forget replies in flight
    pub(crate) fn clear(&mut self, out: &mut Outbox) {
        self.history.clear();
        self.generation += 1;
        self.awaiting.clear();
        self.pending.clear();
        out.push(RenderIntent::TypingIndicator { visible: false });
        out.push(RenderIntent::TranscriptCleared);
    }

    fn canned_response(&mut self) -> String {
        self.canned_responses
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| self.fallback_message.clone())
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("messages", &self.history.len())
            .field("has_handler", &self.has_handler())
            .field("generation", &self.generation)
            .field("awaiting", &self.awaiting.len())
            .finish_non_exhaustive()
    }
}
