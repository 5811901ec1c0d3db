//! Render Intents
//!
//! Declarative UI updates emitted by the companion core. The core never
//! touches a screen; it queues [`RenderIntent`]s and a [`RenderSink`] applies
//! them to whatever surface is attached (a terminal, a web page, a test
//! recorder).
//!
//! # Design Philosophy
//!
//! The surface is a pure renderer. Every intent carries the full value to
//! show (the whole message text so far, the whole status line), so a sink can
//! apply intents independently and a late-joining surface only needs the last
//! intent of each kind.
//!
//! ```text
//!   ┌──────────────┐  RenderIntent   ┌──────────────┐
//!   │  Companion   │ ──────────────► │  RenderSink  │ ──► pixels / JSON / Vec
//!   │  (headless)  │  drain_output   │  (surface)   │
//!   └──────────────┘                 └──────────────┘
//! ```
//!
//! Observer events are queued next to the intents as [`Output`], so a
//! sink that also wants events sees both in the order they happened.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::controller::EnergyTier;
use crate::conversation::Message;
use crate::events::CompanionEvent;
use crate::mood::{IndicatorCategory, Mood};

/// A single declarative UI update
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum RenderIntent {
    // ============================================
    // Avatar & Status
    // ============================================
    /// Show the avatar in a mood
    AvatarMood {
        /// Mood to display
        mood: Mood,
        /// Emoji face for the mood
        emoji: &'static str,
    },

    /// Status indicator category
    StatusIndicator {
        /// Indicator category
        category: IndicatorCategory,
    },

    /// Status line text
    StatusText {
        /// Text to display verbatim
        text: String,
    },

    /// Energy bar fill and colour tier
    EnergyBar {
        /// Level in `[0, 100]`
        level: f64,
        /// Colour bucket for the level
        tier: EnergyTier,
    },

    /// Title bar identity
    Identity {
        /// Display name
        name: String,
        /// Title emoji
        emoji: String,
    },

    // ============================================
    // Speech Bubble
    // ============================================
    /// Speech bubble contents
    MessageText {
        /// Full text currently visible
        text: String,
    },

    /// Blinking caret after the speech bubble text
    TypingCaret {
        /// Whether the caret is shown
        visible: bool,
    },

    // ============================================
    // Transcript
    // ============================================
    /// Transient "companion is typing" indicator in the transcript
    TypingIndicator {
        /// Whether the indicator is shown
        visible: bool,
    },

    /// A message was appended to the conversation
    TranscriptAppend {
        /// The appended message
        message: Message,
    },

    /// The conversation was cleared
    TranscriptCleared,
}

/// Anything the companion emits, in emission order
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// A render intent
    Intent(RenderIntent),
    /// An observer notification
    Event(CompanionEvent),
}

/// Applies render intents to a surface
pub trait RenderSink: Send {
    /// Apply one intent
    fn apply(&mut self, intent: &RenderIntent);

    /// Receive an observer notification, in order with the intents around it
    fn notify(&mut self, _event: &CompanionEvent) {}
}

impl<F> RenderSink for F
where
    F: FnMut(&RenderIntent) + Send,
{
    fn apply(&mut self, intent: &RenderIntent) {
        self(intent);
    }
}

/// Sink that discards everything (headless operation)
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn apply(&mut self, _intent: &RenderIntent) {}
}

/// Sink that records intents and events for later inspection
///
/// Clones share the same buffers, so a test can keep one clone while the
/// runtime owns another.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    intents: Arc<Mutex<Vec<RenderIntent>>>,
    events: Arc<Mutex<Vec<CompanionEvent>>>,
}

impl RecordingSink {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    #[must_use]
    pub fn snapshot(&self) -> Vec<RenderIntent> {
        self.intents.lock().clone()
    }

    /// Take everything recorded so far, leaving the buffer empty
    #[must_use]
    pub fn take(&self) -> Vec<RenderIntent> {
        std::mem::take(&mut *self.intents.lock())
    }

    /// Number of recorded intents
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.lock().len()
    }

    /// Whether no intent has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.lock().is_empty()
    }

    /// Copy of every event recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<CompanionEvent> {
        self.events.lock().clone()
    }
}

impl RenderSink for RecordingSink {
    fn apply(&mut self, intent: &RenderIntent) {
        self.intents.lock().push(intent.clone());
    }

    fn notify(&mut self, event: &CompanionEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Queue of intents produced while handling one request
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    entries: Vec<Output>,
}

impl Outbox {
    pub(crate) fn push(&mut self, intent: RenderIntent) {
        self.entries.push(Output::Intent(intent));
    }

    pub(crate) fn push_event(&mut self, event: CompanionEvent) {
        self.entries.push(Output::Event(event));
    }

    /// Take the queued intents, discarding queued events
    pub(crate) fn drain(&mut self) -> Vec<RenderIntent> {
        self.drain_output()
            .into_iter()
            .filter_map(|output| match output {
                Output::Intent(intent) => Some(intent),
                Output::Event(_) => None,
            })
            .collect()
    }

    pub(crate) fn drain_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.entries)
    }
}
