//! Typing Scheduler
//!
//! Reveals text in the speech bubble one character at a time.
//!
//! # State Machine
//!
//! ```text
//!              reveal(text)                    last char + one step
//!   ┌──────┐ ───────────────► ┌───────────┐ ─────────────────────────► ┌──────┐
//!   │ Idle │                  │ Revealing │                            │ Idle │
//!   └──────┘ ◄─────────────── └───────────┘                            └──────┘
//!        reveal(instant)           │ reveal(other)
//!                                  ▼
//!                           ┌─────────────┐
//!                           │ Interrupted │ ──► new Revealing session / Idle
//!                           └─────────────┘
//! ```
//!
//! At most one session is live. Starting a reveal cancels the previous
//! session's [`CancelFlag`]; the cancelled session's already-scheduled step
//! still fires once but sees the flag and changes nothing, so the bubble
//! keeps the prefix it had reached until the new session writes over it.
//!
//! Characters are Unicode scalar values. The first character is shown
//! immediately, each following one after the typing speed, and one more
//! step after the last character the full text is assigned again and the
//! session ends. A grace period later the mood relaxes to idle, unless a
//! newer session has started in the meantime.
//!
//! The scheduler is internal to [`Companion`](crate::Companion); hosts see
//! the bubble through `Companion::display_text` and `Companion::typing_state`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::controller::MoodController;
use crate::mood::Mood;
use crate::render::{Outbox, RenderIntent};
use crate::timeline::Timeline;
use crate::TimerTask;

/// Default pause between characters
pub const DEFAULT_TYPING_SPEED: Duration = Duration::from_millis(50);
/// Default pause between the end of a reveal and the mood returning to idle
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(500);

/// Scheduler state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TypingState {
    /// Nothing being revealed
    #[default]
    Idle,
    /// A session is emitting characters
    Revealing,
    /// The last session was cut short by a newer request
    Interrupted,
}

/// Reveal session identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

/// Shared cancellation flag for one reveal session
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Mark the session cancelled
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the session was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pending timeline step of a session
#[derive(Clone, Debug)]
pub(crate) struct TypingTick {
    session: SessionId,
    cancel: CancelFlag,
}

/// Companion message to record once a reveal session ends
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingCommit {
    pub(crate) text: String,
    pub(crate) generation: u64,
}

/// How a reveal treats the current mood
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MoodPolicy {
    /// Switch to `speaking` while revealing
    Speaking,
    /// Leave the mood as it is
    Keep,
}

#[derive(Debug)]
struct TypingSession {
    id: SessionId,
    text: String,
    chars: Vec<char>,
    cursor: usize,
    cancel: CancelFlag,
    commit: Option<PendingCommit>,
}

/// Owns the speech bubble text and the single reveal session
#[derive(Debug)]
pub(crate) struct TypingScheduler {
    state: TypingState,
    display: String,
    session: Option<TypingSession>,
    next_session: u64,
    latest_session: Option<SessionId>,
    typing_speed: Duration,
    grace_delay: Duration,
}

impl TypingScheduler {
    /// Create a scheduler with the given pacing
    #[must_use]
    pub(crate) fn new(typing_speed: Duration, grace_delay: Duration) -> Self {
        Self {
            state: TypingState::Idle,
            display: String::new(),
            session: None,
            next_session: 0,
            latest_session: None,
            typing_speed,
            grace_delay,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> TypingState {
        self.state
    }

    /// Text currently shown in the speech bubble
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Whether a session is emitting characters
    #[must_use]
    pub fn is_revealing(&self) -> bool {
        self.session.is_some()
    }

    /// Full text of the live session
    #[cfg(test)]
    pub fn target_text(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.text.as_str())
    }

    /// Reveal `text`, switching to the speaking mood unless `instant`
    pub(crate) fn reveal(
        &mut self,
        text: &str,
        instant: bool,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) -> Vec<PendingCommit> {
        self.reveal_with(text, instant, MoodPolicy::Speaking, None, mood, timeline, out)
    }

    /// Reveal `text` and record `commit` when the session ends
    ///
    /// Returns commits released synchronously: the interrupted session's,
    /// and this one's if it finished immediately (instant or empty text).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reveal_with(
        &mut self,
        text: &str,
        instant: bool,
        policy: MoodPolicy,
        commit: Option<PendingCommit>,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) -> Vec<PendingCommit> {
        let interrupted = self.session.as_ref().map(|session| session.id);
        let mut released: Vec<PendingCommit> = self.interrupt(mood, out).into_iter().collect();

        if instant {
            self.display = text.to_string();
            out.push(RenderIntent::MessageText {
                text: self.display.clone(),
            });
            self.state = TypingState::Idle;
            // The interrupted session put the mood in speaking and will never finish
            if let Some(id) = interrupted {
                timeline.schedule(self.grace_delay, TimerTask::RestoreIdle(id));
            }
            released.extend(commit);
            return released;
        }

        if policy == MoodPolicy::Speaking {
            mood.set_mood(Mood::Speaking, false, out);
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let cancel = CancelFlag::default();
        self.session = Some(TypingSession {
            id,
            text: text.to_string(),
            chars: text.chars().collect(),
            cursor: 0,
            cancel: cancel.clone(),
            commit,
        });
        self.latest_session = Some(id);
        self.state = TypingState::Revealing;
        self.display.clear();
        mood.set_typing_active(true);
        out.push(RenderIntent::TypingCaret { visible: true });
        tracing::trace!(session = id.0, chars = text.chars().count(), "Reveal started");

        let tick = TypingTick {
            session: id,
            cancel,
        };
        released.extend(self.step(&tick, mood, timeline, out));
        released
    }

    /// Run one pacing step of a session
    pub(crate) fn step(
        &mut self,
        tick: &TypingTick,
        mood: &mut MoodController,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) -> Option<PendingCommit> {
        if tick.cancel.is_cancelled() {
            tracing::trace!(session = tick.session.0, "Cancelled reveal step ignored");
            return None;
        }
        let session = self.session.as_mut()?;
        if session.id != tick.session {
            return None;
        }

        if let Some(&ch) = session.chars.get(session.cursor) {
            session.cursor += 1;
            self.display.push(ch);
            out.push(RenderIntent::MessageText {
                text: self.display.clone(),
            });
            timeline.schedule(self.typing_speed, TimerTask::Type(tick.clone()));
            return None;
        }

        let session = self.session.take()?;
        self.display = session.text;
        out.push(RenderIntent::MessageText {
            text: self.display.clone(),
        });
        out.push(RenderIntent::TypingCaret { visible: false });
        self.state = TypingState::Idle;
        mood.set_typing_active(false);
        timeline.schedule(self.grace_delay, TimerTask::RestoreIdle(session.id));
        tracing::trace!(session = session.id.0, "Reveal finished");
        session.commit
    }

    /// Whether the grace period of `session` should relax the mood
    #[must_use]
    pub(crate) fn should_restore_idle(&self, session: SessionId) -> bool {
        self.latest_session == Some(session) && !self.is_revealing()
    }

    /// Cancel the live session, freezing the bubble at its current prefix
    fn interrupt(&mut self, mood: &mut MoodController, out: &mut Outbox) -> Option<PendingCommit> {
        let session = self.session.take()?;
        session.cancel.cancel();
        self.state = TypingState::Interrupted;
        mood.set_typing_active(false);
        out.push(RenderIntent::TypingCaret { visible: false });
        tracing::debug!(
            session = session.id.0,
            shown = session.cursor,
            total = session.chars.len(),
            "Reveal interrupted"
        );
        session.commit
    }
}

impl Default for TypingScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_SPEED, DEFAULT_GRACE_DELAY)
    }
}
