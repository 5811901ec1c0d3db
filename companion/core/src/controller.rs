//! Mood Controller
//!
//! Owns the companion's visible state (mood, status line, energy level,
//! current activity) and is the only place that state changes. The
//! controller lives inside [`Companion`](crate::Companion); hosts read a
//! [`CompanionState`] snapshot through `Companion::state`.
//!
//! # Cascade
//!
//! A mood change can optionally *cascade*: the mood's description becomes
//! the status text and its energy value becomes the energy level. Direct
//! mood requests from a host (`setMood`) do not cascade; activity changes
//! and conversation-driven moods do.
//!
//! ```text
//!   set_activity("coding")
//!        │
//!        ├─► ActivityMapper::resolve ──► Mood::Focused
//!        ├─► set_mood(Focused, cascade) ──► status "In the zone", energy 90
//!        ├─► TypingScheduler::reveal(message)            (if a message is given)
//!        └─► notify ActivityChanged
//! ```

use serde::{Deserialize, Serialize};

use crate::activity::ActivityMapper;
use crate::error::UnknownMoodError;
use crate::events::{CompanionEvent, ObserverRegistry};
use crate::mood::{Mood, MoodRegistry};
use crate::render::{Outbox, RenderIntent};
use crate::timeline::Timeline;
use crate::typing::{PendingCommit, TypingScheduler};
use crate::TimerTask;

/// Lowest energy level
pub const MIN_ENERGY: f64 = 0.0;
/// Highest energy level
pub const MAX_ENERGY: f64 = 100.0;

// =============================================================================
// State
// =============================================================================

/// Snapshot of the companion's visible state
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionState {
    /// Mood currently shown
    pub current_mood: Mood,
    /// Status line text
    pub status_text: String,
    /// Energy level in `[0, 100]`
    pub energy_level: f64,
    /// Last activity label applied, as supplied
    pub current_activity: Option<String>,
    /// Whether a character-by-character reveal is in progress
    pub is_typing_session_active: bool,
}

impl CompanionState {
    /// Initial state with the given status line and energy level
    #[must_use]
    pub fn new(status_text: impl Into<String>, energy_level: f64) -> Self {
        Self {
            current_mood: Mood::Idle,
            status_text: status_text.into(),
            energy_level: energy_level.clamp(MIN_ENERGY, MAX_ENERGY),
            current_activity: None,
            is_typing_session_active: false,
        }
    }
}

impl Default for CompanionState {
    fn default() -> Self {
        Self::new("Online", 75.0)
    }
}

/// Colour bucket for the energy bar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyTier {
    /// `level <= 30`
    Low,
    /// `30 < level <= 60`
    Medium,
    /// `level > 60`
    High,
}

impl EnergyTier {
    /// Tier for an energy level
    #[must_use]
    pub fn for_level(level: f64) -> Self {
        if level > 60.0 {
            Self::High
        } else if level > 30.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Applies mood, status, energy and activity transitions
#[derive(Debug)]
pub(crate) struct MoodController {
    state: CompanionState,
    registry: MoodRegistry,
    mapper: ActivityMapper,
    observers: ObserverRegistry,
}

impl MoodController {
    /// Create a controller starting from `state`
    #[must_use]
    pub(crate) fn new(state: CompanionState) -> Self {
        Self {
            state,
            registry: MoodRegistry::new(),
            mapper: ActivityMapper::new(),
            observers: ObserverRegistry::new(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &CompanionState {
        &self.state
    }

    /// Mood currently shown
    #[must_use]
    pub fn current_mood(&self) -> Mood {
        self.state.current_mood
    }

    /// Observers of this controller's notifications
    pub fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    /// Switch to `mood`, optionally cascading its metadata
    pub(crate) fn set_mood(&mut self, mood: Mood, cascade: bool, out: &mut Outbox) {
        let meta = mood.meta();
        self.state.current_mood = mood;
        out.push(RenderIntent::AvatarMood {
            mood,
            emoji: meta.emoji,
        });
        out.push(RenderIntent::StatusIndicator {
            category: mood.indicator(),
        });

        if cascade {
            self.set_status(meta.description, out);
            self.set_energy_level(f64::from(meta.energy), out);
        }

        tracing::debug!(mood = %mood, cascade, "Mood changed");
        self.emit(
            CompanionEvent::MoodChanged {
                mood,
                metadata: meta,
            },
            out,
        );
    }

    /// Switch to the mood named `id`
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMoodError`] if `id` is not in the catalog; the state
    /// is left unchanged.
    pub(crate) fn set_mood_by_id(
        &mut self,
        id: &str,
        cascade: bool,
        out: &mut Outbox,
    ) -> Result<Mood, UnknownMoodError> {
        match self.registry.parse(id) {
            Ok(mood) => {
                self.set_mood(mood, cascade, out);
                Ok(mood)
            }
            Err(err) => {
                tracing::warn!(mood = %id, "Unknown mood requested");
                Err(err)
            }
        }
    }

    /// Replace the status line verbatim
    pub(crate) fn set_status(&mut self, text: &str, out: &mut Outbox) {
        self.state.status_text = text.to_string();
        out.push(RenderIntent::StatusText {
            text: self.state.status_text.clone(),
        });
    }

    /// Store a clamped energy level. Returns `false` if `value` is NaN.
    pub(crate) fn set_energy_level(&mut self, value: f64, out: &mut Outbox) -> bool {
        if value.is_nan() {
            tracing::warn!("Ignoring NaN energy level");
            return false;
        }
        let level = value.clamp(MIN_ENERGY, MAX_ENERGY);
        self.state.energy_level = level;
        out.push(RenderIntent::EnergyBar {
            level,
            tier: EnergyTier::for_level(level),
        });
        true
    }

    /// Apply an activity label, speaking `message` if one is given
    ///
    /// Returns commits released by the typing scheduler (an interrupted
    /// reply, for instance).
    pub(crate) fn set_activity(
        &mut self,
        activity: &str,
        message: Option<&str>,
        typing: &mut TypingScheduler,
        timeline: &mut Timeline<TimerTask>,
        out: &mut Outbox,
    ) -> Vec<PendingCommit> {
        let mood = self.mapper.resolve(activity);
        self.state.current_activity = Some(activity.to_string());
        self.set_mood(mood, true, out);

        let message = message.filter(|text| !text.is_empty());
        let released = match message {
            Some(text) => typing.reveal(text, false, self, timeline, out),
            None => Vec::new(),
        };

        tracing::debug!(activity = %activity, mood = %mood, "Activity changed");
        self.emit(
            CompanionEvent::ActivityChanged {
                activity: activity.to_string(),
                mood,
                message: message.map(str::to_string),
            },
            out,
        );
        released
    }

    /// Notify observers now and queue the event behind the intents it follows
    fn emit(&self, event: CompanionEvent, out: &mut Outbox) {
        self.observers.notify(&event);
        out.push_event(event);
    }

    pub(crate) fn set_typing_active(&mut self, active: bool) {
        self.state.is_typing_session_active = active;
    }

    /// Push intents describing the whole current state
    pub(crate) fn publish(&self, out: &mut Outbox) {
        let mood = self.state.current_mood;
        out.push(RenderIntent::AvatarMood {
            mood,
            emoji: mood.meta().emoji,
        });
        out.push(RenderIntent::StatusIndicator {
            category: mood.indicator(),
        });
        out.push(RenderIntent::StatusText {
            text: self.state.status_text.clone(),
        });
        out.push(RenderIntent::EnergyBar {
            level: self.state.energy_level,
            tier: EnergyTier::for_level(self.state.energy_level),
        });
    }
}

impl Default for MoodController {
    fn default() -> Self {
        Self::new(CompanionState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::mood::IndicatorCategory;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_set_mood_without_cascade_keeps_status() {
        let mut controller = MoodController::default();
        let mut out = Outbox::default();
        controller.set_mood(Mood::Sleepy, false, &mut out);

        assert_eq!(controller.current_mood(), Mood::Sleepy);
        assert_eq!(controller.state().status_text, "Online");
        assert_eq!(controller.state().energy_level, 75.0);

        let intents = out.drain();
        assert!(intents.contains(&RenderIntent::StatusIndicator {
            category: IndicatorCategory::LowPower
        }));
    }

    #[test]
    fn test_set_mood_with_cascade() {
        let mut controller = MoodController::default();
        let mut out = Outbox::default();
        controller.set_mood(Mood::Focused, true, &mut out);

        assert_eq!(controller.state().status_text, "In the zone");
        assert_eq!(controller.state().energy_level, 90.0);
    }

    #[test]
    fn test_unknown_mood_leaves_state_unchanged() {
        let mut controller = MoodController::default();
        let mut out = Outbox::default();
        let before = controller.state().clone();

        let result = controller.set_mood_by_id("grumpy", true, &mut out);

        assert!(result.is_err());
        assert_eq!(controller.state(), &before);
        assert!(out.drain().is_empty());
    }

    #[test]
    fn test_energy_level_clamped() {
        let mut controller = MoodController::default();
        let mut out = Outbox::default();

        controller.set_energy_level(150.0, &mut out);
        assert_eq!(controller.state().energy_level, 100.0);
        controller.set_energy_level(-5.0, &mut out);
        assert_eq!(controller.state().energy_level, 0.0);
        assert!(!controller.set_energy_level(f64::NAN, &mut out));
        assert_eq!(controller.state().energy_level, 0.0);
    }

    #[test]
    fn test_energy_tiers() {
        assert_eq!(EnergyTier::for_level(61.0), EnergyTier::High);
        assert_eq!(EnergyTier::for_level(60.0), EnergyTier::Medium);
        assert_eq!(EnergyTier::for_level(30.5), EnergyTier::Medium);
        assert_eq!(EnergyTier::for_level(30.0), EnergyTier::Low);
        assert_eq!(EnergyTier::for_level(0.0), EnergyTier::Low);
    }

    #[test]
    fn test_mood_changed_notified_after_cascade() {
        let mut controller = MoodController::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        controller
            .observers_mut()
            .subscribe(EventKind::MoodChanged, move |event| s.lock().push(event.clone()));

        let mut out = Outbox::default();
        controller.set_mood(Mood::Excited, true, &mut out);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            CompanionEvent::MoodChanged {
                mood: Mood::Excited,
                metadata: Mood::Excited.meta(),
            }
        );
    }
}
