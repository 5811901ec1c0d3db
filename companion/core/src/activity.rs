//! Activity Mapping
//!
//! Translates open-ended activity labels ("coding", "searching", ...) coming
//! from the driving agent into catalog moods.
//!
//! Labels are not validated: anything the table does not know resolves to
//! [`DEFAULT_ACTIVITY_MOOD`]. Because the table is typed in [`Mood`] values,
//! every entry is valid by construction.

use serde::{Deserialize, Serialize};

use crate::mood::Mood;

/// Mood used for labels the table does not know
pub const DEFAULT_ACTIVITY_MOOD: Mood = Mood::Idle;

/// Normalized activity label -> mood
const ACTIVITY_MOODS: &[(&str, Mood)] = &[
    ("idle", Mood::Idle),
    ("waiting", Mood::Idle),
    ("listening", Mood::Curious),
    ("thinking", Mood::Thinking),
    ("generating", Mood::Focused),
    ("processing", Mood::Thinking),
    ("searching", Mood::Curious),
    ("coding", Mood::Focused),
    ("sleeping", Mood::Sleepy),
    ("tired", Mood::Sleepy),
    ("speaking", Mood::Speaking),
    ("explaining", Mood::Speaking),
    ("error", Mood::Confused),
    ("confused", Mood::Confused),
    ("success", Mood::Happy),
    ("completed", Mood::Happy),
    ("helping", Mood::Happy),
    ("excited", Mood::Excited),
    ("celebrating", Mood::Excited),
    ("loving", Mood::Love),
    ("flirty", Mood::Mischievous),
    ("scheming", Mood::Mischievous),
];

/// Resolves activity labels to moods
#[derive(Clone, Copy, Debug, Default)]
pub struct ActivityMapper;

impl ActivityMapper {
    /// Create a mapper over the built-in table
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Mood for `activity`
    ///
    /// The label is trimmed and lowercased before lookup. Unknown labels
    /// resolve to [`DEFAULT_ACTIVITY_MOOD`].
    #[must_use]
    pub fn resolve(&self, activity: &str) -> Mood {
        let normalized = activity.trim().to_lowercase();
        ACTIVITY_MOODS
            .iter()
            .find(|(label, _)| *label == normalized)
            .map_or(DEFAULT_ACTIVITY_MOOD, |(_, mood)| *mood)
    }

    /// Whether `activity` has an explicit entry in the table
    #[must_use]
    pub fn is_known(&self, activity: &str) -> bool {
        let normalized = activity.trim().to_lowercase();
        ACTIVITY_MOODS.iter().any(|(label, _)| *label == normalized)
    }
}

/// Canned activity transitions with a default line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityShortcut {
    /// Start pondering
    StartThinking,
    /// Done pondering
    StopThinking,
    /// Heads down on a task
    StartWorking,
    /// Something did not make sense
    Confused,
    /// Party time
    Celebrate,
    /// Doze off
    Sleep,
    /// Back from a nap
    Wake,
}

impl ActivityShortcut {
    /// Activity label this shortcut applies
    #[must_use]
    pub fn activity(self) -> &'static str {
        match self {
            Self::StartThinking => "thinking",
            Self::StopThinking => "completed",
            Self::StartWorking => "coding",
            Self::Confused => "confused",
            Self::Celebrate => "celebrating",
            Self::Sleep => "sleeping",
            Self::Wake => "idle",
        }
    }

    /// Line spoken when the caller does not supply one
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::StartThinking => "Hmm, let me think...",
            Self::StopThinking => "Got it!",
            Self::StartWorking => "On it...",
            Self::Confused => "I'm not sure...",
            Self::Celebrate => "🎉",
            Self::Sleep => "zzz...",
            Self::Wake => "Hey!",
        }
    }

    /// Message to speak given an optional caller-supplied one
    ///
    /// `Sleep` always says its fixed line.
    #[must_use]
    pub fn message<'a>(self, custom: Option<&'a str>) -> &'a str {
        match (self, custom) {
            (Self::Sleep, _) | (_, None) => self.default_message(),
            (_, Some(text)) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let mapper = ActivityMapper::new();
        assert_eq!(mapper.resolve("CODING"), mapper.resolve("coding"));
        assert_eq!(mapper.resolve("  Searching "), Mood::Curious);
    }

    #[test]
    fn test_unknown_activity_resolves_to_idle() {
        let mapper = ActivityMapper::new();
        assert_eq!(mapper.resolve("unknown-activity-xyz"), Mood::Idle);
        assert_eq!(mapper.resolve(""), Mood::Idle);
        assert!(!mapper.is_known("unknown-activity-xyz"));
    }

    #[test]
    fn test_table_entries() {
        let mapper = ActivityMapper::new();
        assert_eq!(mapper.resolve("generating"), Mood::Focused);
        assert_eq!(mapper.resolve("tired"), Mood::Sleepy);
        assert_eq!(mapper.resolve("error"), Mood::Confused);
        assert_eq!(mapper.resolve("helping"), Mood::Happy);
        assert_eq!(mapper.resolve("loving"), Mood::Love);
        assert_eq!(mapper.resolve("scheming"), Mood::Mischievous);
        assert_eq!(mapper.resolve("explaining"), Mood::Speaking);
    }

    #[test]
    fn test_shortcut_messages() {
        assert_eq!(ActivityShortcut::StartThinking.message(None), "Hmm, let me think...");
        assert_eq!(ActivityShortcut::Celebrate.message(Some("Shipped!")), "Shipped!");
        assert_eq!(ActivityShortcut::Sleep.message(Some("five more minutes")), "zzz...");
        assert_eq!(ActivityShortcut::Wake.activity(), "idle");
    }
}
