//! Mood Catalog
//!
//! The closed set of moods the companion can display, and the registry that
//! answers questions about them.
//!
//! # Design Philosophy
//!
//! Moods are a fixed vocabulary. Every other component talks in [`Mood`]
//! values, so an invalid mood can only enter the system at a string boundary
//! (the message bus, the programmatic string setters). That boundary goes
//! through [`MoodRegistry`], which is the single validity oracle.
//!
//! ```text
//!   "happy" ──► MoodRegistry::parse ──► Mood::Happy ──► MoodMeta { 😊, "Feeling good", 75 }
//!   "grumpy" ─► MoodRegistry::parse ──► UnknownMoodError
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownMoodError;

/// Companion moods
///
/// Serialized as the lowercase identifier (`"idle"`, `"happy"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Resting state
    #[default]
    Idle,
    /// Feeling good
    Happy,
    /// Processing something
    Thinking,
    /// Low energy
    Sleepy,
    /// Hyped
    Excited,
    /// Currently revealing text
    Speaking,
    /// Intrigued
    Curious,
    /// Feeling warm
    Love,
    /// Up to something
    Mischievous,
    /// In the zone
    Focused,
    /// Uncertain
    Confused,
}

impl Mood {
    /// Every mood, in catalog order
    pub const ALL: [Mood; 11] = [
        Mood::Idle,
        Mood::Happy,
        Mood::Thinking,
        Mood::Sleepy,
        Mood::Excited,
        Mood::Speaking,
        Mood::Curious,
        Mood::Love,
        Mood::Mischievous,
        Mood::Focused,
        Mood::Confused,
    ];

    /// Wire identifier for this mood
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Happy => "happy",
            Self::Thinking => "thinking",
            Self::Sleepy => "sleepy",
            Self::Excited => "excited",
            Self::Speaking => "speaking",
            Self::Curious => "curious",
            Self::Love => "love",
            Self::Mischievous => "mischievous",
            Self::Focused => "focused",
            Self::Confused => "confused",
        }
    }

    /// Catalog metadata for this mood
    #[must_use]
    pub fn meta(self) -> MoodMeta {
        let (emoji, description, energy) = match self {
            Self::Idle => ("😌", "Chilling", 50),
            Self::Happy => ("😊", "Feeling good", 75),
            Self::Thinking => ("🤔", "Processing...", 60),
            Self::Sleepy => ("😴", "Low energy", 20),
            Self::Excited => ("🤩", "Hyped!", 95),
            Self::Speaking => ("💬", "Talking", 70),
            Self::Curious => ("👀", "Intrigued", 65),
            Self::Love => ("💖", "Feeling warm", 85),
            Self::Mischievous => ("😏", "Up to something", 80),
            Self::Focused => ("🎯", "In the zone", 90),
            Self::Confused => ("😕", "Uncertain...", 45),
        };
        MoodMeta {
            emoji,
            description,
            energy,
        }
    }

    /// Status indicator category shown next to the status text
    #[must_use]
    pub fn indicator(self) -> IndicatorCategory {
        match self {
            Self::Thinking | Self::Focused => IndicatorCategory::Busy,
            Self::Sleepy => IndicatorCategory::LowPower,
            _ => IndicatorCategory::Normal,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Mood {
    type Err = UnknownMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .iter()
            .copied()
            .find(|mood| mood.id() == s)
            .ok_or_else(|| UnknownMoodError(s.to_string()))
    }
}

/// Metadata attached to every mood
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodMeta {
    /// Emoji rendered as the avatar face
    pub emoji: &'static str,
    /// Short human description, used as status text on cascade
    pub description: &'static str,
    /// Energy level (0-100) applied on cascade
    #[serde(rename = "energyLevel")]
    pub energy: u8,
}

/// Tri-state status indicator derived from the mood
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorCategory {
    /// Regular online indicator
    #[default]
    Normal,
    /// Working on something
    Busy,
    /// Dozing
    LowPower,
}

/// Read-only view over the mood catalog
///
/// Stateless. Kept as a type so callers hold an explicit dependency on the
/// catalog instead of reaching for free functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoodRegistry;

impl MoodRegistry {
    /// Create a registry handle
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether `id` names a mood in the catalog
    ///
    /// Matching is exact: identifiers are lowercase on the wire.
    #[must_use]
    pub fn is_valid_mood(&self, id: &str) -> bool {
        id.parse::<Mood>().is_ok()
    }

    /// Resolve an identifier to a mood
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMoodError`] if `id` is not in the catalog.
    pub fn parse(&self, id: &str) -> Result<Mood, UnknownMoodError> {
        id.parse()
    }

    /// Metadata for the mood named `id`
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMoodError`] if `id` is not in the catalog.
    pub fn metadata_of(&self, id: &str) -> Result<MoodMeta, UnknownMoodError> {
        self.parse(id).map(Mood::meta)
    }

    /// Every mood with its metadata, in declaration order
    #[must_use]
    pub fn catalog(&self) -> Vec<(Mood, MoodMeta)> {
        Mood::ALL.iter().map(|mood| (*mood, mood.meta())).collect()
    }
}
