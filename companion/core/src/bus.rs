//! Message Bus
//!
//! The structured inbound protocol a host uses to drive a companion:
//! `{"action": "...", "payload": ...}` objects, one per request.
//!
//! | action | payload |
//! |---|---|
//! | `setMood` | mood id (no cascade) |
//! | `setStatus` | status text |
//! | `setEnergyLevel` / `setMoodLevel` | number |
//! | `say` | `{text, instant?}` |
//! | `setActivity` | `{activity, message?}` |
//! | `userMessage` | user text |
//! | `setName` / `setEmoji` | string |
//! | `configure` | any of `name, emoji, mood, activity, status, message, instant, energyLevel (moodLevel)` |
//!
//! Unknown actions and payloads of the wrong shape are dropped with a debug
//! log; a misbehaving host can never put the companion in an error state.

use serde::Deserialize;
use serde_json::Value;

use crate::Companion;

/// A parsed inbound request
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum BusRequest {
    /// Show a mood without touching status or energy
    SetMood(String),
    /// Replace the status text
    SetStatus(String),
    /// Set the energy level
    #[serde(alias = "setMoodLevel")]
    SetEnergyLevel(f64),
    /// Reveal a line in the speech bubble
    Say(SayPayload),
    /// Apply an activity label
    SetActivity(ActivityPayload),
    /// A message typed by the user
    UserMessage(String),
    /// Change the display name
    SetName(String),
    /// Change the title emoji
    SetEmoji(String),
    /// Apply several settings at once
    Configure(ConfigurePayload),
}

impl BusRequest {
    /// Action name as it appears on the wire
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::SetMood(_) => "setMood",
            Self::SetStatus(_) => "setStatus",
            Self::SetEnergyLevel(_) => "setEnergyLevel",
            Self::Say(_) => "say",
            Self::SetActivity(_) => "setActivity",
            Self::UserMessage(_) => "userMessage",
            Self::SetName(_) => "setName",
            Self::SetEmoji(_) => "setEmoji",
            Self::Configure(_) => "configure",
        }
    }
}

/// Payload of `say`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SayPayload {
    /// Text to reveal
    pub text: String,
    /// Skip the typing animation. Absent or null animates.
    #[serde(default)]
    pub instant: Option<bool>,
}

/// Payload of `setActivity`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ActivityPayload {
    /// Activity label
    pub activity: String,
    /// Line to speak alongside
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of `configure`. Absent fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurePayload {
    /// Display name
    pub name: Option<String>,
    /// Title emoji
    pub emoji: Option<String>,
    /// Mood id (no cascade)
    pub mood: Option<String>,
    /// Activity label
    pub activity: Option<String>,
    /// Status text
    pub status: Option<String>,
    /// Line to reveal
    pub message: Option<String>,
    /// Reveal `message` instantly. Absent or null animates.
    #[serde(default)]
    pub instant: Option<bool>,
    /// Energy level
    #[serde(alias = "moodLevel")]
    pub energy_level: Option<f64>,
}

/// Outcome of handling an inbound value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The request was applied
    Applied(&'static str),
    /// The value was not a request this bus understands
    Ignored,
}

/// Translates inbound requests into companion calls
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageBus;

impl MessageBus {
    /// Parse an inbound value. `None` for unknown actions or bad payloads.
    #[must_use]
    pub fn parse(value: &Value) -> Option<BusRequest> {
        match BusRequest::deserialize(value) {
            Ok(request) => Some(request),
            Err(err) => {
                let action = value.get("action").and_then(Value::as_str).unwrap_or("<none>");
                tracing::debug!(action = %action, error = %err, "Ignoring inbound message");
                None
            }
        }
    }

    /// Parse and apply an inbound value
    pub fn handle(companion: &mut Companion, value: &Value) -> Dispatch {
        match Self::parse(value) {
            Some(request) => Self::dispatch(companion, request),
            None => Dispatch::Ignored,
        }
    }

    /// Apply a parsed request
    pub fn dispatch(companion: &mut Companion, request: BusRequest) -> Dispatch {
        let action = request.action();
        tracing::debug!(action = %action, "Inbound request");

        match request {
            BusRequest::SetMood(mood) => {
                // Unknown moods are logged by the controller and otherwise ignored
                let _ = companion.set_mood(&mood, false);
            }
            BusRequest::SetStatus(text) => companion.set_status(&text),
            BusRequest::SetEnergyLevel(level) => companion.set_energy_level(level),
            BusRequest::Say(SayPayload { text, instant }) => {
                companion.say(&text, instant.unwrap_or(false));
            }
            BusRequest::SetActivity(ActivityPayload { activity, message }) => {
                companion.set_activity(&activity, message.as_deref());
            }
            BusRequest::UserMessage(text) => {
                companion.handle_user_input(&text);
            }
            BusRequest::SetName(name) => companion.set_name(&name),
            BusRequest::SetEmoji(emoji) => companion.set_emoji(&emoji),
            BusRequest::Configure(payload) => Self::configure(companion, payload),
        }
        Dispatch::Applied(action)
    }

    /// Apply `configure` fields in their fixed order
    fn configure(companion: &mut Companion, payload: ConfigurePayload) {
        if let Some(name) = payload.name {
            companion.set_name(&name);
        }
        if let Some(emoji) = payload.emoji {
            companion.set_emoji(&emoji);
        }
        if let Some(mood) = payload.mood {
            let _ = companion.set_mood(&mood, false);
        }
        if let Some(activity) = payload.activity {
            companion.set_activity(&activity, None);
        }
        if let Some(status) = payload.status {
            companion.set_status(&status);
        }
        if let Some(message) = payload.message {
            companion.say(&message, payload.instant.unwrap_or(false));
        }
        if let Some(level) = payload.energy_level {
            companion.set_energy_level(level);
        }
    }
}
