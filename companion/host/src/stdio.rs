//! JSON-lines plumbing between the companion and the process's stdio.
//!
//! Every outbound line is one JSON object: render intents carry an
//! `"intent"` tag and observer notifications an `"event"` tag, so a surface
//! reading stdout can tell them apart without extra framing.

use std::io::Write;

use companion_core::{CompanionEvent, RenderIntent, RenderSink};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Parse one inbound line. Blank lines and invalid JSON yield `None`.
pub fn parse_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Skipping malformed input line");
            None
        }
    }
}

/// Serialize `value` as a single line
pub fn to_line<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(error = %e, "Failed to serialize output");
            None
        }
    }
}

fn emit<T: Serialize>(value: &T) {
    let Some(line) = to_line(value) else {
        return;
    };
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
        warn!(error = %e, "Failed to write to stdout");
    }
}

/// Render sink that prints intents and events to stdout, in emission order
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl RenderSink for StdoutSink {
    fn apply(&mut self, intent: &RenderIntent) {
        emit(intent);
    }

    fn notify(&mut self, event: &CompanionEvent) {
        emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_core::{Companion, CompanionConfig, IndicatorCategory, Mood};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line(r#"  {"action": "setMood", "payload": "happy"}  "#),
            Some(json!({"action": "setMood", "payload": "happy"}))
        );
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("{not json"), None);
    }

    #[test]
    fn test_intent_line_is_tagged() {
        let line = to_line(&RenderIntent::StatusIndicator {
            category: IndicatorCategory::LowPower,
        })
        .unwrap();
        assert_eq!(line, r#"{"intent":"statusIndicator","category":"low-power"}"#);
    }

    #[test]
    fn test_event_lines_follow_their_intents() {
        let mut companion = Companion::with_seed(&CompanionConfig::default(), 1);
        companion.set_activity("coding", None);

        let lines: Vec<Value> = companion
            .drain_output()
            .iter()
            .filter_map(to_line)
            .map(|line| serde_json::from_str(&line).unwrap())
            .collect();
        let tags: Vec<String> = lines
            .iter()
            .map(|value| {
                value
                    .get("intent")
                    .or_else(|| value.get("event"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                "avatarMood",
                "statusIndicator",
                "statusText",
                "energyBar",
                "moodChanged",
                "activityChanged",
            ]
        );
    }

    #[test]
    fn test_event_line_is_tagged() {
        let event = CompanionEvent::ActivityChanged {
            activity: "coding".to_string(),
            mood: Mood::Focused,
            message: None,
        };
        let value: Value = serde_json::from_str(&to_line(&event).unwrap()).unwrap();
        assert_eq!(value["event"], "activityChanged");
        assert_eq!(value["mood"], "focused");
    }
}
