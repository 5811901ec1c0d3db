//! Inbound `{action, payload}` requests applied to a live companion.

use std::sync::Arc;
use std::time::Duration;

use companion_core::{
    Companion, CompanionConfig, CompanionEvent, Dispatch, EventKind, Mood, MessageBus,
    RenderIntent,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

fn companion() -> Companion {
    let mut companion = Companion::with_seed(&CompanionConfig::default(), 3);
    companion.start();
    companion.drain_intents();
    companion
}

#[test]
fn test_set_mood_does_not_cascade() {
    let mut companion = companion();
    let dispatch = MessageBus::handle(
        &mut companion,
        &json!({"action": "setMood", "payload": "sleepy"}),
    );

    assert_eq!(dispatch, Dispatch::Applied("setMood"));
    let state = companion.state();
    assert_eq!(state.current_mood, Mood::Sleepy);
    assert_eq!(state.status_text, "Online");
    assert_eq!(state.energy_level, 75.0);
}

#[test]
fn test_unknown_action_leaves_state_unchanged() {
    let mut companion = companion();
    let before = companion.state();

    for value in [
        json!({"action": "dance", "payload": "now"}),
        json!({"action": "setMood", "payload": "grumpy"}),
        json!({"action": "setEnergyLevel", "payload": "high"}),
        json!(42),
    ] {
        MessageBus::handle(&mut companion, &value);
    }

    assert_eq!(companion.state(), before);
    assert!(companion.drain_intents().is_empty());
}

#[test]
fn test_configure_applies_status_after_mood() {
    let mut companion = companion();
    MessageBus::handle(
        &mut companion,
        &json!({"action": "configure", "payload": {"status": "A", "mood": "happy"}}),
    );

    let state = companion.state();
    assert_eq!(state.current_mood, Mood::Happy);
    assert_eq!(state.status_text, "A");
}

#[test]
fn test_configure_status_overrides_activity_cascade() {
    let mut companion = companion();
    MessageBus::handle(
        &mut companion,
        &json!({"action": "configure", "payload": {
            "activity": "coding",
            "status": "Shipping",
            "message": "Working",
            "instant": true,
            "moodLevel": 12
        }}),
    );

    let state = companion.state();
    assert_eq!(state.current_mood, Mood::Focused);
    assert_eq!(state.current_activity.as_deref(), Some("coding"));
    assert_eq!(state.status_text, "Shipping");
    assert_eq!(state.energy_level, 12.0);
    assert_eq!(companion.display_text(), "Working");
}

#[test]
fn test_configure_identity() {
    let mut companion = companion();
    MessageBus::handle(
        &mut companion,
        &json!({"action": "configure", "payload": {"name": "Nova", "emoji": "🌟"}}),
    );

    assert_eq!(companion.identity().name, "Nova");
    assert_eq!(companion.identity().emoji, "🌟");
    assert_eq!(
        companion.drain_intents().last(),
        Some(&RenderIntent::Identity {
            name: "Nova".to_string(),
            emoji: "🌟".to_string(),
        })
    );
}

#[test]
fn test_say_and_set_activity_requests() {
    let mut companion = companion();
    MessageBus::handle(
        &mut companion,
        &json!({"action": "setActivity", "payload": {"activity": "coding", "message": "Hmm"}}),
    );
    assert_eq!(companion.state().current_activity.as_deref(), Some("coding"));
    assert_eq!(companion.state().status_text, "In the zone");
    assert_eq!(companion.state().current_mood, Mood::Speaking);
    companion.advance(Duration::from_secs(1));
    assert_eq!(companion.display_text(), "Hmm");

    MessageBus::handle(
        &mut companion,
        &json!({"action": "say", "payload": {"text": "Done!", "instant": true}}),
    );
    assert_eq!(companion.display_text(), "Done!");
}

#[test]
fn test_null_instant_animates() {
    let mut companion = companion();
    MessageBus::handle(
        &mut companion,
        &json!({"action": "say", "payload": {"text": "yo", "instant": null}}),
    );
    assert_eq!(companion.display_text(), "y");
    assert_eq!(companion.state().current_mood, Mood::Speaking);

    MessageBus::handle(
        &mut companion,
        &json!({"action": "configure", "payload": {"message": "done", "instant": null}}),
    );
    companion.advance(Duration::from_secs(1));
    assert_eq!(companion.display_text(), "done");
}

#[test]
fn test_user_message_request_starts_conversation() {
    let mut companion = companion();
    MessageBus::handle(&mut companion, &json!({"action": "userMessage", "payload": "hello"}));

    assert_eq!(companion.history().len(), 1);
    assert_eq!(companion.state().current_mood, Mood::Thinking);

    // No handler: a canned line answers after the pre-reply delay
    companion.advance(Duration::from_secs(10));
    assert_eq!(companion.history().len(), 2);
}

#[test]
fn test_observers_receive_events() {
    let mut companion = companion();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let moods = Arc::clone(&seen);
    companion.subscribe(EventKind::MoodChanged, move |event| {
        if let CompanionEvent::MoodChanged { mood, .. } = event {
            moods.lock().push(format!("mood:{mood}"));
        }
    });
    let activities = Arc::clone(&seen);
    companion.subscribe(EventKind::ActivityChanged, move |event| {
        if let CompanionEvent::ActivityChanged { activity, mood, message } = event {
            activities
                .lock()
                .push(format!("activity:{activity}:{mood}:{}", message.as_deref().unwrap_or("-")));
        }
    });

    MessageBus::handle(&mut companion, &json!({"action": "setMood", "payload": "happy"}));
    MessageBus::handle(
        &mut companion,
        &json!({"action": "setActivity", "payload": {"activity": "Searching"}}),
    );

    assert_eq!(
        *seen.lock(),
        vec![
            "mood:happy".to_string(),
            "mood:curious".to_string(),
            "activity:Searching:curious:-".to_string(),
        ]
    );
}

#[test]
fn test_unsubscribed_observer_is_silent() {
    let mut companion = companion();
    let count = Arc::new(Mutex::new(0_usize));

    let counter = Arc::clone(&count);
    let token = companion.subscribe(EventKind::MoodChanged, move |_| *counter.lock() += 1);
    companion.set_mood_to(Mood::Happy, false);
    assert!(companion.unsubscribe(token));
    assert!(!companion.unsubscribe(token));
    companion.set_mood_to(Mood::Love, false);

    assert_eq!(*count.lock(), 1);
}

#[test]
fn test_energy_intent_carries_tier() {
    let mut companion = companion();
    MessageBus::handle(&mut companion, &json!({"action": "setMoodLevel", "payload": 20}));

    let intents = companion.drain_intents();
    assert_eq!(
        serde_json::to_value(&intents[0]).unwrap(),
        json!({"intent": "energyBar", "level": 20.0, "tier": "low"})
    );
}
