//! Outbound Notifications
//!
//! Change notifications published by a companion to its observers.
//!
//! Each [`Companion`](crate::Companion) owns its own [`ObserverRegistry`], so
//! two companions in one process never see each other's events. Delivery is
//! synchronous and fire-and-forget: observers run in registration order on
//! the caller's stack and nothing they return is inspected.

use serde::Serialize;

use crate::mood::{Mood, MoodMeta};

// =============================================================================
// Events
// =============================================================================

/// Notification published by the mood controller
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CompanionEvent {
    /// The current mood changed
    MoodChanged {
        /// The new mood
        mood: Mood,
        /// Catalog metadata of the new mood
        metadata: MoodMeta,
    },

    /// An activity was applied
    ActivityChanged {
        /// Activity label exactly as supplied
        activity: String,
        /// Mood the activity resolved to
        mood: Mood,
        /// Line spoken alongside the activity, if any
        message: Option<String>,
    },
}

impl CompanionEvent {
    /// Kind used for subscription filtering
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MoodChanged { .. } => EventKind::MoodChanged,
            Self::ActivityChanged { .. } => EventKind::ActivityChanged,
        }
    }
}

/// Notification kinds an observer can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// [`CompanionEvent::MoodChanged`]
    MoodChanged,
    /// [`CompanionEvent::ActivityChanged`]
    ActivityChanged,
}

// =============================================================================
// Observer Registry
// =============================================================================

/// Handle returned by [`ObserverRegistry::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Observer callback type
pub type EventObserver = Box<dyn Fn(&CompanionEvent) + Send + Sync>;

struct Subscription {
    token: SubscriptionToken,
    kind: EventKind,
    observer: EventObserver,
}

/// Per-companion list of event observers
pub struct ObserverRegistry {
    next_token: u64,
    subscriptions: Vec<Subscription>,
}

impl ObserverRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: 0,
            subscriptions: Vec::new(),
        }
    }

    /// Register an observer for one event kind
    ///
    /// Observers are invoked in registration order.
    pub fn subscribe<F>(&mut self, kind: EventKind, observer: F) -> SubscriptionToken
    where
        F: Fn(&CompanionEvent) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.push(Subscription {
            token,
            kind,
            observer: Box::new(observer),
        });
        token
    }

    /// Remove an observer. Returns `false` if the token was not registered.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.token != token);
        self.subscriptions.len() != before
    }

    /// Deliver `event` to every observer of its kind
    pub fn notify(&self, event: &CompanionEvent) {
        let kind = event.kind();
        for sub in self.subscriptions.iter().filter(|sub| sub.kind == kind) {
            (sub.observer)(event);
        }
    }

    /// Number of registered observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Drop every observer
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observer_count", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn mood_event(mood: Mood) -> CompanionEvent {
        CompanionEvent::MoodChanged {
            mood,
            metadata: mood.meta(),
        }
    }

    #[test]
    fn test_notify_filters_by_kind() {
        let mut registry = ObserverRegistry::new();
        let mood_hits = Arc::new(AtomicUsize::new(0));
        let activity_hits = Arc::new(AtomicUsize::new(0));

        let m = Arc::clone(&mood_hits);
        registry.subscribe(EventKind::MoodChanged, move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        });
        let a = Arc::clone(&activity_hits);
        registry.subscribe(EventKind::ActivityChanged, move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&mood_event(Mood::Happy));
        registry.notify(&mood_event(Mood::Sleepy));

        assert_eq!(mood_hits.load(Ordering::SeqCst), 2);
        assert_eq!(activity_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut registry = ObserverRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let token = registry.subscribe(EventKind::MoodChanged, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.unsubscribe(token));
        assert!(!registry.unsubscribe(token));
        registry.notify(&mood_event(Mood::Happy));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = CompanionEvent::ActivityChanged {
            activity: "Coding".to_string(),
            mood: Mood::Focused,
            message: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "activityChanged");
        assert_eq!(json["activity"], "Coding");
        assert_eq!(json["mood"], "focused");
        assert!(json["message"].is_null());
    }
}
