//! Companion Core - Headless Mood & Chat Engine for an On-Screen Companion
//!
//! This crate provides the logic behind an animated desktop companion whose
//! mood and speech bubble reflect what a driving agent is doing. It is
//! completely independent of any UI framework: it emits render intents that
//! a terminal, web page, native window or test recorder applies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Host / Surface                          │
//! │   {action, payload} JSON        programmatic API      RenderSink │
//! └───────────┬─────────────────────────┬────────────────────▲───────┘
//!             │                         │                    │
//! ┌───────────┼─────────────────────────┼────────────────────┼───────┐
//! │           ▼              COMPANION CORE                  │       │
//! │     ┌────────────┐      ┌─────────────────────────────┐  │       │
//! │     │ MessageBus │ ───► │          Companion          │ ─┘       │
//! │     └────────────┘      │  ┌──────────────┐           │ intents  │
//! │                         │  │ Conversation │           │          │
//! │                         │  └──────┬───────┘           │          │
//! │                         │  ┌──────▼──────────┐        │          │
//! │                         │  │ TypingScheduler │        │          │
//! │                         │  └──────┬──────────┘        │          │
//! │                         │  ┌──────▼─────────┐         │          │
//! │                         │  │ MoodController │──► observers       │
//! │                         │  └──────┬─────────┘         │          │
//! │                         │  ActivityMapper, MoodRegistry          │
//! │                         │  Timeline (virtual ms)      │          │
//! │                         └─────────────────────────────┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Companion`]: One complete companion instance and its programmatic API
//! - [`MessageBus`]: Dispatcher for inbound `{action, payload}` requests
//! - [`RenderIntent`]: Declarative UI updates emitted by the core
//! - [`CompanionEvent`]: Notifications delivered to observers
//! - [`CompanionRuntime`]: tokio driver mapping wall-clock time onto a companion
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use companion_core::{Companion, CompanionConfig};
//!
//! let mut companion = Companion::new(&CompanionConfig::default());
//! companion.start();
//! companion.set_activity("coding", Some("On it..."));
//! companion.advance(Duration::from_secs(1));
//!
//! assert_eq!(companion.display_text(), "On it...");
//! for intent in companion.drain_intents() {
//!     // apply to a surface
//!     let _ = intent;
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`mood`]: Mood catalog and registry
//! - [`activity`]: Activity label to mood mapping and shortcuts
//! - [`controller`]: Mood, status, energy and activity transitions
//! - [`typing`]: Character-by-character reveal sessions
//! - [`conversation`]: Message history and the reply flow
//! - [`handler`]: Pluggable async reply handlers
//! - [`bus`]: Inbound structured message protocol
//! - [`events`]: Observer notifications
//! - [`render`]: Render intents and sinks
//! - [`timeline`]: Virtual-time timer queue
//! - [`config`]: TOML, environment and CLI configuration
//! - [`runtime`]: tokio event loop
//!
//! # Ownership
//!
//! The mood controller, typing scheduler and conversation are internal
//! collaborators of [`Companion`]. Hosts drive them through `Companion`
//! methods and read them through its getters; they cannot be built or
//! mutated on their own.
//!
//! ```compile_fail
//! let _ = companion_core::controller::MoodController::default();
//! ```
//!
//! ```compile_fail
//! let _ = companion_core::typing::TypingScheduler::default();
//! ```
//!
//! # No UI Dependencies
//!
//! Nothing here draws. The core is pure state plus intents and can run
//! headless for tests and automation.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activity;
pub mod bus;
pub mod companion;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handler;
pub mod mood;
pub mod render;
pub mod runtime;
pub mod timeline;
pub mod typing;

pub(crate) use companion::TimerTask;

// Re-exports for convenience
pub use activity::{ActivityMapper, ActivityShortcut, DEFAULT_ACTIVITY_MOOD};
pub use bus::{ActivityPayload, BusRequest, ConfigurePayload, Dispatch, MessageBus, SayPayload};
pub use companion::{
    format_uptime, Companion, CompanionId, IdleAction, Identity, IDLE_FLASH_DURATION,
};
pub use controller::{CompanionState, EnergyTier};
pub use conversation::{
    Message, MessageId, Sender, DEFAULT_FALLBACK_MESSAGE, DEFAULT_PRE_REPLY_DELAY,
};
pub use error::{RuntimeClosed, UnknownMoodError};
pub use events::{CompanionEvent, EventKind, EventObserver, ObserverRegistry, SubscriptionToken};
pub use handler::{handler_fn, FnHandler, MessageHandler, PendingReply, ReplyId};
pub use mood::{IndicatorCategory, Mood, MoodMeta, MoodRegistry};
pub use render::{NullSink, Output, RecordingSink, RenderIntent, RenderSink};
pub use runtime::{CompanionHandle, CompanionRuntime, RuntimeCommand, RuntimeSettings};
pub use timeline::Timeline;
pub use typing::{CancelFlag, SessionId, TypingState};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, CompanionConfig, CompanionToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
