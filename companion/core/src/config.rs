//! TOML Configuration File Support
//!
//! Configuration loading for a companion, supporting a TOML file at
//! `~/.config/companion/companion.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`COMPANION_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/companion/companion.toml` (typically `~/.config/companion/companion.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [identity]
//! name = "Riley"
//! emoji = "⚡"
//!
//! [startup]
//! default_mood = "idle"
//! default_message = "Hey! Good to see you ⚡"
//! status = "Online"
//! energy_level = 75
//!
//! [typing]
//! speed_ms = 50
//! grace_delay_ms = 500
//!
//! [conversation]
//! pre_reply_delay_ms = 600
//! fallback_message = "Oops, my circuits got tangled. Can you try that again?"
//! canned_responses = ["Interesting! Tell me more.", "Hmm, good question!"]
//!
//! [idle]
//! enabled = true
//! min_interval_secs = 30
//! max_interval_secs = 60
//! messages = ["Just vibing ⚡", "*boop*"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{DEFAULT_FALLBACK_MESSAGE, DEFAULT_PRE_REPLY_DELAY};
use crate::mood::Mood;
use crate::typing::{DEFAULT_GRACE_DELAY, DEFAULT_TYPING_SPEED};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Identity section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityToml {
    /// Display name
    pub name: Option<String>,

    /// Title emoji
    pub emoji: Option<String>,
}

/// Startup section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupToml {
    /// Mood shown at startup
    pub default_mood: Option<String>,

    /// Line shown (instantly) at startup
    pub default_message: Option<String>,

    /// Initial status text
    pub status: Option<String>,

    /// Initial energy level
    pub energy_level: Option<f64>,
}

/// Typing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingToml {
    /// Pause between characters in milliseconds
    pub speed_ms: Option<u64>,

    /// Pause after a reveal before the mood relaxes, in milliseconds
    pub grace_delay_ms: Option<u64>,
}

/// Conversation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationToml {
    /// Pause before a reply starts, in milliseconds
    pub pre_reply_delay_ms: Option<u64>,

    /// Line revealed when the reply handler fails
    pub fallback_message: Option<String>,

    /// Replies used when no handler is registered
    pub canned_responses: Option<Vec<String>>,
}

/// Idle behavior section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleToml {
    /// Whether idle nudges run
    pub enabled: Option<bool>,

    /// Shortest pause between nudges in seconds
    pub min_interval_secs: Option<u64>,

    /// Longest pause between nudges in seconds
    pub max_interval_secs: Option<u64>,

    /// Lines the companion may say when idle
    pub messages: Option<Vec<String>>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    /// Identity section
    pub identity: IdentityToml,

    /// Startup section
    pub startup: StartupToml,

    /// Typing section
    pub typing: TypingToml,

    /// Conversation section
    pub conversation: ConversationToml,

    /// Idle behavior section
    pub idle: IdleToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for a companion
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    /// Display name
    pub name: String,

    /// Title emoji
    pub emoji: String,

    /// Mood shown at startup
    pub default_mood: Mood,

    /// Line shown instantly at startup
    pub default_message: String,

    /// Initial status text
    pub initial_status: String,

    /// Initial energy level
    pub initial_energy: f64,

    /// Pause between revealed characters
    pub typing_speed: Duration,

    /// Pause after a reveal before the mood relaxes to idle
    pub grace_delay: Duration,

    /// Pause between a user message and the reply starting
    pub pre_reply_delay: Duration,

    /// Line revealed when the reply handler fails
    pub fallback_message: String,

    /// Replies used when no handler is registered
    pub canned_responses: Vec<String>,

    /// Whether the runtime performs idle nudges
    pub idle_behavior: bool,

    /// Shortest pause between idle nudges
    pub idle_interval_min: Duration,

    /// Longest pause between idle nudges
    pub idle_interval_max: Duration,

    /// Lines the companion may say when idle
    pub idle_messages: Vec<String>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

/// Replies used when no handler is registered
#[must_use]
pub fn default_canned_responses() -> Vec<String> {
    [
        "Interesting! Tell me more.",
        "Hmm, good question!",
        "I hear you ⚡",
        "Ooh, I like where this is going.",
        "Got it! Anything else?",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Lines the companion may say when idle
#[must_use]
pub fn default_idle_messages() -> Vec<String> {
    [
        "What's on your mind?",
        "I'm here if you need me",
        "Nice day, isn't it?",
        "Just vibing ⚡",
        "*boop*",
        "🎵",
        "...",
        "Thinking about stuff",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            name: "Riley".to_string(),
            emoji: "⚡".to_string(),
            default_mood: Mood::Idle,
            default_message: "Hey! Good to see you ⚡".to_string(),
            initial_status: "Online".to_string(),
            initial_energy: 75.0,
            typing_speed: DEFAULT_TYPING_SPEED,
            grace_delay: DEFAULT_GRACE_DELAY,
            pre_reply_delay: DEFAULT_PRE_REPLY_DELAY,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            canned_responses: default_canned_responses(),
            idle_behavior: false,
            idle_interval_min: Duration::from_secs(30),
            idle_interval_max: Duration::from_secs(60),
            idle_messages: default_idle_messages(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CompanionConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the idle interval bounds
    /// are inverted or the initial energy level is not a number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_interval_min > self.idle_interval_max {
            return Err(ConfigError::ValidationError(format!(
                "idle interval min ({}s) exceeds max ({}s)",
                self.idle_interval_min.as_secs(),
                self.idle_interval_max.as_secs()
            )));
        }
        if self.initial_energy.is_nan() {
            return Err(ConfigError::ValidationError(
                "initial energy level is NaN".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/companion/companion.toml` or
/// `~/.config/companion/companion.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("companion").join("companion.toml"))
}

/// Load configuration from all sources with proper priority
///
/// CLI overrides are not handled here; apply [`ConfigOverrides`] afterwards.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<CompanionConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// holds invalid values.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CompanionConfig, ConfigError> {
    let mut config = CompanionConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: CompanionToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(
    config: &mut CompanionConfig,
    toml: &CompanionToml,
) -> Result<(), ConfigError> {
    // Identity
    if let Some(ref name) = toml.identity.name {
        config.name.clone_from(name);
    }
    if let Some(ref emoji) = toml.identity.emoji {
        config.emoji.clone_from(emoji);
    }

    // Startup
    if let Some(ref mood) = toml.startup.default_mood {
        config.default_mood = mood
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("startup.default_mood: {e}")))?;
    }
    if let Some(ref message) = toml.startup.default_message {
        config.default_message.clone_from(message);
    }
    if let Some(ref status) = toml.startup.status {
        config.initial_status.clone_from(status);
    }
    if let Some(level) = toml.startup.energy_level {
        config.initial_energy = level;
    }

    // Typing
    if let Some(ms) = toml.typing.speed_ms {
        config.typing_speed = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.typing.grace_delay_ms {
        config.grace_delay = Duration::from_millis(ms);
    }

    // Conversation
    if let Some(ms) = toml.conversation.pre_reply_delay_ms {
        config.pre_reply_delay = Duration::from_millis(ms);
    }
    if let Some(ref fallback) = toml.conversation.fallback_message {
        config.fallback_message.clone_from(fallback);
    }
    if let Some(ref responses) = toml.conversation.canned_responses {
        config.canned_responses.clone_from(responses);
    }

    // Idle
    if let Some(enabled) = toml.idle.enabled {
        config.idle_behavior = enabled;
    }
    if let Some(secs) = toml.idle.min_interval_secs {
        config.idle_interval_min = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.idle.max_interval_secs {
        config.idle_interval_max = Duration::from_secs(secs);
    }
    if let Some(ref messages) = toml.idle.messages {
        config.idle_messages.clone_from(messages);
    }

    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut CompanionConfig) {
    apply_env_from(config, |key| std::env::var(key).ok());
}

/// Apply `COMPANION_*` overrides read through `lookup`
fn apply_env_from<F>(config: &mut CompanionConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup("COMPANION_NAME") {
        config.name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(emoji) = lookup("COMPANION_EMOJI") {
        config.emoji = emoji;
        config.source = ConfigSource::Env;
    }
    if let Some(speed) = lookup("COMPANION_TYPING_SPEED_MS") {
        if let Ok(ms) = speed.parse::<u64>() {
            config.typing_speed = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(grace) = lookup("COMPANION_GRACE_DELAY_MS") {
        if let Ok(ms) = grace.parse::<u64>() {
            config.grace_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(delay) = lookup("COMPANION_PRE_REPLY_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.pre_reply_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(enabled) = lookup("COMPANION_IDLE_BEHAVIOR") {
        config.idle_behavior = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Display name override
    pub name: Option<String>,

    /// Title emoji override
    pub emoji: Option<String>,

    /// Typing speed override (milliseconds)
    pub typing_speed_ms: Option<u64>,

    /// Idle behavior override
    pub idle_behavior: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set display name override
    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Set title emoji override
    #[must_use]
    pub fn with_emoji(mut self, emoji: String) -> Self {
        self.emoji = Some(emoji);
        self
    }

    /// Set typing speed override
    #[must_use]
    pub fn with_typing_speed_ms(mut self, ms: u64) -> Self {
        self.typing_speed_ms = Some(ms);
        self
    }

    /// Set idle behavior override
    #[must_use]
    pub fn with_idle_behavior(mut self, enabled: bool) -> Self {
        self.idle_behavior = Some(enabled);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut CompanionConfig) {
        if self.name.is_some()
            || self.emoji.is_some()
            || self.typing_speed_ms.is_some()
            || self.idle_behavior.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref name) = self.name {
            config.name.clone_from(name);
        }
        if let Some(ref emoji) = self.emoji {
            config.emoji.clone_from(emoji);
        }
        if let Some(ms) = self.typing_speed_ms {
            config.typing_speed = Duration::from_millis(ms);
        }
        if let Some(enabled) = self.idle_behavior {
            config.idle_behavior = enabled;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_toml(content: &str) -> Result<CompanionConfig, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config_from_path(Some(file.path().to_path_buf()))
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = CompanionConfig::default();

        assert_eq!(config.name, "Riley");
        assert_eq!(config.emoji, "⚡");
        assert_eq!(config.default_mood, Mood::Idle);
        assert_eq!(config.default_message, "Hey! Good to see you ⚡");
        assert_eq!(config.initial_status, "Online");
        assert_eq!(config.initial_energy, 75.0);
        assert_eq!(config.typing_speed, Duration::from_millis(50));
        assert_eq!(config.grace_delay, Duration::from_millis(500));
        assert_eq!(config.pre_reply_delay, Duration::from_millis(600));
        assert!(!config.idle_behavior);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("companion"));
            assert!(p.to_string_lossy().ends_with("companion.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let config = load_toml(
            r#"
[identity]
name = "Nova"
emoji = "🌟"

[startup]
default_mood = "happy"
status = "Ready"
energy_level = 40

[typing]
speed_ms = 20
grace_delay_ms = 250

[conversation]
pre_reply_delay_ms = 100
canned_responses = ["ok"]

[idle]
enabled = true
min_interval_secs = 5
max_interval_secs = 10
"#,
        )
        .unwrap();

        assert_eq!(config.name, "Nova");
        assert_eq!(config.emoji, "🌟");
        assert_eq!(config.default_mood, Mood::Happy);
        assert_eq!(config.initial_status, "Ready");
        assert_eq!(config.initial_energy, 40.0);
        assert_eq!(config.typing_speed, Duration::from_millis(20));
        assert_eq!(config.grace_delay, Duration::from_millis(250));
        assert_eq!(config.pre_reply_delay, Duration::from_millis(100));
        assert_eq!(config.canned_responses, vec!["ok".to_string()]);
        assert!(config.idle_behavior);
        assert_eq!(config.idle_interval_min, Duration::from_secs(5));
        assert!(config.config_file_path.is_some());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = load_toml("[typing]\nspeed_ms = 10\n").unwrap();
        assert_eq!(config.typing_speed, Duration::from_millis(10));
        assert_eq!(config.grace_delay, Duration::from_millis(500));
        assert_eq!(config.name, "Riley");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = load_toml("[typing\nspeed_ms = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_default_mood_is_rejected() {
        let result = load_toml("[startup]\ndefault_mood = \"grumpy\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_inverted_idle_interval_is_rejected() {
        let result = load_toml("[idle]\nmin_interval_secs = 90\nmax_interval_secs = 10\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/companion.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
    }

    // =========================================================================
    // Environment & CLI
    // =========================================================================

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COMPANION_NAME", "Echo"),
            ("COMPANION_TYPING_SPEED_MS", "5"),
            ("COMPANION_GRACE_DELAY_MS", "not-a-number"),
            ("COMPANION_IDLE_BEHAVIOR", "true"),
        ]
        .into_iter()
        .collect();
        let mut config = CompanionConfig::default();

        apply_env_from(&mut config, |key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.name, "Echo");
        assert_eq!(config.typing_speed, Duration::from_millis(5));
        assert_eq!(config.grace_delay, Duration::from_millis(500));
        assert!(config.idle_behavior);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_idle_behavior_false() {
        let mut config = CompanionConfig::default();
        config.idle_behavior = true;
        apply_env_from(&mut config, |key| {
            (key == "COMPANION_IDLE_BEHAVIOR").then(|| "0".to_string())
        });
        assert!(!config.idle_behavior);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new()
            .with_name("Zed".to_string())
            .with_typing_speed_ms(0)
            .with_idle_behavior(true)
            .apply(&mut config);

        assert_eq!(config.name, "Zed");
        assert_eq!(config.emoji, "⚡");
        assert_eq!(config.typing_speed, Duration::ZERO);
        assert!(config.idle_behavior);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }
}
