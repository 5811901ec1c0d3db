//! Companion Host - Drive a Companion over stdin/stdout
//!
//! Reads `{"action": ..., "payload": ...}` requests from stdin, one JSON
//! object per line, and writes render intents and observer events to stdout
//! as JSON lines. Logs go to stderr so stdout stays machine-readable.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! companion-host
//!
//! # Custom identity and a faster typist
//! companion-host --name Nova --emoji 🌟 --typing-speed-ms 20
//!
//! # Answer user messages with an echo handler
//! echo '{"action":"userMessage","payload":"hi"}' | companion-host --echo
//!
//! # Verbose logging
//! RUST_LOG=debug companion-host
//! ```
//!
//! # Lifecycle
//!
//! - End of input: finish typing and pending replies, then exit
//! - `SIGINT`: stop immediately

mod stdio;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use companion_core::{
    format_uptime, handler_fn, load_config_from_path, Companion, CompanionConfig,
    CompanionRuntime, ConfigOverrides, RuntimeSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use stdio::{parse_line, StdoutSink};

/// Companion Host - JSON-lines driver for the desktop companion
#[derive(Parser, Debug)]
#[command(name = "companion-host")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "COMPANION_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Display name
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Title emoji
    #[arg(short = 'e', long)]
    emoji: Option<String>,

    /// Milliseconds per revealed character
    #[arg(long, value_name = "MS")]
    typing_speed_ms: Option<u64>,

    /// Enable ambient idle behavior
    #[arg(long)]
    idle_behavior: bool,

    /// Reply to user messages by echoing them
    #[arg(long)]
    echo: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "COMPANION_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref name) = self.name {
            overrides = overrides.with_name(name.clone());
        }
        if let Some(ref emoji) = self.emoji {
            overrides = overrides.with_emoji(emoji.clone());
        }
        if let Some(ms) = self.typing_speed_ms {
            overrides = overrides.with_typing_speed_ms(ms);
        }
        if self.idle_behavior {
            overrides = overrides.with_idle_behavior(true);
        }
        overrides
    }
}

/// Initialize logging to stderr with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("companion_host={level},companion_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Resolve configuration: file and environment, then CLI flags
fn resolve_config(args: &Args) -> Result<CompanionConfig> {
    let path = args
        .config
        .clone()
        .or_else(companion_core::default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_companion(config: &CompanionConfig, echo: bool) -> Companion {
    let mut companion = Companion::new(config);
    if echo {
        companion.set_message_handler(handler_fn(|text, _history| async move {
            Ok::<_, anyhow::Error>(format!("You said: {text}"))
        }));
    }
    companion.start();
    companion
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(
        name = %config.name,
        source = %config.source(),
        idle = config.idle_behavior,
        "Companion host starting"
    );

    let companion = build_companion(&config, args.echo);
    let (runtime, handle) =
        CompanionRuntime::new(companion, StdoutSink, RuntimeSettings::from_config(&config));
    let mut task = runtime.spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let companion = loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        let Some(value) = parse_line(&line) else {
                            continue;
                        };
                        if handle.send(value).await.is_err() {
                            warn!("Companion runtime stopped unexpectedly");
                        }
                    }
                    None => {
                        info!("Input closed, finishing pending work");
                        input_open = false;
                        let _ = handle.drain().await;
                    }
                }
            }

            joined = &mut task => {
                break joined.context("Companion runtime task failed")?;
            }

            _ = &mut ctrl_c => {
                info!("Received SIGINT, shutting down");
                let _ = handle.shutdown().await;
                break (&mut task).await.context("Companion runtime task failed")?;
            }
        }
    };

    info!(
        uptime = %format_uptime(companion.uptime()),
        messages = companion.history().len(),
        "Companion host stopped"
    );
    Ok(())
}
