//! Console REPL Example
//!
//! An interactive Conch console with a few sample commands:
//!
//! - `add <a> [b]` - a free function with an optional parameter
//! - `difficulty [value]` - a static member, read or written
//! - `health [value]` / `heal <amount>` - run on every live `Player`
//! - the option commands from `conch-options` (`changeoption`, `applyoptions`, ...)
//! - the built-in commands (`help`, `echo`, `clear`, `exit`, ...)
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-repl
//! cargo run --package console-repl -- --script commands.txt
//! CONCH_CONSOLE__LOG_RETURN_VALUES=false cargo run --package console-repl
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use conch::prelude::*;
use conch_options::{OptionsStore, register_options};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "console-repl", about = "An interactive Conch console")]
struct Args {
    /// Configuration file; otherwise `conch.toml` is searched for.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (`development`, `production`, ...).
    #[arg(short, long)]
    profile: Option<String>,

    /// Run the lines of this file instead of reading standard input.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Where `applyoptions` saves options.
    #[arg(long, default_value = "options.json")]
    options: PathBuf,
}

// ============================================================================
// Sample commands
// ============================================================================

static DIFFICULTY: AtomicI32 = AtomicI32::new(1);

struct Player {
    health: AtomicI32,
}

impl Player {
    fn new(health: i32) -> Self {
        Self {
            health: AtomicI32::new(health),
        }
    }
}

#[distributed_slice(COMMAND_REGISTRATIONS)]
#[linkme(crate = conch::linkme)]
static REGISTER_SAMPLES: fn(&mut CommandRegistry) = register_samples;

fn add(a: i32, b: Option<i32>) -> i32 {
    a + b.unwrap_or(1)
}

fn register_samples(registry: &mut CommandRegistry) {
    registry
        .add_target(
            CommandTarget::function("add", add)
                .alias("sum")
                .description("Adds two numbers; the second defaults to 1."),
        )
        .add_target(
            CommandTarget::static_member(
                "difficulty",
                || DIFFICULTY.load(Ordering::SeqCst),
                |value: i32| DIFFICULTY.store(value, Ordering::SeqCst),
            )
            .description("Gets or sets the difficulty level."),
        )
        .add_target(
            CommandTarget::instance_member(
                "health",
                |p: &Player| p.health.load(Ordering::SeqCst),
                |p: &Player, value: i32| p.health.store(value, Ordering::SeqCst),
            )
            .description("Gets or sets the health of every player."),
        )
        .add_target(
            CommandTarget::method("heal", |p: &Player, amount: i32| {
                p.health.fetch_add(amount, Ordering::SeqCst) + amount
            })
            .description("Heals every player."),
        );
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ConsoleRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile.clone());
    }
    let mut runtime = builder.build().context("failed to start the console")?;

    runtime
        .instances()
        .register_labeled(Arc::new(Player::new(100)), "player one");
    runtime
        .instances()
        .register_labeled(Arc::new(Player::new(80)), "player two");

    let store = OptionsStore::with_save_path(&args.options);
    store
        .define("volume", 80_i32)
        .define("fullscreen", false)
        .define("nickname", "player");
    if let Err(e) = store.revert() {
        warn!(error = %e, "could not load saved options, using defaults");
    }
    register_options(runtime.session_mut().registry_mut(), &store);

    let stats = match &args.script {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read script {}", path.display()))?;
            let mut source = ScriptSource::from_script(&text);
            runtime.run_with(&mut source, tokio::io::stdout()).await?
        }
        None => runtime.run().await?,
    };

    info!(
        lines = stats.lines,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "console closed"
    );
    Ok(())
}
