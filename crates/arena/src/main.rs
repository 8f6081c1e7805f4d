//! Arena
//!
//! Entry point for the match coordination server. Hosts the WebSocket
//! endpoint players connect to and the read-only HTTP endpoint.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use arena_server::{ArenaContext, HttpServer, WebSocketServer};
use clap::{Parser, ValueEnum};
use match_core::{Mode, Puzzle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::ArenaConfig;

/// Default match mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// 1 vs 1
    Duel,
    /// 2 vs 2
    Squad,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Duel => Mode::Duel,
            ModeArg::Squad => Mode::Squad,
        }
    }
}

/// Scramble family
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PuzzleArg {
    #[value(name = "2x2")]
    Cube2,
    #[value(name = "3x3")]
    Cube3,
    #[value(name = "4x4")]
    Cube4,
}

impl From<PuzzleArg> for Puzzle {
    fn from(arg: PuzzleArg) -> Self {
        match arg {
            PuzzleArg::Cube2 => Puzzle::Cube2,
            PuzzleArg::Cube3 => Puzzle::Cube3,
            PuzzleArg::Cube4 => Puzzle::Cube4,
        }
    }
}

/// Match coordination server
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(about = "Server-authoritative rooms for timed solve matches", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebSocket bind address
    #[arg(long)]
    ws_addr: Option<String>,

    /// HTTP bind address
    #[arg(long)]
    http_addr: Option<String>,

    /// Countdown tick interval in milliseconds
    #[arg(long)]
    prep_tick_ms: Option<u64>,

    /// Mode for sessions whose first joiner does not pick one
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Scramble family
    #[arg(long, value_enum)]
    puzzle: Option<PuzzleArg>,

    /// Keep participants seated when their connection drops
    #[arg(long)]
    keep_on_disconnect: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Config file (or defaults) with command line overrides applied
    fn resolve(&self) -> Result<ArenaConfig> {
        let mut config = match &self.config {
            Some(path) => ArenaConfig::load(path)?,
            None => ArenaConfig::default(),
        };
        if let Some(addr) = &self.ws_addr {
            config.ws_addr = addr.clone();
        }
        if let Some(addr) = &self.http_addr {
            config.http_addr = addr.clone();
        }
        if let Some(ms) = self.prep_tick_ms {
            config.runtime.prep_tick_ms = ms;
        }
        if let Some(mode) = self.mode {
            config.runtime.default_mode = mode.into();
        }
        if let Some(puzzle) = self.puzzle {
            config.runtime.rules.puzzle = puzzle.into();
        }
        if self.keep_on_disconnect {
            config.leave_on_disconnect = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.resolve()?;
    run(config).await
}

async fn run(config: ArenaConfig) -> Result<()> {
    let rules = &config.runtime.rules;
    tracing::info!("Starting arena");
    tracing::info!("  WebSocket: {}", config.ws_addr);
    tracing::info!("  HTTP: {}", config.http_addr);
    tracing::info!("  Default mode: {:?}", config.runtime.default_mode);
    tracing::info!(
        "  Rules: {} rounds, {}ms preparation, {:?} scrambles",
        rules.round_count,
        rules.prep_duration_ms,
        rules.puzzle
    );

    let context = Arc::new(ArenaContext::new(
        config.runtime.clone(),
        config.leave_on_disconnect,
    ));

    // Start HTTP server
    let http_context = context.clone();
    let http_addr = config.http_addr.clone();
    let http_server = tokio::spawn(async move {
        let server = HttpServer::new(http_context);
        if let Err(e) = server.run(&http_addr).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    // Start WebSocket server
    let ws_context = context.clone();
    let ws_addr = config.ws_addr.clone();
    let ws_server = tokio::spawn(async move {
        let server = WebSocketServer::new(ws_context);
        if let Err(e) = server.run(&ws_addr).await {
            tracing::error!("WebSocket server error: {}", e);
        }
    });

    tracing::info!("Arena running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    ws_server.abort();
    context.registry.shutdown().await;
    http_server.abort();

    tracing::info!("Arena stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "arena",
            "--ws-addr",
            "0.0.0.0:9000",
            "--mode",
            "squad",
            "--puzzle",
            "2x2",
            "--keep-on-disconnect",
        ]);
        let config = args.resolve().unwrap();
        assert_eq!(config.ws_addr, "0.0.0.0:9000");
        assert_eq!(config.http_addr, "127.0.0.1:9101");
        assert_eq!(config.runtime.default_mode, Mode::Squad);
        assert_eq!(config.runtime.rules.puzzle, Puzzle::Cube2);
        assert!(!config.leave_on_disconnect);
    }

    #[test]
    fn test_no_flags_gives_defaults() {
        let config = Args::parse_from(["arena"]).resolve().unwrap();
        assert_eq!(config, ArenaConfig::default());
    }
}
