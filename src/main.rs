//! rfbridge - remote-display output backend
//!
//! Bridges a compositor repaint loop with a VNC-style protocol engine.
//! The `soak` subcommand runs the whole bridge against the built-in
//! simulated engine and test-card renderer:
//!
//! ```text
//! RUST_LOG=debug rfbridge soak --frames 1200
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use rfbridge::config::OutputConfig;
use rfbridge::sim;

#[derive(Parser)]
#[command(name = "rfbridge")]
#[command(about = "Remote-display output backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exercise the bridge against the simulated protocol engine
    Soak {
        /// Output width in pixels
        #[arg(long, default_value_t = 1024)]
        width: u32,

        /// Output height in pixels
        #[arg(long, default_value_t = 640)]
        height: u32,

        /// Listen address handed to the protocol engine
        #[arg(long, default_value = "localhost")]
        listen: String,

        /// Listen port handed to the protocol engine
        #[arg(long, default_value_t = 5900)]
        port: u16,

        /// Frames to run before exiting
        #[arg(long, default_value_t = 600)]
        frames: u64,

        /// Completion pacing tick in milliseconds
        #[arg(long, default_value_t = 40)]
        pacing_ms: u64,

        /// Stall threshold in milliseconds
        #[arg(long, default_value_t = 500)]
        stall_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Soak {
            width,
            height,
            listen,
            port,
            frames,
            pacing_ms,
            stall_ms,
        } => {
            let config = OutputConfig {
                width,
                height,
                listen,
                port,
                pacing_interval: Duration::from_millis(pacing_ms),
                stall_threshold: Duration::from_millis(stall_ms),
                ..OutputConfig::default()
            };
            sim::run_soak(config, frames).await
        }
    }
}
