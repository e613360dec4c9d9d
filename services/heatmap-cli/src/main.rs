//! Fourwings heatmap command-line host.
//!
//! Drives the heatmap layer against a 4wings tile endpoint:
//! - `render`: fetch a viewport, settle the color domain, print a report
//! - `chunk`: print the interval and buffered chunk of a time range
//! - `frames`: print the frame window of a time range
//!
//! All reports are written to stdout as JSON; logs go to stderr.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fourwings_common::time::parse_iso8601;
use fourwings_common::{BoundingBox, TimeRange};
use serde::Serialize;
use tile_fetcher::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use commands::{chunk_report, frames_report, render, RenderRequest};
use config::HeatmapConfig;

#[derive(Parser, Debug)]
#[command(name = "heatmap-cli")]
#[command(about = "Fourwings temporal heatmap tile engine")]
struct Args {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a viewport and report the settled color domain
    Render {
        /// Layer configuration file
        #[arg(short, long, env = "HEATMAP_CONFIG", default_value = "config/heatmap.yaml")]
        config: PathBuf,

        /// Range start (ISO 8601)
        #[arg(long)]
        start: String,

        /// Range end (ISO 8601, exclusive)
        #[arg(long)]
        end: String,

        /// Viewport zoom
        #[arg(short, long, default_value = "2")]
        zoom: f64,

        /// Viewport bounds as west,south,east,north
        #[arg(long, allow_hyphen_values = true, default_value = "-180,-85.0511,180,85.0511")]
        bbox: String,

        /// Tiles URL template overriding the configured ones
        #[arg(long, env = "FOURWINGS_TILES_URL")]
        tiles_url: Option<String>,
    },

    /// Print the interval and chunk of a time range
    Chunk {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Clock used to clamp the chunk end (default: now)
        #[arg(long)]
        now: Option<String>,
    },

    /// Print the frame window of a time range
    Frames {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Frame origin (default: the range's chunk buffered start)
        #[arg(long)]
        buffered_start: Option<String>,

        #[arg(long)]
        now: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Render {
            config,
            start,
            end,
            zoom,
            bbox,
            tiles_url,
        } => {
            let config = HeatmapConfig::load(&config)?.with_tiles_url(tiles_url);
            config.validate()?;
            let request = RenderRequest {
                range: TimeRange::parse(&start, &end)?,
                zoom,
                bbox: BoundingBox::from_bbox_string(&bbox)?,
            };

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    trigger.cancel();
                }
            });

            print_json(&render(config, request, cancel).await?)
        }
        Command::Chunk { start, end, now } => {
            let range = TimeRange::parse(&start, &end)?;
            print_json(&chunk_report(range, parse_now(now.as_deref())?))
        }
        Command::Frames {
            start,
            end,
            buffered_start,
            now,
        } => {
            let range = TimeRange::parse(&start, &end)?;
            let buffered_start = buffered_start.as_deref().map(parse_iso8601).transpose()?;
            print_json(&frames_report(range, buffered_start, parse_now(now.as_deref())?))
        }
    }
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    Ok(now.map(parse_iso8601).transpose()?.unwrap_or_else(Utc::now))
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
