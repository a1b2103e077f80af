//! # Prayer Arc Application Entry Point
//!
//! This binary crate wires the engine to its collaborators: configuration,
//! the prayer-time API, the location provider and the terminal renderer.
//!
//! ## Modes
//! - default: run continuously, redrawing every tick and refreshing times in the background
//! - `--once`: fetch (unless offline), render a single frame and exit
//! - `--offline`: never touch the network; use the built-in schedule
//! - `--config <path>`: read configuration from `<path>` instead of `prayer-config.toml`

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::Local;
use prayer_arc_lib::{
    config::Config,
    location::{LocationFix, LocationProvider, StaticLocation},
    prayer_api::PrayerApi,
    renderer::{draw_ascii, AsciiSink},
    shell::{FetchOutcome, Shell, ShellState},
};
use std::env;
use std::sync::Arc;
use std::time::Instant;

/// Parsed command line flags
#[derive(Debug, Default, PartialEq)]
struct Args {
    once: bool,
    offline: bool,
    config_path: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut parsed = Args::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--once" | "--stdout" => parsed.once = true,
            "--offline" => parsed.offline = true,
            "--config" => parsed.config_path = iter.next(),
            other => log::warn!("Ignoring unknown argument: {}", other),
        }
    }
    parsed
}

/// Fetch once for the configured (or fallback) location, print one frame.
async fn render_once(config: &Config, api: Option<PrayerApi>) -> anyhow::Result<()> {
    let mut state = ShellState::default();
    let provider = StaticLocation::new(config.location.coordinates());

    let coords = match provider.current() {
        LocationFix::Available(coords) => {
            state.on_location(coords, Instant::now());
            coords
        }
        LocationFix::Denied | LocationFix::Unavailable => {
            state.on_location_timeout(config.location.fallback);
            config.location.fallback
        }
    };

    if let Some(api) = api {
        let generation = state.begin_fetch();
        let result = api.fetch(coords).await;
        state.apply_fetch(
            FetchOutcome {
                generation,
                coords,
                result,
            },
            Local::now().naive_local(),
            Instant::now(),
        );
    }

    let frame = state.frame(Local::now().naive_local(), &config.display.arc);
    draw_ascii(&frame, &config.display.arc);
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args().skip(1));
    let config = match &args.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    let api = if args.offline {
        log::info!("Offline mode: using built-in prayer times");
        None
    } else {
        Some(PrayerApi::new(&config.api).context("build HTTP client")?)
    };

    let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;

    if args.once {
        return rt.block_on(render_once(&config, api));
    }

    let provider: Arc<dyn LocationProvider> =
        Arc::new(StaticLocation::new(config.location.coordinates()));
    let sink = AsciiSink {
        ellipse: config.display.arc,
    };
    let shell = Shell::new(config, api, sink);
    rt.block_on(shell.run(provider));

    Ok(())
}
