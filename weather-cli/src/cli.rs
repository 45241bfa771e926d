use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::oneshot,
};
use tracing::{debug, warn};
use weather_core::{Config, Coordinate, FetchOutcome, UnitSystem, WeatherOrchestrator};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for your last known location")]
pub struct Cli {
    /// Log pipeline activity to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and default unit system.
    Configure,

    /// Record the device position and allow location access.
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Drop the recorded position and revoke location access.
    Forget,

    /// Fetch and print the current weather once.
    Show {
        /// "metric" or "imperial"; defaults to the configured unit system.
        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,
    },

    /// Keep the weather on screen and re-fetch on unit changes read from stdin.
    Watch {
        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,
    },
}

fn parse_units(s: &str) -> Result<UnitSystem, String> {
    UnitSystem::try_from(s).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Locate { lat, lon } => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    bail!("Coordinates out of range: lat must be in [-90, 90], lon in [-180, 180]");
                }
                let mut cfg = Config::load()?;
                cfg.record_fix(Coordinate::new(lat, lon));
                cfg.save()?;
                println!("Recorded location {}", Coordinate::new(lat, lon));
                Ok(())
            }
            Command::Forget => {
                let mut cfg = Config::load()?;
                cfg.forget_location();
                cfg.save()?;
                println!("Location forgotten; location access revoked");
                Ok(())
            }
            Command::Show { units } => show(units).await,
            Command::Watch { units } => watch(units).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let options = vec![UnitSystem::Metric, UnitSystem::Imperial];
    let start = options.iter().position(|u| *u == cfg.units).unwrap_or(0);
    let units = Select::new("Default units:", options)
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit system")?;

    cfg.api_key = Some(api_key.trim().to_string());
    cfg.units = units;
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(units: Option<UnitSystem>) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let units = units.unwrap_or(cfg.units);
    let (orchestrator, _) = WeatherOrchestrator::from_config(&cfg)?;

    match orchestrator.fetch_now(units).await {
        FetchOutcome::Success(record) => {
            println!("{}", render::record(&record));
            Ok(())
        }
        FetchOutcome::Failure(reason) => bail!("{reason}"),
    }
}

async fn watch(units: Option<UnitSystem>) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let mut units = units.unwrap_or(cfg.units);
    let (orchestrator, _) = WeatherOrchestrator::from_config(&cfg)?;

    let (stop_tx, stop_rx) = oneshot::channel();
    let renderer = tokio::spawn(render::follow(
        orchestrator.subscribe(),
        orchestrator.watch_phase(),
        stop_rx,
        std::io::stdout(),
    ));

    eprintln!("{}", render::WATCH_HELP);
    let mut latest = orchestrator.request_weather(units);
    let mut quit = false;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        debug!(command, "watch command");
        match command {
            "m" | "metric" => units = UnitSystem::Metric,
            "i" | "imperial" => units = UnitSystem::Imperial,
            "t" | "toggle" => units = units.toggled(),
            "r" | "" => {}
            "q" | "quit" => {
                quit = true;
                break;
            }
            other => {
                eprintln!("Unknown command '{other}'. {}", render::WATCH_HELP);
                continue;
            }
        }
        latest = orchestrator.request_weather(units);
    }

    // End of input: let the newest cycle publish before the renderer stops.
    if !quit {
        debug!("stdin closed, waiting for the pending cycle");
        if let Err(e) = latest.await {
            warn!("weather cycle task failed: {}", e);
        }
    }

    let _ = stop_tx.send(());
    renderer.await.context("Renderer task failed")?;
    Ok(())
}
