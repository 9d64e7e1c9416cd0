use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use demesne::{
    clock::Speed,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Settlement management simulation")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run a scenario headless for a fixed number of ticks
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Override tick count (uses scenario default when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Override days simulated per tick
        #[arg(long)]
        tick_days: Option<u32>,
    },
    /// Serve the live settlement over HTTP with a real-time clock
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        #[arg(long, value_enum, default_value_t = Speed::Normal)]
        speed: Speed,

        /// Start with the clock paused
        #[arg(long)]
        paused: bool,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/river_holdings.yaml")]
    scenario: PathBuf,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("demesne=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");

    match cli.command {
        Mode::Run {
            common,
            ticks,
            tick_days,
        } => {
            let scenario = loader.load(&common.scenario)?;
            let mut world = scenario.build_world()?;
            let ticks = scenario.ticks(ticks);
            let settings = EngineSettings {
                scenario_name: scenario.name.clone(),
                seed: scenario.seed,
                tick_days: tick_days.unwrap_or(scenario.tick_days),
                snapshot_interval_ticks: common
                    .snapshot_interval
                    .unwrap_or(scenario.snapshot_interval_ticks),
                snapshot_dir: common.snapshot_dir,
            };
            let mut engine = EngineBuilder::new(settings).with_standard_systems().build();

            engine.run_with_hook(&mut world, ticks, |report| {
                for notification in &report.notifications {
                    tracing::debug!(tick = report.tick, ?notification);
                }
            })?;

            let progression = world.progression();
            tracing::info!(
                scenario = %scenario.name,
                ticks,
                day = world.calendar().day,
                fame = progression.fame,
                rank = %progression.rank_name,
                "scenario completed"
            );
            println!("{}", serde_json::to_string_pretty(&world.resources())?);
        }
        Mode::Serve {
            common,
            host,
            port,
            speed,
            paused,
        } => {
            let scenario = loader.load(&common.scenario)?;
            let snapshot_interval = common
                .snapshot_interval
                .unwrap_or(scenario.snapshot_interval_ticks);
            web::run(WebServerConfig {
                scenario,
                snapshot_interval,
                snapshot_dir: common.snapshot_dir,
                host,
                port,
                speed,
                start_paused: paused,
            })
            .await?;
        }
    }
    Ok(())
}
