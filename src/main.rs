use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use riposte::config::SimulationConfig;
use riposte::scene::{Arena, Scenario};

#[derive(Parser)]
#[command(name = "riposte", about = "Headless duel runner for the character state machine")]
struct Args {
    /// TOML file overriding the built-in tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed steps to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Agent difficulty in [0, 1]; overrides the config file
    #[arg(long)]
    difficulty: Option<f32>,

    /// Seed for the agent's attack pacing; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = Scenario::Duel)]
    scenario: Scenario,

    /// Log every state change
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "riposte=debug" } else { "riposte=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => match SimulationConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => SimulationConfig::default(),
    };
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Err(err) = config.validate() {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    info!(scenario = ?args.scenario, ticks = args.ticks, difficulty = config.difficulty, "starting arena");
    let mut arena = Arena::new(&config);
    let mut pilot = args.scenario.pilot();
    arena.run(args.ticks, pilot.as_mut());

    println!("{} transitions over {:.2}s", arena.transitions.len(), arena.clock.elapsed());
    for row in arena.summary() {
        println!("{row}");
    }
    ExitCode::SUCCESS
}
