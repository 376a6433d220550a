use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use boards::Rover;
use clap::{Parser, Subcommand};
use classifier::SequenceClassifier;
use telekinesis::record::RecordOptions;
use telekinesis::train::TrainOptions;
use telekinesis::{drive, record, train, AppConfig, Source};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pause between moves of the rover self-test.
const SELF_TEST_PAUSE: Duration = Duration::from_secs(1);

/// Drive a rover with an EEG headset
#[derive(Parser, Debug)]
#[command(name = "telekinesis", author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the synthetic headset instead of an LSL stream
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record labeled band-power features for a set of actions
    Record {
        /// Number of actions, including a null action
        #[arg(long)]
        actions: Option<usize>,

        /// Profile name; saved as <PROFILE>.json
        #[arg(long)]
        profile: Option<String>,
    },

    /// Train a classifier on a recorded profile
    Train {
        #[arg(long)]
        profile: PathBuf,

        /// Where to write the model
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        epochs: Option<usize>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Classify the live stream and move the rover
    Drive {
        #[arg(long)]
        model: PathBuf,

        /// Serial port of the rover (auto-detected when omitted)
        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud: Option<u32>,

        /// Motor PWM duty, 0-255
        #[arg(long)]
        speed: Option<i32>,

        /// Stop after this many predictions
        #[arg(long)]
        steps: Option<usize>,

        /// Print predictions without connecting to the rover
        #[arg(long)]
        dry_run: bool,
    },

    /// Drive forward, backward and brake to check the rover wiring
    RoverTest {
        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "telekinesis=info,pipeline=info,classifier=info,boards=info,eeg_sensor=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match cli.command {
        Commands::Record { actions, profile } => {
            let mut source = Source::open(&config, cli.mock)?;
            let options = RecordOptions { actions, profile };
            record::run(&config, &mut source, &options, &mut input, &mut out)?;
        }
        Commands::Train {
            profile,
            model,
            epochs,
            batch_size,
            seed,
        } => {
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.training.batch_size = batch_size;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }
            let options = TrainOptions { profile, model };
            train::run(&config.training, &options, &mut out)?;
        }
        Commands::Drive {
            model,
            port,
            baud,
            speed,
            steps,
            dry_run,
        } => {
            apply_rover_overrides(&mut config, port, baud, speed);
            let classifier = SequenceClassifier::load(&model)
                .with_context(|| format!("Could not load model '{}'", model.display()))?;
            let mut rover = if dry_run {
                tracing::info!("Dry run, the rover stays disconnected");
                None
            } else {
                Some(Rover::connect(&config.rover).context("Could not connect to the rover")?)
            };
            let mut source = Source::open(&config, cli.mock)?;
            drive::run(&config, &mut source, &classifier, rover.as_mut(), steps, &mut out)?;
        }
        Commands::RoverTest { port, baud } => {
            apply_rover_overrides(&mut config, port, baud, None);
            let mut rover = Rover::connect(&config.rover).context("Could not connect to the rover")?;
            rover.self_test(SELF_TEST_PAUSE)?;
        }
    }

    Ok(())
}

fn apply_rover_overrides(config: &mut AppConfig, port: Option<String>, baud: Option<u32>, speed: Option<i32>) {
    if port.is_some() {
        config.rover.port = port;
    }
    if let Some(baud) = baud {
        config.rover.baud = baud;
    }
    if let Some(speed) = speed {
        config.rover.speed = speed;
    }
}
