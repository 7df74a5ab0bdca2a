//! Training binary.
//!
//! Usage:
//!   hcs-train [OPTIONS]
//!
//! Examples:
//!   # Train with configs/params.yml and its csv_file
//!   hcs-train
//!
//!   # Quick smoke run on generated images, JSON progress on stdout
//!   hcs-train --synthetic -e 3 --json

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hcs_trainer::config::{ConfigOverrides, TrainConfig, DEFAULT_CONFIG_PATH};
use hcs_trainer::data::{split, DataLoader};
use hcs_trainer::train::{ConsoleReporter, JsonReporter, Reporter, TrainingLoop};

#[derive(Parser, Debug)]
#[command(name = "hcs-train")]
#[command(about = "Train an image classifier and report running train/test accuracy")]
#[command(version)]
struct Cli {
    /// YAML parameter file (default: configs/params.yml, skipped if absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV manifest of `path,label` rows
    #[arg(long = "csv-file", alias = "csv_file")]
    csv_file: Option<PathBuf>,

    /// Debug logging; falls back to generated data when the CSV is missing
    #[arg(long, overrides_with = "no_debug")]
    debug: bool,

    #[arg(long = "no-debug", overrides_with = "debug")]
    no_debug: bool,

    /// Number of epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Batch size
    #[arg(short, long = "batch-size", alias = "batch_size")]
    batch_size: Option<usize>,

    /// Fraction of the dataset used for training
    #[arg(short, long)]
    split: Option<f64>,

    /// Report accuracy and reset the running counters every N epochs
    #[arg(long)]
    report_interval: Option<usize>,

    /// Seed for weight init and generated data
    #[arg(long)]
    seed: Option<u64>,

    /// Train on generated images instead of the CSV manifest
    #[arg(long)]
    synthetic: bool,

    /// Emit one JSON object per epoch instead of console lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let debug = match (self.debug, self.no_debug) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ConfigOverrides {
            csv_file: self.csv_file.clone(),
            debug,
            epochs: self.epochs,
            batch_size: self.batch_size,
            split: self.split,
            report_interval: self.report_interval,
            seed: self.seed,
        }
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<TrainConfig> {
    let config = match &cli.config {
        Some(path) => TrainConfig::load(path),
        None => TrainConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
    }
    .context("failed to load configuration")?;
    Ok(config.with_overrides(cli.overrides())?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.debug)?;

    let device = config.device.resolve();
    info!(%device, epochs = config.epochs, batch_size = config.batch_size, split = config.split, "configuration");

    let synthetic = cli.synthetic || (config.debug && !config.csv_file.exists());
    if synthetic && !cli.synthetic {
        warn!(csv_file = %config.csv_file.display(), "csv file not found, using generated data");
    }
    let dataset = config
        .build_dataset(synthetic)
        .with_context(|| format!("failed to open dataset '{}'", config.csv_file.display()))?;

    let (train, test) = split(dataset.as_ref(), config.split)?;
    let train_loader = DataLoader::new(train, config.batch_size, device)?;
    let test_loader = DataLoader::new(test, config.batch_size, device)?;
    info!(train = train_loader.num_samples(), test = test_loader.num_samples(), "split dataset");

    let mut model = config.build_model(device)?;
    info!(network = %model.name, params = model.parameter_count(), "model ready");
    for line in model.summary() {
        debug!("{line}");
    }

    let mut optimizer = config.optimizer.build(device);
    let mut scheduler = config.scheduler.build()?;
    let loss_fn = config.loss.build();
    let mut reporter: Box<dyn Reporter> = if cli.json {
        Box::new(JsonReporter::stdout())
    } else {
        Box::new(ConsoleReporter::stdout())
    };

    let mut training = TrainingLoop::new(config.loop_config())?;
    training.run(
        &train_loader,
        &test_loader,
        &mut model,
        optimizer.as_mut(),
        scheduler.as_mut(),
        loss_fn.as_ref(),
        reporter.as_mut(),
    )?;
    Ok(())
}
