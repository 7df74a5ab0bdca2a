use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::data::{CsvImageDataset, Dataset, ImageFormat, SyntheticDataset};
use crate::device::{Device, DeviceChoice};
use crate::error::{Result, TrainError};
use crate::loss::LossType;
use crate::network::{Network, NetworkSpec};
use crate::optim::scheduler::PlateauSettings;
use crate::optim::{Adam, ConstantLr, Optimizer, ReduceLrOnPlateau, Scheduler, Sgd};
use crate::train::LoopConfig;

/// Parameter file read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "configs/params.yml";

/// Optimizer selection, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        #[serde(default = "adam_lr")]
        lr: f64,
        #[serde(default = "beta1")]
        beta1: f64,
        #[serde(default = "beta2")]
        beta2: f64,
        #[serde(default = "adam_eps")]
        eps: f64,
        #[serde(default)]
        weight_decay: f64,
    },
    Sgd {
        lr: f64,
        #[serde(default)]
        momentum: f64,
    },
}

fn adam_lr() -> f64 {
    1e-3
}

fn beta1() -> f64 {
    0.9
}

fn beta2() -> f64 {
    0.999
}

fn adam_eps() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            lr: adam_lr(),
            beta1: beta1(),
            beta2: beta2(),
            eps: adam_eps(),
            weight_decay: 0.0,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        let lr = match *self {
            OptimizerConfig::Adam { lr, beta1, beta2, .. } => {
                if !(0.0..1.0).contains(&beta1) || !(0.0..1.0).contains(&beta2) {
                    return Err(TrainError::Config(format!(
                        "adam betas must be in [0, 1), got ({beta1}, {beta2})"
                    )));
                }
                lr
            }
            OptimizerConfig::Sgd { lr, momentum } => {
                if !(0.0..1.0).contains(&momentum) {
                    return Err(TrainError::Config(format!("sgd momentum must be in [0, 1), got {momentum}")));
                }
                lr
            }
        };
        if !(lr > 0.0) {
            return Err(TrainError::Config(format!("learning rate must be positive, got {lr}")));
        }
        Ok(())
    }

    pub fn build(&self, device: Device) -> Box<dyn Optimizer> {
        match *self {
            OptimizerConfig::Adam { lr, beta1, beta2, eps, weight_decay } => {
                Box::new(Adam::new(lr, beta1, beta2, eps, weight_decay, device))
            }
            OptimizerConfig::Sgd { lr, momentum } => Box::new(Sgd::new(lr, momentum, device)),
        }
    }
}

/// Learning-rate schedule selection, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerConfig {
    Plateau(PlateauSettings),
    None,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::Plateau(PlateauSettings::default())
    }
}

impl SchedulerConfig {
    pub fn build(&self) -> Result<Box<dyn Scheduler>> {
        Ok(match self {
            SchedulerConfig::Plateau(settings) => Box::new(ReduceLrOnPlateau::new(settings.clone())?),
            SchedulerConfig::None => Box::new(ConstantLr),
        })
    }
}

/// Everything one training run needs, as read from the parameter file.
///
/// Every key is optional in YAML; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub csv_file: PathBuf,
    pub debug: bool,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the dataset used for training.
    pub split: f64,
    pub report_interval: usize,
    pub seed: u64,
    pub device: DeviceChoice,
    pub image: ImageFormat,
    pub num_classes: usize,
    /// Explicit architecture; the VGG-style preset when absent.
    pub model: Option<NetworkSpec>,
    pub loss: LossType,
    pub optimizer: OptimizerConfig,
    pub scheduler: SchedulerConfig,
    /// Dataset size when generated data is used instead of the CSV.
    pub synthetic_samples: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            csv_file: PathBuf::from("data/mini.csv"),
            debug: false,
            epochs: 50,
            batch_size: 16,
            split: 0.8,
            report_interval: 10,
            seed: 42,
            device: DeviceChoice::Auto,
            image: ImageFormat::default(),
            num_classes: 2,
            model: None,
            loss: LossType::CrossEntropy,
            optimizer: OptimizerConfig::default(),
            scheduler: SchedulerConfig::default(),
            synthetic_samples: 200,
        }
    }
}

/// Values given on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub csv_file: Option<PathBuf>,
    pub debug: Option<bool>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub split: Option<f64>,
    pub report_interval: Option<usize>,
    pub seed: Option<u64>,
}

impl TrainConfig {
    pub fn from_yaml(text: &str) -> Result<TrainConfig> {
        let config: TrainConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a YAML parameter file.
    pub fn load(path: &Path) -> Result<TrainConfig> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrainError::Config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        TrainConfig::from_yaml(&text)
    }

    /// Loads `path` when it exists and falls back to the defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<TrainConfig> {
        if path.exists() {
            TrainConfig::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(TrainConfig::default())
        }
    }

    /// Applies command-line values and re-validates.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<TrainConfig> {
        if let Some(csv_file) = overrides.csv_file {
            self.csv_file = csv_file;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(split) = overrides.split {
            self.split = split;
        }
        if let Some(report_interval) = overrides.report_interval {
            self.report_interval = report_interval;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainError::Config("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::Config("batch_size must be at least 1".into()));
        }
        if self.report_interval == 0 {
            return Err(TrainError::Config("report_interval must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.split) {
            return Err(TrainError::Config(format!("split must be in [0, 1], got {}", self.split)));
        }
        if self.num_classes < 2 {
            return Err(TrainError::Config(format!(
                "num_classes must be at least 2, got {}",
                self.num_classes
            )));
        }
        self.image.validate()?;
        self.optimizer.validate()?;
        if let SchedulerConfig::Plateau(settings) = &self.scheduler {
            settings.validate()?;
        }
        Ok(())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig { epochs: self.epochs, report_interval: self.report_interval }
    }

    pub fn network_spec(&self) -> NetworkSpec {
        self.model
            .clone()
            .unwrap_or_else(|| NetworkSpec::vgg_small(&[8, 16], 64, self.num_classes))
    }

    /// Builds the classifier with weights drawn from `seed`.
    pub fn build_model(&self, device: Device) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Network::from_spec(&self.network_spec(), &self.image.shape(), self.num_classes, device, &mut rng)
    }

    /// The CSV manifest, or generated data when `synthetic` is set.
    pub fn build_dataset(&self, synthetic: bool) -> Result<Box<dyn Dataset>> {
        let dataset: Box<dyn Dataset> = if synthetic {
            Box::new(SyntheticDataset::new(self.synthetic_samples, self.num_classes, self.image, self.seed)?)
        } else {
            Box::new(CsvImageDataset::from_csv(&self.csv_file, self.image)?)
        };
        if dataset.num_classes() > self.num_classes {
            return Err(TrainError::Config(format!(
                "dataset has {} classes but num_classes is {}",
                dataset.num_classes(),
                self.num_classes
            )));
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::scheduler::PlateauMode;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = TrainConfig::from_yaml("{}").unwrap();
        assert_eq!(config, TrainConfig::default());
        assert_eq!(config.loop_config(), LoopConfig { epochs: 50, report_interval: 10 });
    }

    #[test]
    fn reads_params_file_keys() {
        let yaml = r#"
csv_file: data/plates.csv
debug: true
epochs: 25
batch_size: 8
split: 0.75
image:
  channels: 3
  height: 16
optimizer:
  kind: sgd
  lr: 0.01
  momentum: 0.9
scheduler:
  kind: plateau
  mode: max
  patience: 3
"#;
        let config = TrainConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.csv_file, PathBuf::from("data/plates.csv"));
        assert!(config.debug);
        assert_eq!(config.epochs, 25);
        assert_eq!(config.split, 0.75);
        assert_eq!(config.image, ImageFormat { channels: 3, height: 16, width: 32 });
        assert_eq!(config.optimizer, OptimizerConfig::Sgd { lr: 0.01, momentum: 0.9 });
        let SchedulerConfig::Plateau(settings) = &config.scheduler else {
            panic!("expected plateau scheduler");
        };
        assert_eq!(settings.mode, PlateauMode::Max);
        assert_eq!(settings.patience, 3);
        assert_eq!(settings.factor, 0.1);
    }

    #[test]
    fn scheduler_can_be_disabled() {
        let config = TrainConfig::from_yaml("scheduler:\n  kind: none\n").unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::None);
        assert!(config.scheduler.build().is_ok());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = TrainConfig::from_yaml("epochs: 25\nbatch_size: 8\n").unwrap();
        let config = config
            .with_overrides(ConfigOverrides {
                epochs: Some(3),
                split: Some(0.5),
                debug: Some(true),
                ..ConfigOverrides::default()
            })
            .unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.split, 0.5);
        assert!(config.debug);
    }

    #[test]
    fn rejects_split_outside_unit_interval() {
        let err = TrainConfig::default().with_overrides(ConfigOverrides {
            split: Some(1.5),
            ..ConfigOverrides::default()
        });
        assert!(matches!(err, Err(TrainError::Config(_))));
        assert!(TrainConfig::from_yaml("split: -0.1").is_err());
    }

    #[test]
    fn rejects_zero_counts() {
        assert!(TrainConfig::from_yaml("epochs: 0").is_err());
        assert!(TrainConfig::from_yaml("batch_size: 0").is_err());
        assert!(TrainConfig::from_yaml("report_interval: 0").is_err());
        assert!(TrainConfig::from_yaml("num_classes: 1").is_err());
        assert!(TrainConfig::from_yaml("image: {channels: 2}").is_err());
    }

    #[test]
    fn unknown_optimizer_is_a_yaml_error() {
        let err = TrainConfig::from_yaml("optimizer:\n  kind: rmsprop\n");
        assert!(matches!(err, Err(TrainError::Yaml(_))));
    }

    #[test]
    fn loads_from_file_or_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "epochs: 7").unwrap();
        assert_eq!(TrainConfig::load(file.path()).unwrap().epochs, 7);

        let missing = file.path().with_extension("missing.yml");
        assert_eq!(TrainConfig::load_or_default(&missing).unwrap(), TrainConfig::default());
        assert!(TrainConfig::load(&missing).is_err());
    }

    #[test]
    fn builds_default_preset_for_configured_image() {
        let config = TrainConfig {
            image: ImageFormat { channels: 1, height: 8, width: 8 },
            num_classes: 3,
            ..TrainConfig::default()
        };
        let model = config.build_model(Device::Cpu).unwrap();
        assert_eq!(model.input_shape, vec![1, 8, 8]);
        let data = config.build_dataset(true).unwrap();
        assert_eq!(data.len(), 200);
        assert_eq!(data.sample_shape(), vec![1, 8, 8]);
    }
}
