use serde::{Serialize, Deserialize};
use tracing::info;

use crate::error::{Result, TrainError};
use crate::optim::Optimizer;

/// Adjusts an optimizer's learning rate from a metric observed once per epoch.
pub trait Scheduler {
    /// Feeds one observation. Returns the new learning rate when it changed.
    fn step(&mut self, metric: f64, optimizer: &mut dyn Optimizer) -> Option<f64>;
}

/// Leaves the learning rate untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantLr;

impl Scheduler for ConstantLr {
    fn step(&mut self, _metric: f64, _optimizer: &mut dyn Optimizer) -> Option<f64> {
        None
    }
}

/// Whether a lower or a higher metric counts as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauMode {
    #[default]
    Min,
    Max,
}

/// How `threshold` is compared against the best value seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Improvement must beat `best * (1 ∓ threshold)`.
    #[default]
    Rel,
    /// Improvement must beat `best ∓ threshold`.
    Abs,
}

/// Tunables of `ReduceLrOnPlateau`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauSettings {
    pub mode: PlateauMode,
    /// Multiplier applied to the learning rate on a plateau.
    pub factor: f64,
    /// Bad epochs tolerated before reducing.
    pub patience: usize,
    pub threshold: f64,
    pub threshold_mode: ThresholdMode,
    /// Epochs to wait after a reduction before counting bad epochs again.
    pub cooldown: usize,
    pub min_lr: f64,
    /// Reductions smaller than this are skipped.
    pub eps: f64,
}

impl Default for PlateauSettings {
    fn default() -> Self {
        PlateauSettings {
            mode: PlateauMode::Min,
            factor: 0.1,
            patience: 10,
            threshold: 1e-4,
            threshold_mode: ThresholdMode::Rel,
            cooldown: 0,
            min_lr: 0.0,
            eps: 1e-8,
        }
    }
}

impl PlateauSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(TrainError::Config(format!(
                "plateau factor must be in (0, 1), got {}",
                self.factor
            )));
        }
        if self.threshold < 0.0 || self.min_lr < 0.0 || self.eps < 0.0 {
            return Err(TrainError::Config(
                "plateau threshold, min_lr and eps must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Reduces the learning rate when the monitored metric stops improving for
/// more than `patience` consecutive observations.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    pub settings: PlateauSettings,
    best: f64,
    num_bad_epochs: usize,
    cooldown_counter: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(settings: PlateauSettings) -> Result<ReduceLrOnPlateau> {
        settings.validate()?;
        let best = match settings.mode {
            PlateauMode::Min => f64::INFINITY,
            PlateauMode::Max => f64::NEG_INFINITY,
        };
        Ok(ReduceLrOnPlateau { settings, best, num_bad_epochs: 0, cooldown_counter: 0 })
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn num_bad_epochs(&self) -> usize {
        self.num_bad_epochs
    }

    fn is_better(&self, current: f64) -> bool {
        let s = &self.settings;
        match (s.mode, s.threshold_mode) {
            (PlateauMode::Min, ThresholdMode::Rel) => current < self.best * (1.0 - s.threshold),
            (PlateauMode::Min, ThresholdMode::Abs) => current < self.best - s.threshold,
            (PlateauMode::Max, ThresholdMode::Rel) => current > self.best * (1.0 + s.threshold),
            (PlateauMode::Max, ThresholdMode::Abs) => current > self.best + s.threshold,
        }
    }

    fn reduce(&self, optimizer: &mut dyn Optimizer) -> Option<f64> {
        let old_lr = optimizer.learning_rate();
        let new_lr = (old_lr * self.settings.factor).max(self.settings.min_lr);
        if old_lr - new_lr > self.settings.eps {
            optimizer.set_learning_rate(new_lr);
            info!(old_lr, new_lr, "plateau detected, reducing learning rate");
            Some(new_lr)
        } else {
            None
        }
    }
}

impl Scheduler for ReduceLrOnPlateau {
    fn step(&mut self, metric: f64, optimizer: &mut dyn Optimizer) -> Option<f64> {
        if self.is_better(metric) {
            self.best = metric;
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
        }

        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            self.num_bad_epochs = 0;
        }

        if self.num_bad_epochs > self.settings.patience {
            let changed = self.reduce(optimizer);
            self.cooldown_counter = self.settings.cooldown;
            self.num_bad_epochs = 0;
            return changed;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::optim::Sgd;

    fn plateau(mode: PlateauMode, patience: usize, cooldown: usize) -> ReduceLrOnPlateau {
        ReduceLrOnPlateau::new(PlateauSettings {
            mode,
            factor: 0.5,
            patience,
            cooldown,
            ..PlateauSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn reduces_after_patience_is_exceeded() {
        let mut sched = plateau(PlateauMode::Min, 2, 0);
        let mut opt = Sgd::new(1.0, 0.0, Device::Cpu);
        // First value improves on +inf; three flat values follow.
        assert_eq!(sched.step(0.5, &mut opt), None);
        assert_eq!(sched.step(0.5, &mut opt), None);
        assert_eq!(sched.step(0.5, &mut opt), None);
        assert_eq!(sched.step(0.5, &mut opt), Some(0.5));
        assert_eq!(opt.learning_rate(), 0.5);
        assert_eq!(sched.num_bad_epochs(), 0);
    }

    #[test]
    fn improvement_resets_bad_epochs() {
        let mut sched = plateau(PlateauMode::Max, 1, 0);
        let mut opt = Sgd::new(1.0, 0.0, Device::Cpu);
        sched.step(0.1, &mut opt);
        sched.step(0.1, &mut opt);
        sched.step(0.3, &mut opt);
        assert_eq!(sched.num_bad_epochs(), 0);
        assert_eq!(sched.best(), 0.3);
        assert_eq!(opt.learning_rate(), 1.0);
    }

    #[test]
    fn min_mode_treats_rising_accuracy_as_bad() {
        let mut sched = plateau(PlateauMode::Min, 0, 0);
        let mut opt = Sgd::new(1.0, 0.0, Device::Cpu);
        sched.step(0.2, &mut opt);
        assert_eq!(sched.step(0.4, &mut opt), Some(0.5));
    }

    #[test]
    fn cooldown_suppresses_counting() {
        let mut sched = plateau(PlateauMode::Min, 0, 2);
        let mut opt = Sgd::new(1.0, 0.0, Device::Cpu);
        sched.step(1.0, &mut opt);
        assert_eq!(sched.step(1.0, &mut opt), Some(0.5));
        // Two cooldown epochs, then counting resumes.
        assert_eq!(sched.step(1.0, &mut opt), None);
        assert_eq!(sched.step(1.0, &mut opt), None);
        assert_eq!(sched.step(1.0, &mut opt), Some(0.25));
    }

    #[test]
    fn never_goes_below_min_lr() {
        let mut sched = ReduceLrOnPlateau::new(PlateauSettings {
            factor: 0.1,
            patience: 0,
            min_lr: 0.05,
            ..PlateauSettings::default()
        })
        .unwrap();
        let mut opt = Sgd::new(0.1, 0.0, Device::Cpu);
        sched.step(1.0, &mut opt);
        assert_eq!(sched.step(1.0, &mut opt), Some(0.05));
        assert_eq!(sched.step(1.0, &mut opt), None);
        assert_eq!(opt.learning_rate(), 0.05);
    }

    #[test]
    fn rejects_factor_outside_unit_interval() {
        let bad = PlateauSettings { factor: 1.5, ..PlateauSettings::default() };
        assert!(ReduceLrOnPlateau::new(bad).is_err());
    }
}
