use std::time::Instant;

use tracing::{debug, info, info_span, trace};

use crate::data::loader::DataLoader;
use crate::error::{Result, TrainError};
use crate::layers::GradMode;
use crate::loss::Loss;
use crate::network::model::Model;
use crate::optim::{Optimizer, Scheduler};
use crate::train::epoch_stats::EpochStats;
use crate::train::metrics::{count_correct, RunningMetrics};
use crate::train::reporter::Reporter;

/// Schedule of a `TrainingLoop` run.
///
/// # Fields
/// - `epochs`:          total number of epochs (train pass + test pass)
/// - `report_interval`: accuracy is reported, and the running metrics
///                      reset, on epochs whose index is a multiple of this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub epochs: usize,
    pub report_interval: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig { epochs: 50, report_interval: 10 }
    }
}

impl LoopConfig {
    /// Whether epoch `epoch` (0-based) closes an accuracy window.
    pub fn is_report_epoch(&self, epoch: usize) -> bool {
        epoch % self.report_interval == 0
    }
}

/// Drives the train / evaluate / report / schedule cycle.
///
/// Per epoch:
/// 1. the cumulative loss restarts at 0;
/// 2. every training batch runs forward, gradient clear, loss, backward and
///    an optimizer step, and adds its correct/total counts to the window;
/// 3. the cumulative loss is reported;
/// 4. every test batch runs forward without gradient tracking and adds its
///    counts to the window;
/// 5. on reporting epochs the window accuracy is reported and the counters
///    reset;
/// 6. the scheduler receives the window's test accuracy ratio, read before
///    any reset (0.0 when no test sample was seen).
#[derive(Debug)]
pub struct TrainingLoop {
    config: LoopConfig,
    epoch: usize,
    metrics: RunningMetrics,
    cumulative_loss: f64,
}

impl TrainingLoop {
    pub fn new(config: LoopConfig) -> Result<TrainingLoop> {
        if config.report_interval == 0 {
            return Err(TrainError::Config("report_interval must be at least 1".into()));
        }
        Ok(TrainingLoop {
            config,
            epoch: 0,
            metrics: RunningMetrics::new(),
            cumulative_loss: 0.0,
        })
    }

    pub fn config(&self) -> LoopConfig {
        self.config
    }

    /// Index of the next epoch to run.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn metrics(&self) -> &RunningMetrics {
        &self.metrics
    }

    /// Loss accumulated by the current (or last finished) epoch.
    pub fn cumulative_loss(&self) -> f64 {
        self.cumulative_loss
    }

    pub fn is_done(&self) -> bool {
        self.epoch >= self.config.epochs
    }

    /// Runs every remaining epoch. The first error from data loading, the
    /// model, the loss, the optimizer or the reporter aborts the run.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        train_loader: &DataLoader<'_>,
        test_loader: &DataLoader<'_>,
        model: &mut dyn Model,
        optimizer: &mut dyn Optimizer,
        scheduler: &mut dyn Scheduler,
        loss_fn: &dyn Loss,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        info!(
            epochs = self.config.epochs,
            report_interval = self.config.report_interval,
            train_batches = train_loader.len(),
            test_batches = test_loader.len(),
            "starting training"
        );
        reporter.training_started()?;

        while !self.is_done() {
            self.run_epoch(train_loader, test_loader, model, optimizer, scheduler, loss_fn, reporter)?;
        }

        info!(epochs = self.epoch, "training finished");
        Ok(())
    }

    /// Runs the next epoch and returns its summary.
    #[allow(clippy::too_many_arguments)]
    pub fn run_epoch(
        &mut self,
        train_loader: &DataLoader<'_>,
        test_loader: &DataLoader<'_>,
        model: &mut dyn Model,
        optimizer: &mut dyn Optimizer,
        scheduler: &mut dyn Scheduler,
        loss_fn: &dyn Loss,
        reporter: &mut dyn Reporter,
    ) -> Result<EpochStats> {
        let epoch = self.epoch;
        let _span = info_span!("epoch", epoch).entered();
        let t_start = Instant::now();

        // ── Training pass ─────────────────────────────────────────────────
        self.cumulative_loss = 0.0;
        self.train_pass(train_loader, model, optimizer, loss_fn)?;
        reporter.train_loss(epoch, self.cumulative_loss)?;

        // ── Evaluation pass ───────────────────────────────────────────────
        self.eval_pass(test_loader, model)?;

        // ── Window report ─────────────────────────────────────────────────
        let scheduler_metric = self.metrics.test_ratio().unwrap_or(0.0);
        let report = self.config.is_report_epoch(epoch);
        let (train_accuracy, test_accuracy) = if report {
            let accuracies = (self.metrics.train_accuracy_percent(), self.metrics.test_accuracy_percent());
            trace!(metrics = ?self.metrics, "closing accuracy window");
            self.metrics.reset();
            accuracies
        } else {
            (None, None)
        };

        // ── Learning-rate schedule ────────────────────────────────────────
        if let Some(lr) = scheduler.step(scheduler_metric, optimizer) {
            info!(epoch, learning_rate = lr, "learning rate changed");
        }

        let stats = EpochStats {
            epoch,
            total_epochs: self.config.epochs,
            train_loss: self.cumulative_loss,
            report,
            train_accuracy,
            test_accuracy,
            scheduler_metric,
            learning_rate: optimizer.learning_rate(),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            loss = stats.train_loss,
            train_accuracy = ?stats.train_accuracy,
            test_accuracy = ?stats.test_accuracy,
            elapsed_ms = stats.elapsed_ms,
            "epoch finished"
        );
        reporter.epoch_finished(&stats)?;

        self.epoch += 1;
        Ok(stats)
    }

    fn train_pass(
        &mut self,
        loader: &DataLoader<'_>,
        model: &mut dyn Model,
        optimizer: &mut dyn Optimizer,
        loss_fn: &dyn Loss,
    ) -> Result<()> {
        trace!("train pass");
        for (batch_n, batch) in loader.iter().enumerate() {
            let batch = batch?;

            let scores = model.forward(&batch.inputs, GradMode::Enabled)?;
            let fresh = optimizer.zero_grad(&mut *model);
            let (loss, grad_scores) = loss_fn.forward(&scores, &batch.labels)?;
            model.backward(&grad_scores, fresh)?;
            optimizer.step(&mut *model)?;

            self.cumulative_loss += loss;
            let correct = count_correct(&scores, &batch.labels);
            self.metrics.record_train(correct, batch.len());
            debug!(batch = batch_n, loss, correct, size = batch.len(), "train batch");
        }
        Ok(())
    }

    fn eval_pass(&mut self, loader: &DataLoader<'_>, model: &mut dyn Model) -> Result<()> {
        trace!("eval pass");
        for (batch_n, batch) in loader.iter().enumerate() {
            let batch = batch?;
            let scores = model.forward(&batch.inputs, GradMode::Disabled)?;
            let correct = count_correct(&scores, &batch.labels);
            self.metrics.record_test(correct, batch.len());
            debug!(batch = batch_n, correct, size = batch.len(), "test batch");
        }
        Ok(())
    }
}
