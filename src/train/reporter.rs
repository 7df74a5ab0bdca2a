use std::io::{self, Stdout, Write};

use crate::error::Result;
use crate::train::epoch_stats::EpochStats;

/// Receives the observable output of a training run.
pub trait Reporter {
    fn training_started(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once per epoch right after the training pass, before evaluation.
    fn train_loss(&mut self, _epoch: usize, _loss: f64) -> Result<()> {
        Ok(())
    }

    fn epoch_finished(&mut self, stats: &EpochStats) -> Result<()>;
}

/// Human-readable progress lines.
///
/// ```text
/// Training...
/// Training epoch 1: loss 12.34
/// Epoch 0:
/// Accuracy of the network on the train images: 41 %
/// Accuracy of the network on the test images: 38 %
/// ```
pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        ConsoleReporter { out: io::stdout() }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        ConsoleReporter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn training_started(&mut self) -> Result<()> {
        writeln!(self.out, "Training...")?;
        Ok(())
    }

    fn train_loss(&mut self, epoch: usize, loss: f64) -> Result<()> {
        writeln!(self.out, "Training epoch {}: loss {:.2}", epoch + 1, loss)?;
        Ok(())
    }

    fn epoch_finished(&mut self, stats: &EpochStats) -> Result<()> {
        writeln!(self.out, "Epoch {}:", stats.epoch)?;
        if stats.report {
            if let Some(acc) = stats.train_accuracy {
                writeln!(self.out, "Accuracy of the network on the train images: {acc} %")?;
            }
            if let Some(acc) = stats.test_accuracy {
                writeln!(self.out, "Accuracy of the network on the test images: {acc} %")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// One `EpochStats` JSON object per line.
pub struct JsonReporter<W: Write = Stdout> {
    out: W,
}

impl JsonReporter<Stdout> {
    pub fn stdout() -> Self {
        JsonReporter { out: io::stdout() }
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        JsonReporter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn epoch_finished(&mut self, stats: &EpochStats) -> Result<()> {
        serde_json::to_writer(&mut self.out, stats)?;
        writeln!(self.out)?;
        Ok(())
    }
}

/// Keeps everything it is told, for callers that inspect a run afterwards.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub started: bool,
    /// `(epoch, cumulative loss)` pairs in call order.
    pub losses: Vec<(usize, f64)>,
    pub epochs: Vec<EpochStats>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        RecordingReporter::default()
    }

    /// Epoch indices that closed an accuracy window.
    pub fn report_epochs(&self) -> Vec<usize> {
        self.epochs.iter().filter(|s| s.report).map(|s| s.epoch).collect()
    }
}

impl Reporter for RecordingReporter {
    fn training_started(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn train_loss(&mut self, epoch: usize, loss: f64) -> Result<()> {
        self.losses.push((epoch, loss));
        Ok(())
    }

    fn epoch_finished(&mut self, stats: &EpochStats) -> Result<()> {
        self.epochs.push(stats.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stats(epoch: usize, report: bool, test_accuracy: Option<u64>) -> EpochStats {
        EpochStats {
            epoch,
            total_epochs: 25,
            train_loss: 12.25,
            report,
            train_accuracy: report.then_some(41),
            test_accuracy,
            scheduler_metric: 0.375,
            learning_rate: 0.125,
            elapsed_ms: 7,
        }
    }

    #[test]
    fn console_prints_loss_and_window_accuracy() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.training_started().unwrap();
        reporter.train_loss(0, 12.25).unwrap();
        reporter.epoch_finished(&stats(0, true, Some(38))).unwrap();
        reporter.train_loss(1, 3.0).unwrap();
        reporter.epoch_finished(&stats(1, false, None)).unwrap();

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            text,
            "Training...\n\
             Training epoch 1: loss 12.25\n\
             Epoch 0:\n\
             Accuracy of the network on the train images: 41 %\n\
             Accuracy of the network on the test images: 38 %\n\
             Training epoch 2: loss 3.00\n\
             Epoch 1:\n"
        );
    }

    #[test]
    fn console_skips_empty_window() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.epoch_finished(&stats(10, true, None)).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(!text.contains("test images"));
        assert!(text.contains("train images: 41 %"));
    }

    #[test]
    fn json_writes_one_object_per_line() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.epoch_finished(&stats(0, true, Some(38))).unwrap();
        reporter.epoch_finished(&stats(1, false, None)).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: EpochStats = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, stats(1, false, None));
    }
}
