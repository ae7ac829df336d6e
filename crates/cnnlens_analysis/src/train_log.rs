//! Per-epoch training history and its tabular log.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

const RULE_WIDTH: usize = 91;

/// Metrics recorded once per epoch.
///
/// Accuracies are stored as the training loop reports them (fractions or
/// percentages); the log prints them unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Training loss per epoch.
    pub train_losses: Vec<f64>,
    /// Test loss per epoch.
    pub test_losses: Vec<f64>,
    /// Training accuracy per epoch.
    pub train_acc: Vec<f64>,
    /// Test accuracy per epoch.
    pub test_acc: Vec<f64>,
    /// Learning rate per epoch.
    pub learning_rates: Vec<f64>,
}

impl TrainingHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one epoch.
    pub fn push_epoch(
        &mut self,
        train_loss: f64,
        test_loss: f64,
        train_acc: f64,
        test_acc: f64,
        learning_rate: f64,
    ) {
        self.train_losses.push(train_loss);
        self.test_losses.push(test_loss);
        self.train_acc.push(train_acc);
        self.test_acc.push(test_acc);
        self.learning_rates.push(learning_rate);
    }

    fn series(&self) -> [(&'static str, &[f64]); 5] {
        [
            ("train_losses", &self.train_losses),
            ("test_losses", &self.test_losses),
            ("train_acc", &self.train_acc),
            ("test_acc", &self.test_acc),
            ("learning_rates", &self.learning_rates),
        ]
    }

    /// Number of complete epochs (the length of the shortest series).
    pub fn len(&self) -> usize {
        self.series().iter().map(|(_, s)| s.len()).min().unwrap_or(0)
    }

    /// Whether no complete epoch is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_epochs(&self, epochs: usize) -> Result<()> {
        match self.series().into_iter().find(|(_, s)| s.len() < epochs) {
            Some((series, s)) => Err(AnalysisError::HistoryTooShort {
                requested: epochs,
                series,
                available: s.len(),
            }),
            None => Ok(()),
        }
    }

    /// The first `epochs` epochs as a printable table.
    ///
    /// Fails when any series holds fewer than `epochs` values.
    pub fn train_log(&self, epochs: usize) -> Result<TrainLog<'_>> {
        self.check_epochs(epochs)?;
        Ok(TrainLog {
            history: self,
            epochs,
        })
    }

    /// Render the first `epochs` epochs as a table.
    ///
    /// Epochs are numbered from 1. Losses are shown with 2 decimals,
    /// accuracies with 4 and the learning rate with 8.
    pub fn format_train_log(&self, epochs: usize) -> Result<String> {
        Ok(self.train_log(epochs)?.to_string())
    }

    /// Load a history from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the history as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// A validated view of the first `epochs` epochs of a [`TrainingHistory`].
#[derive(Debug, Clone, Copy)]
pub struct TrainLog<'a> {
    history: &'a TrainingHistory,
    epochs: usize,
}

impl fmt::Display for TrainLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.history;
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(
            f,
            "\nEpoch\t     Train Loss\t     Test Loss     Train Accuracy    Test Accuracy    Learning Rate"
        )?;
        writeln!(f, "{rule}")?;
        for i in 0..self.epochs {
            writeln!(
                f,
                "{}\t\t{:.2}\t\t{:.2}\t\t{:.4}\t\t{:.4}\t\t{:.8}\n",
                i + 1,
                h.train_losses[i],
                h.test_losses[i],
                h.train_acc[i],
                h.test_acc[i],
                h.learning_rates[i],
            )?;
        }
        writeln!(f, "{rule}")
    }
}

/// Print the first `epochs` epochs of `history` to stdout.
pub fn print_train_log(history: &TrainingHistory, epochs: usize) -> Result<()> {
    print!("{}", history.train_log(epochs)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> TrainingHistory {
        let mut h = TrainingHistory::new();
        h.push_epoch(1.2345, 1.1111, 45.5, 50.25, 0.001);
        h.push_epoch(0.8765, 0.9, 60.0, 62.125, 0.0123456789);
        h
    }

    #[test]
    fn test_len() {
        let mut h = history();
        assert_eq!(h.len(), 2);
        h.learning_rates.pop();
        assert_eq!(h.len(), 1);
        assert!(!h.is_empty());
        assert!(TrainingHistory::new().is_empty());
    }

    #[test]
    fn test_format_rows() {
        let log = history().format_train_log(2).unwrap();
        let lines: Vec<&str> = log.lines().collect();

        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("Epoch"));
        assert_eq!(lines[2], "=".repeat(RULE_WIDTH));
        assert_eq!(lines[3], "1\t\t1.23\t\t1.11\t\t45.5000\t\t50.2500\t\t0.00100000");
        assert_eq!(lines[5], "2\t\t0.88\t\t0.90\t\t60.0000\t\t62.1250\t\t0.01234568");
        assert_eq!(lines.last().copied(), Some("=".repeat(RULE_WIDTH).as_str()));
    }

    #[test]
    fn test_train_log_display_matches_format() {
        let h = history();
        let log = h.train_log(2).unwrap();
        assert_eq!(log.to_string(), h.format_train_log(2).unwrap());
        // Blank line, header, rule, two rows each followed by a blank line, rule.
        assert_eq!(log.to_string().lines().count(), 1 + 1 + 1 + 2 * 2 + 1);
        assert!(h.train_log(3).is_err());
    }

    #[test]
    fn test_format_fewer_epochs() {
        let log = history().format_train_log(1).unwrap();
        assert!(log.contains("1\t\t1.23"));
        assert!(!log.contains("2\t\t0.88"));
    }

    #[test]
    fn test_history_too_short() {
        let mut h = history();
        h.test_acc.pop();
        let err = h.format_train_log(2).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::HistoryTooShort {
                requested: 2,
                series: "test_acc",
                available: 1
            }
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let h = history();
        h.save(&path).unwrap();
        assert_eq!(TrainingHistory::load(&path).unwrap(), h);
    }
}
