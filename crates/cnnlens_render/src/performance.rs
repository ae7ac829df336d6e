//! Training curves as a 2 × 2 grid of text charts.

use std::fmt;

use tracing::info;

use cnnlens_analysis::TrainingHistory;

use crate::chart::LineChart;

/// Panel titles in row-major order.
pub const PERFORMANCE_TITLES: [&str; 4] =
    ["Training Loss", "Test Loss", "Training Accuracy", "Test Accuracy"];

const PANEL_GAP: usize = 4;

/// One titled chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPanel {
    /// Panel title.
    pub title: String,
    /// Rendered chart.
    pub body: String,
}

/// Loss and accuracy curves laid out as
/// `[Training Loss, Test Loss; Training Accuracy, Test Accuracy]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceChart {
    panels: Vec<ChartPanel>,
}

impl PerformanceChart {
    /// Panels in row-major order.
    pub fn panels(&self) -> &[ChartPanel] {
        &self.panels
    }

    /// Panel by title.
    pub fn panel(&self, title: &str) -> Option<&ChartPanel> {
        self.panels.iter().find(|p| p.title == title)
    }
}

fn to_f32(series: &[f64]) -> Vec<f32> {
    series.iter().map(|&v| v as f32).collect()
}

/// Chart each loss and accuracy series of `history`.
pub fn plot_network_performance(history: &TrainingHistory) -> PerformanceChart {
    plot_network_performance_with(history, &LineChart::default())
}

/// [`plot_network_performance`] with a custom chart size.
pub fn plot_network_performance_with(history: &TrainingHistory, chart: &LineChart) -> PerformanceChart {
    let series = [
        &history.train_losses,
        &history.test_losses,
        &history.train_acc,
        &history.test_acc,
    ];
    let panels = PERFORMANCE_TITLES
        .iter()
        .zip(series)
        .map(|(title, values)| ChartPanel {
            title: (*title).to_string(),
            body: chart.render(&to_f32(values)),
        })
        .collect();

    info!(epochs = history.len(), "charted network performance");
    PerformanceChart { panels }
}

impl fmt::Display for PerformanceChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .panels
            .iter()
            .flat_map(|p| p.body.lines().chain(std::iter::once(p.title.as_str())))
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);

        for (row_idx, row) in self.panels.chunks(2).enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            let columns: Vec<Vec<&str>> = row
                .iter()
                .map(|p| std::iter::once(p.title.as_str()).chain(p.body.lines()).collect())
                .collect();
            let height = columns.iter().map(Vec::len).max().unwrap_or(0);

            for line in 0..height {
                let mut text = String::new();
                for (col_idx, column) in columns.iter().enumerate() {
                    let cell = column.get(line).copied().unwrap_or("");
                    text.push_str(cell);
                    if col_idx + 1 < columns.len() {
                        let pad = width - cell.chars().count() + PANEL_GAP;
                        text.extend(std::iter::repeat(' ').take(pad));
                    }
                }
                writeln!(f, "{}", text.trim_end())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> TrainingHistory {
        let mut h = TrainingHistory::new();
        for epoch in 0..5 {
            let e = epoch as f64;
            h.push_epoch(2.0 - 0.3 * e, 1.8 - 0.2 * e, 40.0 + 8.0 * e, 45.0 + 6.0 * e, 0.01);
        }
        h
    }

    #[test]
    fn test_panel_titles() {
        let chart = plot_network_performance(&history());
        let titles: Vec<&str> = chart.panels().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, PERFORMANCE_TITLES.to_vec());
        assert!(chart.panel("Test Accuracy").is_some());
        assert!(chart.panel("Learning Rate").is_none());
    }

    #[test]
    fn test_panel_bodies_follow_series() {
        let chart = plot_network_performance(&history());
        let train_acc = chart.panel("Training Accuracy").unwrap();
        assert!(train_acc.body.contains("72.0000"));
        assert!(train_acc.body.contains("40.0000"));
    }

    #[test]
    fn test_display_side_by_side() {
        let chart = plot_network_performance_with(&history(), &LineChart::new(10, 4));
        let text = chart.to_string();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("Training Loss"));
        assert!(first.contains("Test Loss"));
        assert!(text.lines().any(|l| l.starts_with("Training Accuracy") && l.contains("Test Accuracy")));
    }

    #[test]
    fn test_empty_history() {
        let chart = plot_network_performance(&TrainingHistory::new());
        assert!(chart.panels().iter().all(|p| p.body.is_empty()));
    }
}
