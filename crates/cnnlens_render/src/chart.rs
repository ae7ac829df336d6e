//! Text line charts for terminal output.

/// Renders a series as a fixed-size text line chart with min/max labels.
#[derive(Debug, Clone)]
pub struct LineChart {
    width: usize,
    height: usize,
    show_labels: bool,
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new(40, 10)
    }
}

impl LineChart {
    /// Create a chart of `width × height` plot cells.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
            show_labels: true,
        }
    }

    /// Disable the min/max axis labels.
    #[must_use]
    pub fn without_labels(mut self) -> Self {
        self.show_labels = false;
        self
    }

    fn column(&self, i: usize, len: usize) -> usize {
        (i as f32 / (len - 1).max(1) as f32 * (self.width - 1) as f32) as usize
    }

    fn row(&self, val: f32, min: f32, range: f32) -> usize {
        let y = ((val - min) / range * (self.height - 1) as f32) as usize;
        (self.height - 1).saturating_sub(y)
    }

    /// Render `series`; an empty series renders as an empty string.
    pub fn render(&self, series: &[f32]) -> String {
        if series.is_empty() {
            return String::new();
        }

        let min_val = series.iter().copied().fold(f32::INFINITY, f32::min);
        let max_val = series.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = (max_val - min_val).max(1e-8);

        let mut grid = vec![vec![' '; self.width]; self.height];

        // Interpolated segments first, points drawn over them.
        for i in 1..series.len() {
            let x1 = self.column(i - 1, series.len());
            let x2 = self.column(i, series.len());
            for x in x1..=x2.min(self.width - 1) {
                let t = if x2 > x1 {
                    (x - x1) as f32 / (x2 - x1) as f32
                } else {
                    0.0
                };
                let val = series[i - 1] * (1.0 - t) + series[i] * t;
                grid[self.row(val, min_val, range)][x] = '·';
            }
        }
        for (i, &val) in series.iter().enumerate() {
            let x = self.column(i, series.len()).min(self.width - 1);
            grid[self.row(val, min_val, range)][x] = '●';
        }

        let mut out = String::new();
        for (i, row) in grid.iter().enumerate() {
            if self.show_labels {
                let label = if i == 0 {
                    format!("{max_val:>8.4} ┤")
                } else if i == self.height - 1 {
                    format!("{min_val:>8.4} ┤")
                } else {
                    "         │".to_string()
                };
                out.push_str(&label);
            }
            out.extend(row.iter());
            out.push('\n');
        }
        if self.show_labels {
            out.push_str("         └");
            out.extend(std::iter::repeat('─').take(self.width));
            out.push('\n');
        }
        out
    }
}
