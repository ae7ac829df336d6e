//! Class distribution of a data loader.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::loader::ImageDataLoader;

/// Number of samples per class, keyed by class name in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDistribution {
    counts: Vec<(String, usize)>,
}

impl ClassDistribution {
    fn record(&mut self, name: &str) {
        match self.counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((name.to_string(), 1)),
        }
    }

    /// `(class name, count)` pairs in first-seen order.
    #[must_use]
    pub fn counts(&self) -> &[(String, usize)] {
        &self.counts
    }

    /// Count for one class, zero if it never appeared.
    #[must_use]
    pub fn get(&self, name: &str) -> usize {
        self.counts
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0, |(_, c)| *c)
    }

    /// Total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }
}

impl fmt::Display for ClassDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, count)) in self.counts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{name}': {count}")?;
        }
        f.write_str("}")
    }
}

/// Count the samples of each class in the order the loader visits them.
#[must_use]
pub fn class_distribution(loader: &ImageDataLoader) -> ClassDistribution {
    let names = loader.class_names();
    let mut distribution = ClassDistribution::default();
    for labels in loader.label_batches() {
        for label in labels {
            distribution.record(&names[label]);
        }
    }
    tracing::debug!(
        "Counted {} samples over {} classes",
        distribution.total(),
        distribution.counts.len()
    );
    distribution
}

/// Print the class distribution of a loader to stdout.
pub fn print_data_stats(loader: &ImageDataLoader) -> ClassDistribution {
    let distribution = class_distribution(loader);
    println!("{distribution}");
    distribution
}
