use crate::units::{ns_to_ms, Nanosecs};

/// The end-to-end delays observed in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelaySamples {
    samples: Vec<Nanosecs>,
}

impl DelaySamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delay: Nanosecs) {
        self.samples.push(delay);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Nanosecs> + '_ {
        self.samples.iter().copied()
    }

    /// The mean delay in nanoseconds, or `None` if there are no samples.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total = self.samples.iter().map(|d| d.into_f64()).sum::<f64>();
        Some(total / self.samples.len() as f64)
    }

    /// The mean delay in milliseconds, or `None` if there are no samples.
    pub fn mean_ms(&self) -> Option<f64> {
        self.mean().map(ns_to_ms)
    }
}

impl FromIterator<Nanosecs> for DelaySamples {
    fn from_iter<I: IntoIterator<Item = Nanosecs>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
