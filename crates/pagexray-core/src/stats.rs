use serde::{Deserialize, Serialize};

/// Min/median/max of a sample set, each rounded to the nearest integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub min: i64,
    pub median: i64,
    pub max: i64,
}

/// Finalize-once accumulator of numeric samples.
///
/// `summarize` consumes the accumulator, so a set of samples can only be
/// reduced once.
#[derive(Debug, Clone, Default)]
pub struct OrderStatistics {
    values: Vec<f64>,
}

impl OrderStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) -> &mut Self {
        self.values.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `None` when no samples were added.
    pub fn summarize(self) -> Option<Summary> {
        let mut values = self.values;
        if values.is_empty() {
            return None;
        }

        values.sort_by(f64::total_cmp);

        let middle = values.len() / 2;
        let median = if values.len().is_multiple_of(2) {
            (values[middle - 1] + values[middle]) / 2.0
        } else {
            values[middle]
        };

        Some(Summary {
            min: round(values[0]),
            median: round(median),
            max: round(values[values.len() - 1]),
        })
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}
