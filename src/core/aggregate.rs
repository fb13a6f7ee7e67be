//! Per-postal-code counting, summary statistics and threshold filtering.

use crate::core::location::ParsedLocation;
use crate::domain::model::{PostalAggregate, SummaryStatistics};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Unfiltered rows, count descending then postal code ascending.
    pub rows: Vec<PostalAggregate>,
    /// Records that carried no postal code and were left out of `rows`.
    pub skipped: usize,
}

impl Aggregation {
    pub fn counts(&self) -> Vec<u64> {
        self.rows.iter().map(|row| row.count).collect()
    }

    pub fn statistics(&self) -> Option<SummaryStatistics> {
        summarize(&self.counts())
    }
}

/// Groups parsed locations by postal code.
///
/// The block attached to each postal code is the one seen first in input
/// order.
pub fn count_by_postal_code<'a, I>(locations: I) -> Aggregation
where
    I: IntoIterator<Item = &'a ParsedLocation>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut rows: Vec<PostalAggregate> = Vec::new();
    let mut skipped = 0;

    for parsed in locations {
        let Some(code) = parsed.postal_code.as_deref() else {
            skipped += 1;
            continue;
        };

        match index.get(code) {
            Some(&pos) => rows[pos].count += 1,
            None => {
                index.insert(code, rows.len());
                let block = parsed.block.clone().unwrap_or_default();
                rows.push(PostalAggregate::new(code, 1, block));
            }
        }
    }

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.postal_code.cmp(&b.postal_code))
    });

    Aggregation { rows, skipped }
}

/// Mean, median and mode of a count distribution; `None` when it is empty.
///
/// Among equally frequent counts the largest one is reported as the mode.
pub fn summarize(counts: &[u64]) -> Option<SummaryStatistics> {
    if counts.is_empty() {
        return None;
    }

    let total: u64 = counts.iter().sum();
    let mean = total as f64 / counts.len() as f64;

    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    };

    let mut frequencies: HashMap<u64, usize> = HashMap::new();
    for &count in counts {
        *frequencies.entry(count).or_insert(0) += 1;
    }
    let mode = frequencies
        .into_iter()
        .max_by(|(value_a, freq_a), (value_b, freq_b)| match freq_a.cmp(freq_b) {
            Ordering::Equal => value_a.cmp(value_b),
            other => other,
        })
        .map(|(value, _)| value)?;

    Some(SummaryStatistics {
        mean,
        median,
        mode,
        sample_size: counts.len(),
    })
}

/// Keeps rows whose count meets or exceeds `min_count`.
pub fn filter_by_threshold(rows: Vec<PostalAggregate>, min_count: i64) -> Vec<PostalAggregate> {
    rows.into_iter()
        .filter(|row| i128::from(row.count) >= i128::from(min_count))
        .collect()
}
