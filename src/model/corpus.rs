//! Bounded sliding-window training corpus.

use crate::error::{FitrecError, Result};
use crate::types::{FeatureVector, Goal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One labelled training row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub features: FeatureVector,
    pub label: Goal,
}

impl CorpusRow {
    pub fn new(features: FeatureVector, label: Goal) -> Self {
        Self { features, label }
    }
}

/// Ordered rows, oldest first, never longer than `cap`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCorpus {
    cap: usize,
    rows: VecDeque<CorpusRow>,
}

impl TrainingCorpus {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            rows: VecDeque::new(),
        }
    }

    pub fn from_rows(cap: usize, rows: impl IntoIterator<Item = CorpusRow>) -> Self {
        let mut corpus = Self::new(cap);
        corpus.append(rows);
        corpus
    }

    /// Append rows, evicting the oldest so the length stays within the cap.
    /// Returns how many rows were evicted.
    pub fn append(&mut self, rows: impl IntoIterator<Item = CorpusRow>) -> usize {
        let mut evicted = 0;
        for row in rows {
            self.rows.push_back(row);
            if self.rows.len() > self.cap {
                self.rows.pop_front();
                evicted += 1;
            }
        }
        evicted
    }

    /// Change the cap, trimming the oldest rows if needed
    pub fn set_cap(&mut self, cap: usize) -> usize {
        self.cap = cap;
        let excess = self.rows.len().saturating_sub(cap);
        self.rows.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn rows(&self) -> impl Iterator<Item = &CorpusRow> {
        self.rows.iter()
    }

    /// Row counts per label, in `Goal::ALL` order
    pub fn label_counts(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for row in &self.rows {
            if let Some(idx) = Goal::ALL.iter().position(|g| *g == row.label) {
                counts[idx] += 1;
            }
        }
        counts
    }

    /// Checks applied to a corpus read back from disk
    pub fn validate(&self) -> Result<()> {
        if self.rows.len() > self.cap {
            return Err(FitrecError::Validation(format!(
                "Corpus holds {} rows, cap is {}",
                self.rows.len(),
                self.cap
            )));
        }
        if let Some(pos) = self.rows.iter().position(|r| !r.features.is_finite()) {
            return Err(FitrecError::Validation(format!(
                "Corpus row {} has non-finite features",
                pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sex;
    use proptest::prelude::*;

    fn row(age: f64) -> CorpusRow {
        CorpusRow::new(
            FeatureVector::new(age, 70.0, 175.0, Sex::Male, 22.9),
            Goal::GeneralHealth,
        )
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut corpus = TrainingCorpus::from_rows(3, (0..3).map(|i| row(20.0 + i as f64)));
        let evicted = corpus.append(vec![row(50.0), row(51.0)]);

        assert_eq!(evicted, 2);
        let ages: Vec<f64> = corpus.rows().map(|r| r.features.values()[0]).collect();
        assert_eq!(ages, vec![22.0, 50.0, 51.0]);
    }

    #[test]
    fn test_set_cap_trims() {
        let mut corpus = TrainingCorpus::from_rows(10, (0..8).map(|i| row(20.0 + i as f64)));
        assert_eq!(corpus.set_cap(5), 3);
        assert_eq!(corpus.len(), 5);
        assert_eq!(corpus.rows().next().unwrap().features.values()[0], 23.0);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut corpus = TrainingCorpus::new(4);
        corpus.append(vec![row(f64::NAN)]);
        assert!(corpus.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_cap(
            cap in 1usize..64,
            batches in proptest::collection::vec(0usize..40, 0..8),
        ) {
            let mut corpus = TrainingCorpus::new(cap);
            let mut total = 0usize;
            for batch in batches {
                corpus.append((0..batch).map(|i| row(20.0 + (total + i) as f64)));
                total += batch;
                prop_assert!(corpus.len() <= cap);
                prop_assert_eq!(corpus.len(), total.min(cap));
            }
            // newest row always survives
            if total > 0 {
                let last = corpus.rows().last().unwrap().features.values()[0];
                prop_assert_eq!(last, 20.0 + (total - 1) as f64);
            }
        }
    }
}
