//! Near-duplicate suppression for textual alerts

use super::similarity::similarity_ratio;
use std::collections::VecDeque;

/// Default similarity at or above which two texts count as duplicates
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Default number of recent texts remembered
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Bounded, insertion-ordered window of recently sent texts
///
/// A heuristic, not canonical dedup: headlines that differ only in
/// punctuation or a trailing attribution are meant to be caught. Price
/// alerts do not go through here; their baseline re-basing already keeps
/// them from repeating.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    window: VecDeque<String>,
    capacity: usize,
    threshold: f64,
}

impl DuplicateFilter {
    /// Create a filter; capacity is at least one
    pub fn new(capacity: usize, threshold: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
        }
    }

    /// Does the candidate closely match any remembered text?
    pub fn is_duplicate(&self, candidate: &str) -> bool {
        self.window
            .iter()
            .any(|seen| similarity_ratio(seen, candidate) >= self.threshold)
    }

    /// Remember a text, evicting the oldest entry beyond capacity
    pub fn remember(&mut self, text: impl Into<String>) {
        self.window.push_back(text.into());
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Returns `true` if the text is a duplicate; otherwise remembers it
    pub fn check_and_remember(&mut self, text: &str) -> bool {
        if self.is_duplicate(text) {
            return true;
        }
        self.remember(text);
        false
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_attribution_is_duplicate() {
        let mut filter = DuplicateFilter::default();
        filter.remember("Reliance Industries shares gain after strong quarterly results");

        assert!(filter
            .is_duplicate("Reliance Industries shares gain after strong quarterly results - Reuters"));
    }

    #[test]
    fn test_punctuation_difference_is_duplicate() {
        let mut filter = DuplicateFilter::default();
        filter.remember("Sensex, Nifty close higher amid global optimism");
        assert!(filter.is_duplicate("Sensex & Nifty close higher amid global optimism!"));
    }

    #[test]
    fn test_unrelated_headline_is_not_duplicate() {
        let mut filter = DuplicateFilter::default();
        filter.remember("Reliance Industries shares gain after strong quarterly results");

        assert!(!filter.is_duplicate("RBI keeps repo rate unchanged at 6.5%"));
    }

    #[test]
    fn test_check_and_remember() {
        let mut filter = DuplicateFilter::default();
        assert!(!filter.check_and_remember("TCS and Infosys advance as IT sector recovers"));
        assert!(filter.check_and_remember("TCS and Infosys advance as IT sector recovers."));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let mut filter = DuplicateFilter::new(2, DEFAULT_SIMILARITY_THRESHOLD);
        filter.remember("Adani Ports hits new high on cargo growth");
        filter.remember("HDFC Bank lifts banking sector");
        filter.remember("Wipro wins large deal in Europe");

        assert_eq!(filter.len(), 2);
        assert!(!filter.is_duplicate("Adani Ports hits new high on cargo growth"));
        assert!(filter.is_duplicate("Wipro wins large deal in Europe"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut filter = DuplicateFilter::new(0, 0.7);
        filter.remember("a headline");
        assert_eq!(filter.capacity(), 1);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_empty_window_has_no_duplicates() {
        let filter = DuplicateFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.is_duplicate("anything"));
    }
}
