//! Immutable time-range sets for buffered/seekable/played queries

use serde::{Deserialize, Serialize};

/// A single `[start, end)` interval on the media timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// An ordered, non-overlapping set of time ranges.
///
/// Mirrors the shape engines report for buffered, seekable, and played
/// regions. All mutating operations return a new set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRanges {
    ranges: Vec<TimeRange>,
}

impl TimeRanges {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from possibly unordered, possibly overlapping intervals.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut set = Self::empty();
        for (start, end) in ranges {
            set = set.add(start, end);
        }
        set
    }

    /// A new set with `[start, end)` added, merging any overlap.
    pub fn add(&self, start: f64, end: f64) -> Self {
        let incoming = TimeRange::new(start, end);
        let mut merged: Vec<TimeRange> = Vec::with_capacity(self.ranges.len() + 1);
        let mut pending = incoming;

        for range in &self.ranges {
            if range.end < pending.start || range.start > pending.end {
                merged.push(*range);
            } else {
                pending = TimeRange::new(
                    pending.start.min(range.start),
                    pending.end.max(range.end),
                );
            }
        }

        merged.push(pending);
        merged.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { ranges: merged }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TimeRange> {
        self.ranges.get(index).copied()
    }

    /// Start of the earliest range
    pub fn start(&self) -> Option<f64> {
        self.ranges.first().map(|r| r.start)
    }

    /// End of the latest range
    pub fn end(&self) -> Option<f64> {
        self.ranges.last().map(|r| r.end)
    }

    /// Total covered duration across all ranges
    pub fn length(&self) -> f64 {
        self.ranges.iter().map(TimeRange::duration).sum()
    }

    pub fn contains(&self, time: f64) -> bool {
        self.ranges
            .iter()
            .any(|r| time >= r.start && time < r.end)
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeRange> + '_ {
        self.ranges.iter().copied()
    }
}

impl std::fmt::Display for TimeRanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}-{:.3}", range.start, range.end)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_disjoint() {
        let ranges = TimeRanges::empty().add(0.0, 4.0).add(8.0, 12.0);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges.start(), Some(0.0));
        assert_eq!(ranges.end(), Some(12.0));
        assert_eq!(ranges.length(), 8.0);
    }

    #[test]
    fn test_add_merges_overlap() {
        let ranges = TimeRanges::empty().add(0.0, 5.0).add(3.0, 10.0);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges.get(0), Some(TimeRange::new(0.0, 10.0)));
    }

    #[test]
    fn test_add_merges_touching() {
        let ranges = TimeRanges::empty().add(0.0, 4.0).add(4.0, 8.0);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges.length(), 8.0);
    }

    #[test]
    fn test_contains() {
        let ranges = TimeRanges::from_ranges([(0.0, 4.0), (8.0, 12.0)]);
        assert!(ranges.contains(2.0));
        assert!(!ranges.contains(6.0));
        assert!(ranges.contains(8.0));
        assert!(!ranges.contains(12.0));
    }

    #[test]
    fn test_unordered_input() {
        let ranges = TimeRanges::from_ranges([(10.0, 12.0), (0.0, 2.0), (5.0, 6.0)]);
        assert_eq!(ranges.start(), Some(0.0));
        assert_eq!(ranges.end(), Some(12.0));
        assert_eq!(ranges.len(), 3);
    }

    #[test]
    fn test_inverted_range_is_clamped() {
        let ranges = TimeRanges::empty().add(5.0, 3.0);
        assert_eq!(ranges.get(0), Some(TimeRange::new(5.0, 5.0)));
        assert_eq!(ranges.length(), 0.0);
    }
}
