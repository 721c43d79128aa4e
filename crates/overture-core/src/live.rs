//! Live-edge tracking
//!
//! Live streams frequently report empty or unstable seekable ranges, so a
//! usable duration and edge position have to be derived. The tracker
//! ratchets a synthetic duration from whatever the engine does report and
//! never lets it move backwards within a source session.

use crate::time_ranges::TimeRanges;

/// Output of one tracker sync
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveEdgeSample {
    /// Synthetic duration (monotonic within a session)
    pub duration: f64,
    /// Most recent playable position of the stream
    pub live_sync_position: f64,
    /// Whether the playhead is within the edge window
    pub at_edge: bool,
}

/// Derives a synthetic duration/position for live streams
#[derive(Debug)]
pub struct LiveEdgeTracker {
    tolerance: f64,
    enabled: bool,
    min_duration: f64,
}

impl LiveEdgeTracker {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            enabled: false,
            min_duration: 0.0,
        }
    }

    /// Begin tracking. Idempotent.
    pub fn start(&mut self) {
        self.enabled = true;
    }

    /// Stop tracking without discarding the ratchet. Idempotent.
    pub fn stop(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Discard state for a new source session.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.min_duration = 0.0;
    }

    /// Fold a playhead/seekable observation into the tracker.
    ///
    /// Returns `None` while stopped.
    pub fn sync(&mut self, current_time: f64, seekable: &TimeRanges) -> Option<LiveEdgeSample> {
        if !self.enabled {
            return None;
        }

        let reported_end = seekable.end().filter(|end| end.is_finite());
        let live_sync_position = reported_end.unwrap_or(current_time).max(current_time);

        self.min_duration = self.min_duration.max(live_sync_position);

        let edge_start = (live_sync_position - self.tolerance).max(0.0);
        Some(LiveEdgeSample {
            duration: self.min_duration,
            live_sync_position,
            at_edge: current_time >= edge_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_tracker_yields_nothing() {
        let mut tracker = LiveEdgeTracker::new(10.0);
        assert!(tracker.sync(5.0, &TimeRanges::empty()).is_none());
    }

    #[test]
    fn test_duration_ratchets_forward() {
        let mut tracker = LiveEdgeTracker::new(10.0);
        tracker.start();

        let seekable = TimeRanges::from_ranges([(0.0, 120.0)]);
        let sample = tracker.sync(100.0, &seekable).unwrap();
        assert_eq!(sample.duration, 120.0);

        // A shrinking seekable window must not pull duration backwards
        let seekable = TimeRanges::from_ranges([(0.0, 90.0)]);
        let sample = tracker.sync(80.0, &seekable).unwrap();
        assert_eq!(sample.duration, 120.0);
    }

    #[test]
    fn test_synthetic_position_without_seekable_ranges() {
        let mut tracker = LiveEdgeTracker::new(10.0);
        tracker.start();

        let sample = tracker.sync(45.0, &TimeRanges::empty()).unwrap();
        assert_eq!(sample.live_sync_position, 45.0);
        assert!(sample.at_edge);
    }

    #[test]
    fn test_edge_window() {
        let mut tracker = LiveEdgeTracker::new(10.0);
        tracker.start();
        let seekable = TimeRanges::from_ranges([(0.0, 100.0)]);

        let sample = tracker.sync(95.0, &seekable).unwrap();
        assert!(sample.at_edge);

        let sample = tracker.sync(60.0, &seekable).unwrap();
        assert!(!sample.at_edge);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut tracker = LiveEdgeTracker::new(10.0);
        tracker.start();
        tracker.start();
        assert!(tracker.is_enabled());
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_enabled());
    }
}
