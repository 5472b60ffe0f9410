//! Active range history and the distance heuristic used for reuse and purge.
//!
//! Only the two most recent ranges are remembered. When they overlap, the
//! direction of travel is inferred from them and indices ahead of the current
//! range count as distance 0, since they are about to scroll into view.

/// Inclusive range of indices that the layout pass currently renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveRange {
    pub from: usize,
    pub to: usize,
}

impl ActiveRange {
    /// Creates a range, swapping the bounds if they arrive reversed.
    pub fn new(from: usize, to: usize) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.from <= index && index <= self.to
    }

    /// Number of indices covered, saturating at `usize::MAX` for `[0, usize::MAX]`.
    pub fn width(&self) -> usize {
        (self.to - self.from).saturating_add(1)
    }

    pub fn overlaps(&self, other: &ActiveRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &ActiveRange) -> ActiveRange {
        ActiveRange {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }

    /// Gap between `index` and the nearer boundary; 0 inside the range.
    pub fn gap(&self, index: usize) -> usize {
        if index < self.from {
            self.from - index
        } else if index > self.to {
            index - self.to
        } else {
            0
        }
    }
}

/// Direction implied by the last two active ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards higher indices.
    Forward,
    /// Towards lower indices.
    Backward,
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    current: Option<ActiveRange>,
    previous: Option<ActiveRange>,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts the current range into the previous slot and stores the new one.
    pub fn set_active_range(&mut self, from: usize, to: usize) -> ActiveRange {
        let range = ActiveRange::new(from, to);
        self.previous = self.current.replace(range);
        range
    }

    pub fn current(&self) -> Option<ActiveRange> {
        self.current
    }

    pub fn previous(&self) -> Option<ActiveRange> {
        self.previous
    }

    pub fn direction(&self) -> ScrollDirection {
        let (Some(current), Some(previous)) = (self.current, self.previous) else {
            return ScrollDirection::Idle;
        };
        if (current.from, current.to) > (previous.from, previous.to) {
            ScrollDirection::Forward
        } else if (current.from, current.to) < (previous.from, previous.to) {
            ScrollDirection::Backward
        } else {
            ScrollDirection::Idle
        }
    }

    /// Distance of `index` from the active range.
    ///
    /// `None` stands for a key that currently has no index (dropped by an
    /// invalidation) and always reports `usize::MAX`. Before any range is set
    /// every index is at distance 0.
    pub fn distance_from_range(&self, index: Option<usize>) -> usize {
        let Some(index) = index else {
            return usize::MAX;
        };
        let Some(current) = self.current else {
            return 0;
        };
        if current.contains(index) {
            return 0;
        }
        let scrolling_steadily = self
            .previous
            .is_some_and(|previous| previous.overlaps(&current));
        if scrolling_steadily {
            match self.direction() {
                ScrollDirection::Forward if index > current.to => return 0,
                ScrollDirection::Backward if index < current.from => return 0,
                _ => {}
            }
        }
        current.gap(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_bounds_are_normalized() {
        let range = ActiveRange::new(9, 4);
        assert_eq!(range, ActiveRange { from: 4, to: 9 });
        assert_eq!(range.width(), 6);
    }

    #[test]
    fn full_index_space_width_saturates() {
        assert_eq!(ActiveRange::new(0, usize::MAX).width(), usize::MAX);
        assert_eq!(ActiveRange::new(1, usize::MAX).width(), usize::MAX);
        assert_eq!(ActiveRange::new(7, 7).width(), 1);
    }

    #[test]
    fn no_range_means_zero_distance() {
        let tracker = RangeTracker::new();
        assert_eq!(tracker.distance_from_range(Some(500)), 0);
        assert_eq!(tracker.distance_from_range(None), usize::MAX);
        assert_eq!(tracker.direction(), ScrollDirection::Idle);
    }

    #[test]
    fn distance_inside_and_outside_single_range() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(10, 20);
        assert_eq!(tracker.distance_from_range(Some(10)), 0);
        assert_eq!(tracker.distance_from_range(Some(20)), 0);
        // 7 is three below the lower bound
        assert_eq!(tracker.distance_from_range(Some(7)), 3);
        // 25 is five above the upper bound
        assert_eq!(tracker.distance_from_range(Some(25)), 5);
    }

    #[test]
    fn only_two_ranges_are_remembered() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(0, 4);
        tracker.set_active_range(2, 6);
        tracker.set_active_range(3, 7);
        assert_eq!(tracker.previous(), Some(ActiveRange::new(2, 6)));
        assert_eq!(tracker.current(), Some(ActiveRange::new(3, 7)));
    }

    #[test]
    fn overlapping_forward_scroll_keeps_indices_ahead() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(0, 9);
        tracker.set_active_range(5, 14);
        assert_eq!(tracker.direction(), ScrollDirection::Forward);
        // Ahead of the scroll: about to enter the viewport.
        assert_eq!(tracker.distance_from_range(Some(30)), 0);
        // Behind the scroll: plain gap.
        assert_eq!(tracker.distance_from_range(Some(2)), 3);
    }

    #[test]
    fn overlapping_backward_scroll_keeps_indices_behind() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(20, 29);
        tracker.set_active_range(15, 24);
        assert_eq!(tracker.direction(), ScrollDirection::Backward);
        assert_eq!(tracker.distance_from_range(Some(3)), 0);
        assert_eq!(tracker.distance_from_range(Some(30)), 6);
    }

    #[test]
    fn jump_without_overlap_uses_plain_gap() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(3, 5);
        tracker.set_active_range(10, 12);
        assert_eq!(tracker.direction(), ScrollDirection::Forward);
        assert_eq!(tracker.distance_from_range(Some(4)), 6);
        assert_eq!(tracker.distance_from_range(Some(15)), 3);
    }

    #[test]
    fn distance_is_monotonic_away_from_range() {
        let mut tracker = RangeTracker::new();
        tracker.set_active_range(50, 60);
        let above: Vec<usize> = (61..200)
            .map(|i| tracker.distance_from_range(Some(i)))
            .collect();
        assert!(above.windows(2).all(|pair| pair[0] <= pair[1]));
        let below: Vec<usize> = (0..50)
            .rev()
            .map(|i| tracker.distance_from_range(Some(i)))
            .collect();
        assert!(below.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
