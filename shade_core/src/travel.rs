//! Open-loop travel position estimation.
//!
//! A `TravelEstimator` converts elapsed time into a position estimate
//! for one axis of a cover that has no feedback sensor. It knows the
//! full-traversal durations for each direction and an optional startup
//! delay, and extrapolates linearly between the last known position and
//! the commanded target. Travel time scales with distance, never with
//! absolute position.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shade_traits::clock::Clock;

/// Position percentage of a fully closed cover.
pub const POSITION_CLOSED: u8 = 0;
/// Position percentage of a fully open cover.
pub const POSITION_OPEN: u8 = 100;

const FULL_RANGE: u8 = POSITION_OPEN - POSITION_CLOSED;

/// Provenance of the current position estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    /// Before first use; nothing has been set or calculated yet.
    Unknown,
    /// Extrapolated from elapsed travel time.
    Calculated,
    /// Pinned by an explicit `set_position` (restore or recalibration).
    Confirmed,
}

/// Current travel direction of the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Stopped,
}

/// Position estimator for one travel axis (primary position or tilt).
pub struct TravelEstimator {
    travel_time_down: Duration,
    travel_time_up: Duration,
    startup_delay: Duration,
    last_known_position: u8,
    travel_to_position: u8,
    travel_started_at: Instant,
    direction: Direction,
    kind: PositionKind,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for TravelEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TravelEstimator")
            .field("last_known_position", &self.last_known_position)
            .field("travel_to_position", &self.travel_to_position)
            .field("direction", &self.direction)
            .field("kind", &self.kind)
            .finish()
    }
}

impl TravelEstimator {
    pub fn new(
        travel_time_down: Duration,
        travel_time_up: Duration,
        startup_delay: Duration,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let now = clock.now();
        Self {
            travel_time_down,
            travel_time_up,
            startup_delay,
            last_known_position: POSITION_CLOSED,
            travel_to_position: POSITION_CLOSED,
            travel_started_at: now,
            direction: Direction::Stopped,
            kind: PositionKind::Unknown,
            clock,
        }
    }

    /// Pin the axis to a known position (restore or recalibration).
    /// Does not alter the travel direction; caller clamps to [0, 100].
    pub fn set_position(&mut self, position: u8) {
        let position = position.min(POSITION_OPEN);
        self.last_known_position = position;
        self.travel_to_position = position;
        self.kind = PositionKind::Confirmed;
    }

    /// Stop traveling, snapshotting the calculated position. Idempotent.
    pub fn stop(&mut self) {
        self.last_known_position = self.current_position();
        self.travel_to_position = self.last_known_position;
        self.kind = PositionKind::Calculated;
        self.direction = Direction::Stopped;
    }

    /// Start traveling toward `target`. A target equal to the current
    /// known position leaves the axis stopped rather than recording a
    /// zero-length leg.
    pub fn start_travel(&mut self, target: u8) {
        self.stop();
        let target = target.min(POSITION_OPEN);
        self.travel_to_position = target;
        if target == self.last_known_position {
            return;
        }
        self.travel_started_at = self.clock.now();
        self.kind = PositionKind::Calculated;
        self.direction = if target > self.last_known_position {
            Direction::Up
        } else {
            Direction::Down
        };
    }

    pub fn start_travel_up(&mut self) {
        self.start_travel(POSITION_OPEN);
    }

    pub fn start_travel_down(&mut self) {
        self.start_travel(POSITION_CLOSED);
    }

    /// Current (calculated or known) position in [0, 100].
    pub fn current_position(&self) -> u8 {
        if self.kind == PositionKind::Calculated {
            self.calculate_position()
        } else {
            self.last_known_position
        }
    }

    pub fn is_traveling(&self) -> bool {
        self.current_position() != self.travel_to_position
    }

    pub fn position_reached(&self) -> bool {
        self.current_position() == self.travel_to_position
    }

    pub fn is_open(&self) -> bool {
        self.current_position() == POSITION_OPEN
    }

    pub fn is_closed(&self) -> bool {
        self.current_position() == POSITION_CLOSED
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn position_kind(&self) -> PositionKind {
        self.kind
    }

    pub fn target(&self) -> u8 {
        self.travel_to_position
    }

    fn calculate_position(&self) -> u8 {
        if self.direction == Direction::Stopped {
            return self.last_known_position;
        }

        let elapsed = self.clock.since(self.travel_started_at);
        if elapsed < self.startup_delay {
            // Motor spin-up lag; motion has not begun.
            return self.last_known_position;
        }
        let effective = elapsed - self.startup_delay;

        let relative =
            i16::from(self.travel_to_position) - i16::from(self.last_known_position);
        let full_leg = self.leg_time(relative);
        if full_leg.is_zero() || effective >= full_leg {
            return self.travel_to_position;
        }

        let progress = effective.as_secs_f64() / full_leg.as_secs_f64();
        let position = f64::from(self.last_known_position) + f64::from(relative) * progress;
        // progress < 1 keeps the value strictly between start and target,
        // so the cast back to u8 cannot leave [0, 100].
        position.round() as u8
    }

    /// Time to traverse `relative` percentage points, scaled linearly
    /// from the full-range duration of the matching direction.
    fn leg_time(&self, relative: i16) -> Duration {
        if relative == 0 {
            return Duration::ZERO;
        }
        let full = if relative > 0 {
            self.travel_time_up
        } else {
            self.travel_time_down
        };
        full.mul_f64(f64::from(relative.unsigned_abs()) / f64::from(FULL_RANGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ManualClock;
    use rstest::rstest;

    fn estimator(clock: &ManualClock) -> TravelEstimator {
        TravelEstimator::new(
            Duration::from_secs(20),
            Duration::from_secs(25),
            Duration::ZERO,
            Arc::new(clock.clone()),
        )
    }

    #[rstest]
    #[case(0)]
    #[case(37)]
    #[case(100)]
    fn set_position_pins_and_parks(#[case] p: u8) {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(p);
        assert_eq!(est.current_position(), p);
        assert!(!est.is_traveling());
        assert_eq!(est.position_kind(), PositionKind::Confirmed);
    }

    #[test]
    fn asymmetric_travel_up_scales_linearly() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(0);
        est.start_travel_up();

        clock.advance(Duration::from_millis(12_500));
        assert_eq!(est.current_position(), 50);

        clock.advance(Duration::from_millis(12_500));
        assert_eq!(est.current_position(), 100);
        assert!(!est.is_traveling());
        assert!(est.is_open());
    }

    #[test]
    fn travel_down_uses_down_duration() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(100);
        est.start_travel_down();

        clock.advance(Duration::from_secs(10));
        assert_eq!(est.current_position(), 50);
        clock.advance(Duration::from_secs(10));
        assert!(est.is_closed());
    }

    #[test]
    fn startup_delay_holds_position() {
        let clock = ManualClock::new();
        let mut est = TravelEstimator::new(
            Duration::from_secs(20),
            Duration::from_secs(25),
            Duration::from_secs(1),
            Arc::new(clock.clone()),
        );
        est.set_position(0);
        est.start_travel_up();

        clock.advance(Duration::from_millis(900));
        assert_eq!(est.current_position(), 0);

        // Past the delay, only the effective elapsed time counts.
        clock.advance(Duration::from_millis(100));
        clock.advance(Duration::from_millis(12_500));
        assert_eq!(est.current_position(), 50);
    }

    #[test]
    fn stop_snapshots_midway_position() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(0);
        est.start_travel_up();
        clock.advance(Duration::from_secs(5));
        let midway = est.current_position();
        assert_eq!(midway, 20);

        est.stop();
        assert_eq!(est.direction(), Direction::Stopped);
        clock.advance(Duration::from_secs(60));
        assert_eq!(est.current_position(), midway);
    }

    #[test]
    fn stop_is_idempotent() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(40);
        est.start_travel(80);
        clock.advance(Duration::from_secs(3));

        est.stop();
        let first = est.current_position();
        est.stop();
        assert_eq!(est.current_position(), first);
        assert_eq!(est.target(), first);
    }

    #[test]
    fn resume_after_interruption_scales_from_snapshot() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(0);
        est.start_travel_up();
        clock.advance(Duration::from_millis(12_500));
        est.stop();
        assert_eq!(est.current_position(), 50);

        // Remaining half leg takes half the full up time again.
        est.start_travel(100);
        clock.advance(Duration::from_millis(6_250));
        assert_eq!(est.current_position(), 75);
        clock.advance(Duration::from_millis(6_250));
        assert_eq!(est.current_position(), 100);
    }

    #[test]
    fn target_equal_to_position_stays_stopped() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(60);
        est.start_travel(60);
        assert_eq!(est.direction(), Direction::Stopped);
        assert!(!est.is_traveling());
        clock.advance(Duration::from_secs(30));
        assert_eq!(est.current_position(), 60);
    }

    #[test]
    fn direction_matches_target_side() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(50);
        est.start_travel(90);
        assert_eq!(est.direction(), Direction::Up);
        est.stop();
        est.start_travel(10);
        assert_eq!(est.direction(), Direction::Down);
    }

    #[test]
    fn partial_leg_arrives_at_target_not_extreme() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(20);
        est.start_travel(70);
        // 50% of range going up: leg time = 12.5 s.
        clock.advance(Duration::from_secs(60));
        assert_eq!(est.current_position(), 70);
        assert!(est.position_reached());
    }

    #[test]
    fn monotonic_while_traveling_up() {
        let clock = ManualClock::new();
        let mut est = estimator(&clock);
        est.set_position(0);
        est.start_travel_up();
        let mut last = 0;
        for _ in 0..50 {
            clock.advance(Duration::from_millis(600));
            let p = est.current_position();
            assert!(p >= last, "position regressed: {p} < {last}");
            last = p;
        }
        assert_eq!(last, 100);
    }
}
