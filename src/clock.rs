//! Master race clock.
//!
//! The clock never reads the wall clock itself: every state change takes the
//! `Instant` it happens at. The event loop feeds it `Instant::now()`, tests
//! feed it `t0 + Duration::from_millis(..)`.

use std::time::Instant;

use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub struct Clock {
    state: ClockState,
    /// elapsed value when the current running segment began
    base_ms: u64,
    segment_start: Option<Instant>,
    elapsed_ms: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Stopped,
            base_ms: 0,
            segment_start: None,
            elapsed_ms: 0,
        }
    }

    /// A paused clock holding a previously persisted reading.
    pub fn restored(elapsed_ms: u64) -> Self {
        Self {
            state: if elapsed_ms > 0 {
                ClockState::Paused
            } else {
                ClockState::Stopped
            },
            base_ms: elapsed_ms,
            segment_start: None,
            elapsed_ms,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Returns false when the clock was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.base_ms = self.elapsed_ms;
        self.segment_start = Some(now);
        self.state = ClockState::Running;
        info!(elapsed_ms = self.elapsed_ms, "clock started");
        true
    }

    /// Returns false when the clock was not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.is_running() {
            return false;
        }
        self.tick(now);
        self.base_ms = self.elapsed_ms;
        self.segment_start = None;
        self.state = ClockState::Paused;
        info!(elapsed_ms = self.elapsed_ms, "clock paused");
        true
    }

    /// Back to zero. A running clock keeps running from zero.
    pub fn reset(&mut self, now: Instant) {
        self.elapsed_ms = 0;
        self.base_ms = 0;
        if self.is_running() {
            self.segment_start = Some(now);
        } else {
            self.segment_start = None;
            self.state = ClockState::Stopped;
        }
        info!(running = self.is_running(), "clock reset");
    }

    /// Advance the reading to `now`. Never moves backwards, even if `now`
    /// precedes a previous tick.
    pub fn tick(&mut self, now: Instant) -> u64 {
        if let (ClockState::Running, Some(start)) = (self.state, self.segment_start) {
            let segment = now.saturating_duration_since(start).as_millis() as u64;
            let reading = self.base_ms.saturating_add(segment);
            self.elapsed_ms = self.elapsed_ms.max(reading);
        }
        self.elapsed_ms
    }

    /// Reading as of the last tick or state change.
    pub fn elapsed(&self) -> u64 {
        self.elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn new_clock_is_stopped_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn ticks_advance_only_while_running() {
        let t0 = Instant::now();
        let mut clock = Clock::new();

        assert_eq!(clock.tick(t0 + ms(500)), 0);

        assert!(clock.start(t0));
        assert_eq!(clock.tick(t0 + ms(1_250)), 1_250);

        assert!(clock.pause(t0 + ms(2_000)));
        assert_eq!(clock.elapsed(), 2_000);
        assert_eq!(clock.tick(t0 + ms(9_000)), 2_000);
    }

    #[test]
    fn resume_continues_from_paused_value() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        clock.start(t0);
        clock.pause(t0 + ms(1_000));

        clock.start(t0 + ms(5_000));
        assert_eq!(clock.tick(t0 + ms(5_400)), 1_400);
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        assert!(clock.start(t0));
        assert!(!clock.start(t0 + ms(300)));
        assert_eq!(clock.tick(t0 + ms(1_000)), 1_000);
    }

    #[test]
    fn pause_when_not_running_is_a_no_op() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        assert!(!clock.pause(t0));
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn reset_while_running_keeps_running_from_zero() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        clock.start(t0);
        clock.tick(t0 + ms(3_000));

        clock.reset(t0 + ms(3_000));
        assert!(clock.is_running());
        assert_eq!(clock.elapsed(), 0);
        assert_eq!(clock.tick(t0 + ms(3_500)), 500);
    }

    #[test]
    fn reset_while_paused_stops() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        clock.start(t0);
        clock.pause(t0 + ms(700));

        clock.reset(t0 + ms(800));
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn reading_is_monotonic_under_out_of_order_ticks() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        clock.start(t0);
        assert_eq!(clock.tick(t0 + ms(900)), 900);
        assert_eq!(clock.tick(t0 + ms(400)), 900);
    }

    #[test]
    fn restored_clock_is_paused_at_saved_value() {
        let t0 = Instant::now();
        let mut clock = Clock::restored(42_000);
        assert_eq!(clock.state(), ClockState::Paused);
        assert_eq!(clock.elapsed(), 42_000);

        clock.start(t0);
        assert_eq!(clock.tick(t0 + ms(1_000)), 43_000);
        assert_eq!(Clock::restored(0).state(), ClockState::Stopped);
    }
}
