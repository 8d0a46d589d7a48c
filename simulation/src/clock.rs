//! Fixed-timestep accumulator decoupling logic from the caller's frame rate.

use std::time::Duration;

use grid_defence_core::RejectionReason;

/// Slowest supported speed multiplier.
pub const MIN_SPEED: u8 = 1;
/// Fastest supported speed multiplier.
pub const MAX_SPEED: u8 = 4;
/// Logical ticks of backlog kept per unit of speed; anything beyond is dropped.
pub const MAX_BACKLOG_TICKS: u32 = 5;

/// Converts real elapsed time into a whole number of fixed logical ticks.
///
/// Real time is scaled by the speed multiplier before it enters the
/// accumulator, so `n` ticks at speed one and the same `n` ticks at speed three
/// run the same logic. Durations are integer nanoseconds and the scaling is
/// exact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationClock {
    tick: Duration,
    speed: u8,
    paused: bool,
    accumulator: Duration,
    ticks: u64,
}

impl SimulationClock {
    /// Creates a running clock at speed one.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            speed: MIN_SPEED,
            paused: false,
            accumulator: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Length of one logical tick.
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Current speed multiplier.
    #[must_use]
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Changes the speed multiplier. Only `1..=4` is accepted.
    pub fn set_speed(&mut self, speed: u8) -> Result<(), RejectionReason> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(RejectionReason::InvalidSpeed);
        }
        self.speed = speed;
        Ok(())
    }

    /// Reports whether the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Flips the pause flag and returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Scaled time waiting to be drained into ticks.
    #[must_use]
    pub fn backlog(&self) -> Duration {
        self.accumulator
    }

    /// Logical ticks released since the clock was created.
    #[must_use]
    pub fn ticks_released(&self) -> u64 {
        self.ticks
    }

    /// Throws away any accumulated backlog.
    pub fn discard_backlog(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Feeds real elapsed time and returns how many ticks are now due.
    ///
    /// Nothing accumulates while paused. The accumulator is capped at
    /// [`MAX_BACKLOG_TICKS`] ticks per unit of speed, so a long stall does not
    /// turn into a burst of catch-up ticks.
    pub fn advance(&mut self, real: Duration) -> u32 {
        if self.paused || self.tick.is_zero() {
            return 0;
        }

        let speed = u32::from(self.speed);
        let cap = self.tick.saturating_mul(MAX_BACKLOG_TICKS * speed);
        self.accumulator = self
            .accumulator
            .saturating_add(real.saturating_mul(speed))
            .min(cap);

        let mut due = 0;
        while self.accumulator >= self.tick {
            self.accumulator -= self.tick;
            due += 1;
        }
        self.ticks += u64::from(due);
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_defence_core::FIXED_TICK;

    #[test]
    fn partial_frames_carry_over() {
        let mut clock = SimulationClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_millis(6)), 0);
        assert_eq!(clock.advance(Duration::from_millis(6)), 1);
        assert_eq!(clock.backlog(), Duration::from_millis(2));
        assert_eq!(clock.advance(Duration::from_millis(18)), 2);
        assert_eq!(clock.backlog(), Duration::ZERO);
        assert_eq!(clock.ticks_released(), 3);
    }

    #[test]
    fn speed_scales_the_ticks_released() {
        let mut clock = SimulationClock::new(FIXED_TICK);
        clock.set_speed(3).expect("speed accepted");
        assert_eq!(clock.advance(FIXED_TICK), 3);
        assert_eq!(clock.backlog(), Duration::ZERO);
    }

    #[test]
    fn unsupported_speeds_are_rejected() {
        let mut clock = SimulationClock::new(FIXED_TICK);
        assert_eq!(clock.set_speed(0), Err(RejectionReason::InvalidSpeed));
        assert_eq!(clock.set_speed(5), Err(RejectionReason::InvalidSpeed));
        assert_eq!(clock.speed(), 1);
        assert_eq!(clock.set_speed(4), Ok(()));
        assert_eq!(clock.speed(), 4);
    }

    #[test]
    fn long_stalls_are_capped() {
        let mut clock = SimulationClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_secs(30)), MAX_BACKLOG_TICKS);

        clock.set_speed(2).expect("speed accepted");
        assert_eq!(clock.advance(Duration::from_secs(30)), MAX_BACKLOG_TICKS * 2);
    }

    #[test]
    fn pausing_freezes_the_accumulator() {
        let mut clock = SimulationClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert!(clock.toggle_pause());
        assert_eq!(clock.advance(Duration::from_secs(5)), 0);
        assert_eq!(clock.backlog(), Duration::from_millis(4));

        assert!(!clock.toggle_pause());
        assert_eq!(clock.advance(Duration::from_millis(6)), 1);
    }
}
