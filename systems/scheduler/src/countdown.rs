//! Per-second countdowns, such as the hero revival board.

use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(1);

/// Notifications produced while a countdown runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CountdownEvent {
    /// A second boundary passed; `seconds_left` is the value shown on the board.
    Tick {
        /// Seconds left before the countdown finishes.
        seconds_left: f32,
    },
    /// The countdown reached zero or was stopped.
    Finished,
}

/// Counts seconds down to zero, driven by simulated time.
///
/// The first tick fires as soon as the countdown starts, then one tick per
/// second while seconds remain; the following tick finishes it. A countdown
/// of `n` whole seconds therefore ticks `n` times and finishes after `n`
/// seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Countdown {
    seconds_left: f32,
    until_next: Duration,
    period: Duration,
    running: bool,
}

impl Countdown {
    /// Creates a countdown and starts it when `seconds` is positive.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative or not finite.
    #[must_use]
    pub fn new(seconds: f32) -> Self {
        let mut countdown = Self {
            seconds_left: 0.0,
            until_next: Duration::ZERO,
            period: PERIOD,
            running: false,
        };
        if seconds > 0.0 {
            countdown.start(seconds);
        } else {
            assert!(seconds == 0.0, "countdown must not be negative, got {seconds}");
        }
        countdown
    }

    /// Restarts the countdown from `seconds`.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative or not finite.
    pub fn start(&mut self, seconds: f32) {
        assert!(
            seconds.is_finite() && seconds >= 0.0,
            "countdown must be finite and not negative, got {seconds}"
        );
        self.seconds_left = seconds;
        self.until_next = Duration::ZERO;
        self.period = if seconds > 1.0 {
            PERIOD
        } else {
            Duration::from_secs_f32(seconds)
        };
        self.running = true;
    }

    /// Stops the countdown early and reports it finished.
    pub fn stop(&mut self, out: &mut Vec<CountdownEvent>) {
        self.seconds_left = 0.0;
        self.running = false;
        out.push(CountdownEvent::Finished);
    }

    /// Seconds left, as last shown.
    #[must_use]
    pub fn seconds_left(&self) -> f32 {
        self.seconds_left
    }

    /// Reports whether seconds remain on the board.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.seconds_left > 0.0
    }

    /// Reports whether the countdown has not finished yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the countdown by `dt`.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<CountdownEvent>) {
        let mut budget = dt;
        while self.running {
            if self.until_next > budget {
                self.until_next -= budget;
                return;
            }
            budget -= self.until_next;
            self.until_next = self.period;
            self.fire(out);
        }
    }

    fn fire(&mut self, out: &mut Vec<CountdownEvent>) {
        if self.seconds_left > 0.0 {
            out.push(CountdownEvent::Tick {
                seconds_left: self.seconds_left,
            });
            self.seconds_left -= 1.0;
        } else {
            self.stop(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(countdown: &mut Countdown, millis: u64) -> Vec<CountdownEvent> {
        let mut out = Vec::new();
        countdown.tick(Duration::from_millis(millis), &mut out);
        out
    }

    #[test]
    fn whole_seconds_tick_then_finish() {
        let mut countdown = Countdown::new(3.0);
        assert_eq!(tick(&mut countdown, 0), vec![CountdownEvent::Tick { seconds_left: 3.0 }]);
        assert!(tick(&mut countdown, 999).is_empty());
        assert_eq!(tick(&mut countdown, 1), vec![CountdownEvent::Tick { seconds_left: 2.0 }]);
        assert_eq!(tick(&mut countdown, 1_000), vec![CountdownEvent::Tick { seconds_left: 1.0 }]);
        assert!(countdown.is_running());
        assert!(!countdown.is_ticking());
        assert_eq!(tick(&mut countdown, 1_000), vec![CountdownEvent::Finished]);
        assert!(!countdown.is_running());
        assert!(tick(&mut countdown, 5_000).is_empty());
    }

    #[test]
    fn large_steps_replay_every_boundary() {
        let mut countdown = Countdown::new(2.0);
        assert_eq!(
            tick(&mut countdown, 10_000),
            vec![
                CountdownEvent::Tick { seconds_left: 2.0 },
                CountdownEvent::Tick { seconds_left: 1.0 },
                CountdownEvent::Finished,
            ]
        );
    }

    #[test]
    fn zero_length_countdowns_stay_idle() {
        let mut countdown = Countdown::new(0.0);
        assert!(!countdown.is_running());
        assert!(tick(&mut countdown, 1_000).is_empty());

        let mut out = Vec::new();
        countdown.stop(&mut out);
        assert_eq!(out, vec![CountdownEvent::Finished]);
    }

    #[test]
    #[should_panic(expected = "must not be negative")]
    fn negative_countdowns_are_rejected() {
        let _ = Countdown::new(-1.0);
    }
}
