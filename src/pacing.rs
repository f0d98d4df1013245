use std::time::Duration;

use log::trace;

/// Moments where the simulated counterpart would take a while to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    Thinking,
}

/// Delay strategy for the terminal view. The engine itself never waits.
pub trait Pacer {
    fn pause(&self, beat: Beat);
}

/// No delay at all.
pub struct Instant;

impl Pacer for Instant {
    fn pause(&self, _beat: Beat) {}
}

/// Sleep for a fixed duration on every beat.
pub struct Delayed(pub Duration);

impl Pacer for Delayed {
    fn pause(&self, beat: Beat) {
        trace!("pausing {:?} for {beat:?}", self.0);
        std::thread::sleep(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delayed_sleeps_at_least_duration() {
        let started = std::time::Instant::now();
        Delayed(Duration::from_millis(5)).pause(Beat::Thinking);
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
