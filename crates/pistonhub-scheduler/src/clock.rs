//! Wall-clock source for trigger timing.
//!
//! Cron slots are wall-clock instants, so triggers compare against a [`Clock`]
//! rather than the monotonic timer they sleep on.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The host's system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::Clock;

    /// A clock that follows Tokio's (possibly paused) timer from a fixed origin
    /// and can be jumped forward or back without the timer noticing.
    #[derive(Debug)]
    pub struct TestClock {
        origin: DateTime<Utc>,
        started: Instant,
        offset: Mutex<chrono::Duration>,
    }

    impl TestClock {
        /// Start the clock at `origin`. Must be called from within a Tokio runtime.
        #[must_use]
        pub fn starting_at(origin: DateTime<Utc>) -> Self {
            Self {
                origin,
                started: Instant::now(),
                offset: Mutex::new(chrono::Duration::zero()),
            }
        }

        /// Move wall time by `by`, as a host clock correction or a resume from suspend would.
        pub fn jump(&self, by: chrono::Duration) {
            *self.offset.lock() += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed())
                .unwrap_or_else(|_| chrono::Duration::zero());
            self.origin + elapsed + *self.offset.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::TestClock;
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_timer_and_jumps() {
        let origin = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let clock = TestClock::starting_at(origin);
        assert_eq!(clock.now(), origin);

        tokio::time::sleep(Duration::from_secs(90)).await;
        let after_sleep = clock.now();
        assert!(after_sleep >= origin + chrono::Duration::seconds(90));
        assert!(after_sleep < origin + chrono::Duration::seconds(91));

        clock.jump(chrono::Duration::hours(2));
        assert_eq!(clock.now(), after_sleep + chrono::Duration::hours(2));
    }

    #[test]
    fn system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
        assert!(now <= Utc::now());
    }
}
