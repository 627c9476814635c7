//! Contention handling shared by every waiting loop in this crate.
//!
//! A [SpinPolicy] says what a blocked thread does between two looks at shared state.  Each blocking call builds a
//! fresh [SpinWait] from the policy, which is how the exponential backoff resets to its initial delay at the start of
//! every `acquire`/`wait`.
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Bounds for exponential backoff.
///
/// The delay starts at `initial`, doubles after every failed attempt, and never exceeds `max`.  Values which would
/// overshoot `max` are clamped to it, so the sequence is `initial, 2*initial, ..., max, max, ...`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BackoffConfig {
    initial: Duration,
    max: Duration,
}

impl BackoffConfig {
    /// The delays used by the backoff lock variants: 1ns doubling up to 1024ns.
    ///
    /// Note that most platforms cannot sleep for less than some tens of microseconds, so in practice any sleep here
    /// is a trip through the scheduler.
    pub const LOCK: BackoffConfig = BackoffConfig {
        initial: Duration::from_nanos(1),
        max: Duration::from_nanos(1024),
    };

    /// The delays used by waiting barrier participants and the CAS counter: 1µs doubling, capped at 1ms.
    pub const WAIT: BackoffConfig = BackoffConfig {
        initial: Duration::from_micros(1),
        max: Duration::from_micros(1000),
    };

    pub fn new(initial: Duration, max: Duration) -> Result<BackoffConfig> {
        if initial.is_zero() || initial > max {
            return Err(ConfigError::InvalidBackoff { initial, max }.into());
        }

        Ok(BackoffConfig { initial, max })
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

/// Capped exponential backoff state for one blocking call.
#[derive(Clone, Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Backoff {
        Backoff {
            config,
            current: config.initial,
        }
    }

    /// The delay the next call to [Backoff::snooze] will use.
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    /// Go back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.config.initial;
    }

    /// Return the delay to wait now, and advance to the following one.
    pub fn next_delay(&mut self) -> Duration {
        let ret = self.current;
        self.current = self.current.saturating_mul(2).min(self.config.max);
        ret
    }

    /// Suspend the calling thread for the current delay, then grow the delay.
    pub fn snooze(&mut self) {
        let delay = self.next_delay();
        crate::sync::pause_for(delay);
    }
}

/// What a thread does while it is blocked on shared state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SpinPolicy {
    /// Busy-wait, telling the processor we are in a spin loop.
    #[default]
    Spin,

    /// Give the rest of the timeslice back to the OS scheduler.
    Yield,

    /// Sleep with capped exponential backoff.
    Backoff(BackoffConfig),
}

impl SpinPolicy {
    /// Start a new blocking call.
    pub fn waiter(&self) -> SpinWait {
        match self {
            SpinPolicy::Spin => SpinWait::Spin,
            SpinPolicy::Yield => SpinWait::Yield,
            SpinPolicy::Backoff(c) => SpinWait::Backoff(Backoff::new(*c)),
        }
    }
}

/// Per-call waiting state built by [SpinPolicy::waiter].
#[derive(Clone, Debug)]
pub enum SpinWait {
    Spin,
    Yield,
    Backoff(Backoff),
}

impl SpinWait {
    /// Wait once.  Called after every failed look at shared state.
    #[inline]
    pub fn wait(&mut self) {
        match self {
            SpinWait::Spin => crate::sync::relax(),
            SpinWait::Yield => crate::sync::yield_now(),
            SpinWait::Backoff(b) => b.snooze(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn lock_preset_doubles_to_cap() {
        let mut b = Backoff::new(BackoffConfig::LOCK);
        let got = (0..13).map(|_| b.next_delay().as_nanos()).collect::<Vec<_>>();
        pretty_assertions::assert_eq!(
            got,
            vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 1024, 1024]
        );
    }

    #[test]
    fn wait_preset_clamps_to_one_millisecond() {
        let mut b = Backoff::new(BackoffConfig::WAIT);
        let got = (0..12)
            .map(|_| b.next_delay().as_micros())
            .collect::<Vec<_>>();
        pretty_assertions::assert_eq!(
            got,
            vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1000, 1000]
        );
    }

    #[test]
    fn rejects_bad_bounds() {
        assert!(BackoffConfig::new(Duration::ZERO, Duration::from_nanos(5))
            .unwrap_err()
            .is_config());
        assert!(
            BackoffConfig::new(Duration::from_nanos(10), Duration::from_nanos(5))
                .unwrap_err()
                .is_config()
        );
        assert!(BackoffConfig::new(Duration::from_nanos(5), Duration::from_nanos(5)).is_ok());
    }

    #[test]
    fn each_waiter_starts_from_initial() {
        let policy = SpinPolicy::Backoff(BackoffConfig::LOCK);

        let mut first = policy.waiter();
        for _ in 0..5 {
            first.wait();
        }
        let SpinWait::Backoff(b) = first else {
            panic!("Expected a backoff waiter");
        };
        assert_eq!(b.current_delay(), Duration::from_nanos(32));

        let SpinWait::Backoff(b) = policy.waiter() else {
            panic!("Expected a backoff waiter");
        };
        assert_eq!(b.current_delay(), BackoffConfig::LOCK.initial());
    }

    proptest! {
        #[test]
        fn delays_are_monotonic_and_capped(initial in 1u64..10_000, extra in 0u64..1_000_000, steps in 1usize..80) {
            let config = BackoffConfig::new(
                Duration::from_nanos(initial),
                Duration::from_nanos(initial + extra),
            ).unwrap();
            let mut b = Backoff::new(config);

            let mut prev = Duration::ZERO;
            for _ in 0..steps {
                let d = b.next_delay();
                prop_assert!(d >= prev);
                prop_assert!(d <= config.max());
                prop_assert!(d >= config.initial());
                prev = d;
            }

            b.reset();
            prop_assert_eq!(b.current_delay(), config.initial());
        }
    }
}
