//! A reusable sense-reversing barrier.
//!
//! All participants share an arrival counter and a one-bit `sense`.  A phase is identified by the value `sense` will
//! take when it completes.  Arriving participants flip their local sense (the phase they are now waiting for) and
//! decrement the counter; the last one to arrive puts the counter back to `N` and then publishes the new sense, which
//! lets everyone else go.  Since a participant waits for a specific sense value rather than for a flag to be reset, a
//! fast participant that races ahead into the next phase cannot confuse the slow ones still leaving the previous
//! phase: they are waiting for different values.
use crossbeam::utils::CachePadded;

use crate::backoff::{BackoffConfig, SpinPolicy};
use crate::error::{ConfigError, Result};
use crate::sync::{AtomicBool, AtomicUsize, Ordering};

/// A participant's private view of which phase it is in.
///
/// Obtained from [SenseBarrier::participant] and passed to [SenseBarrier::wait_with].  Each participant must have its
/// own, and must use it with exactly one barrier.
#[derive(Debug)]
pub struct LocalSense {
    sense: bool,
}

/// Returned from waiting on a [SenseBarrier].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BarrierWaitResult {
    leader: bool,
}

impl BarrierWaitResult {
    /// Exactly one participant per phase gets `true`: the last to arrive, which released everyone else.
    pub fn is_leader(&self) -> bool {
        self.leader
    }
}

/// An N-party reusable barrier.
///
/// Waiting uses [BackoffConfig::WAIT] by default; use [SenseBarrier::with_policy] to spin or yield instead.
///
/// Calling `wait` from more than `N` threads in the same phase is not detected and breaks the barrier.
#[derive(Debug)]
pub struct SenseBarrier {
    arrival_count: CachePadded<AtomicUsize>,
    sense: CachePadded<AtomicBool>,
    num_threads: usize,
    policy: SpinPolicy,
}

impl SenseBarrier {
    /// Build a barrier for `num_threads` participants.
    ///
    /// Fails if `num_threads` is 0.
    pub fn new(num_threads: usize) -> Result<SenseBarrier> {
        SenseBarrier::with_policy(num_threads, SpinPolicy::Backoff(BackoffConfig::WAIT))
    }

    pub fn with_policy(num_threads: usize, policy: SpinPolicy) -> Result<SenseBarrier> {
        if num_threads == 0 {
            return Err(ConfigError::ZeroParticipants.into());
        }

        log::debug!("Building sense-reversing barrier: num_threads={num_threads} policy={policy:?}");

        Ok(SenseBarrier {
            arrival_count: CachePadded::new(AtomicUsize::new(num_threads)),
            sense: CachePadded::new(AtomicBool::new(false)),
            num_threads,
            policy,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Local state for a participant joining now.
    ///
    /// Must be called before the participant's first wait, at a point where the current phase has not completed
    /// (typically before the participant threads are started).
    pub fn participant(&self) -> LocalSense {
        LocalSense {
            sense: self.sense.load(Ordering::Acquire),
        }
    }

    /// Wait for all participants to arrive in the current phase, using explicitly carried local sense.
    pub fn wait_with(&self, local: &mut LocalSense) -> BarrierWaitResult {
        local.sense = !local.sense;
        let my_sense = local.sense;

        // Acquire so the leader sees every other arrival's prior writes; release so our writes travel with our arrival.
        if self.arrival_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Nobody reads the counter again until they've seen the new sense, so this can be relaxed.
            self.arrival_count
                .store(self.num_threads, Ordering::Relaxed);
            self.sense.store(my_sense, Ordering::Release);
            return BarrierWaitResult { leader: true };
        }

        let mut waiter = self.policy.waiter();
        while self.sense.load(Ordering::Acquire) != my_sense {
            waiter.wait();
        }

        BarrierWaitResult { leader: false }
    }

    /// Wait for all participants to arrive in the current phase.
    ///
    /// The local sense is recovered from the shared one: until this call arrives, the current phase cannot complete,
    /// so the shared sense still names the previous phase.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut local = self.participant();
        self.wait_with(&mut local)
    }
}
