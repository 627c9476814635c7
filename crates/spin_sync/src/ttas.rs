use crossbeam::utils::CachePadded;

use crate::atomic_flag::AtomicFlag;
use crate::backoff::{BackoffConfig, SpinPolicy};
use crate::lock::{FlagGuard, Lock};
use crate::sync::Ordering;

/// A test-and-test-and-set spin lock.
///
/// Waiters spin on a plain read of the flag, which can be served from a shared copy of the cache line, and only
/// attempt the exchange once the flag reads free.  The read is only a hint and so is relaxed; the exchange and the
/// release store carry the ordering.
///
/// The policy is applied after every lost exchange, not while reading: a waiter keeps polling until the lock looks
/// free, then backs off if someone beat it to the exchange.
///
/// Same caveats as [crate::TasLock]: no fairness, and `release` by a non-holder breaks exclusion.
#[derive(Debug)]
pub struct TtasLock {
    flag: CachePadded<AtomicFlag>,
    policy: SpinPolicy,
}

impl TtasLock {
    pub fn new() -> TtasLock {
        TtasLock::with_policy(SpinPolicy::Spin)
    }

    /// A lock which sleeps with exponential backoff after each lost race, using [BackoffConfig::LOCK].
    pub fn with_backoff() -> TtasLock {
        TtasLock::with_policy(SpinPolicy::Backoff(BackoffConfig::LOCK))
    }

    pub fn with_policy(policy: SpinPolicy) -> TtasLock {
        TtasLock {
            flag: CachePadded::new(AtomicFlag::new(false)),
            policy,
        }
    }

    pub fn policy(&self) -> SpinPolicy {
        self.policy
    }

    pub fn acquire(&self) {
        let mut waiter = self.policy.waiter();
        loop {
            while self.flag.load(Ordering::Relaxed) {
                crate::sync::relax();
            }

            if !self.flag.test_and_set(Ordering::Acquire) {
                return;
            }

            waiter.wait();
        }
    }

    pub fn try_acquire(&self) -> bool {
        !self.flag.load(Ordering::Relaxed) && !self.flag.test_and_set(Ordering::Acquire)
    }

    pub fn release(&self) {
        self.flag.clear(Ordering::Release);
    }

    pub fn lock(&self) {
        self.acquire()
    }

    pub fn unlock(&self) {
        self.release()
    }

    pub fn guard(&self) -> FlagGuard<'_> {
        self.acquire();
        FlagGuard::new(&self.flag)
    }

    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Default for TtasLock {
    fn default() -> Self {
        TtasLock::new()
    }
}

impl Lock for TtasLock {
    type Node = ();

    unsafe fn acquire_with(&self, _node: &()) {
        self.acquire();
    }

    unsafe fn release_with(&self, _node: &()) {
        self.release();
    }
}
