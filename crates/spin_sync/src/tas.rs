use crossbeam::utils::CachePadded;

use crate::atomic_flag::AtomicFlag;
use crate::backoff::{BackoffConfig, SpinPolicy};
use crate::lock::{FlagGuard, Lock};
use crate::sync::Ordering;

/// A test-and-set spin lock.
///
/// Every attempt to take the lock is an atomic exchange on the shared flag, which means every waiting thread keeps
/// pulling the flag's cache line into exclusive state.  Under contention this generates coherence traffic
/// proportional to the number of waiters; see [crate::TtasLock] and [crate::McsLock] for the alternatives.
///
/// No fairness: a thread can in principle lose every race forever.
///
/// [TasLock::release] is safe to call in Rust terms, but calling it without holding the lock breaks mutual exclusion
/// for whoever does hold it.
#[derive(Debug)]
pub struct TasLock {
    flag: CachePadded<AtomicFlag>,
    policy: SpinPolicy,
}

impl TasLock {
    /// A lock which retries immediately.
    pub fn new() -> TasLock {
        TasLock::with_policy(SpinPolicy::Spin)
    }

    /// A lock which sleeps with exponential backoff between attempts, using [BackoffConfig::LOCK].
    pub fn with_backoff() -> TasLock {
        TasLock::with_policy(SpinPolicy::Backoff(BackoffConfig::LOCK))
    }

    pub fn with_policy(policy: SpinPolicy) -> TasLock {
        TasLock {
            flag: CachePadded::new(AtomicFlag::new(false)),
            policy,
        }
    }

    pub fn policy(&self) -> SpinPolicy {
        self.policy
    }

    /// Block until the lock is held.
    pub fn acquire(&self) {
        let mut waiter = self.policy.waiter();
        while self.flag.test_and_set(Ordering::Acquire) {
            waiter.wait();
        }
    }

    /// Make one attempt to take the lock.
    pub fn try_acquire(&self) -> bool {
        !self.flag.test_and_set(Ordering::Acquire)
    }

    /// Release the lock.  Must only be called by the holder.
    pub fn release(&self) {
        self.flag.clear(Ordering::Release);
    }

    pub fn lock(&self) {
        self.acquire()
    }

    pub fn unlock(&self) {
        self.release()
    }

    /// Acquire the lock, and release it when the returned guard drops.
    pub fn guard(&self) -> FlagGuard<'_> {
        self.acquire();
        FlagGuard::new(&self.flag)
    }

    /// A racy snapshot of whether someone holds the lock.
    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Default for TasLock {
    fn default() -> Self {
        TasLock::new()
    }
}

impl Lock for TasLock {
    type Node = ();

    unsafe fn acquire_with(&self, _node: &()) {
        self.acquire();
    }

    unsafe fn release_with(&self, _node: &()) {
        self.release();
    }
}
