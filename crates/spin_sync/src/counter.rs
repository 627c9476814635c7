//! Three ways to count concurrently.
//!
//! These exist to compare synchronization strategies on the smallest possible critical section.  All of them promise
//! the same thing: once every `increment` has returned, `get` reports exactly how many there were.
use std::cell::UnsafeCell;

use crossbeam::utils::CachePadded;

use crate::backoff::{BackoffConfig, SpinPolicy, SpinWait};
use crate::error::{ContentionError, Result};
use crate::lock::Lock;
use crate::sync::{AtomicU64, Ordering};
use crate::ttas::TtasLock;

/// A counter which may be incremented from many threads.
pub trait Counter: Send + Sync {
    fn increment(&self);

    fn get(&self) -> u64;
}

/// A plain integer behind any [Lock] in this crate.
///
/// Both `increment` and `get` take the lock.  When `L` needs a queue node, a fresh one is made on the stack for each
/// call.
pub struct LockedCounter<L: Lock = TtasLock> {
    lock: L,
    value: UnsafeCell<u64>,
}

// Every access to `value` happens with `lock` held.
unsafe impl<L: Lock> Sync for LockedCounter<L> {}

impl<L: Lock + Default> LockedCounter<L> {
    pub fn new() -> Self {
        LockedCounter::with_lock(L::default())
    }
}

impl<L: Lock + Default> Default for LockedCounter<L> {
    fn default() -> Self {
        LockedCounter::new()
    }
}

impl<L: Lock> LockedCounter<L> {
    pub fn with_lock(lock: L) -> Self {
        LockedCounter {
            lock,
            value: UnsafeCell::new(0),
        }
    }
}

impl<L: Lock> Counter for LockedCounter<L> {
    fn increment(&self) {
        let mut node = L::Node::default();
        self.lock
            .with_lock(&mut node, || unsafe { *self.value.get() += 1 });
    }

    fn get(&self) -> u64 {
        let mut node = L::Node::default();
        self.lock.with_lock(&mut node, || unsafe { *self.value.get() })
    }
}

/// An atomic integer incremented with a compare-and-swap loop.
///
/// A failed swap means another thread got in first; the loser backs off before retrying.  [Counter::increment] never
/// gives up, so under pathological contention a thread can retry indefinitely.  [CasCounter::try_increment] bounds
/// the attempts instead.
#[derive(Debug)]
pub struct CasCounter {
    value: CachePadded<AtomicU64>,
    policy: SpinPolicy,
}

impl CasCounter {
    /// A counter which backs off with [BackoffConfig::WAIT].
    pub fn new() -> CasCounter {
        CasCounter::with_policy(SpinPolicy::Backoff(BackoffConfig::WAIT))
    }

    pub fn with_policy(policy: SpinPolicy) -> CasCounter {
        CasCounter {
            value: CachePadded::new(AtomicU64::new(0)),
            policy,
        }
    }

    /// Make one attempt.  Returns the new value on success.
    fn attempt(&self) -> Option<u64> {
        let current = self.value.load(Ordering::Relaxed);
        self.value
            .compare_exchange(current, current + 1, Ordering::Relaxed, Ordering::Relaxed)
            .ok()
            .map(|x| x + 1)
    }

    /// Increment, giving up after `max_attempts` failed swaps.
    ///
    /// Returns the value after this increment.
    pub fn try_increment(&self, max_attempts: u32) -> Result<u64> {
        let mut waiter = self.policy.waiter();
        for attempt in 0..max_attempts {
            if let Some(v) = self.attempt() {
                return Ok(v);
            }

            if attempt + 1 < max_attempts {
                waiter.wait();
            }
        }

        log::warn!("CAS counter increment abandoned after {max_attempts} attempts");
        Err(ContentionError::RetriesExhausted {
            attempts: max_attempts,
        }
        .into())
    }

    fn increment_unbounded(&self, waiter: &mut SpinWait) {
        while self.attempt().is_none() {
            waiter.wait();
        }
    }
}

impl Default for CasCounter {
    fn default() -> Self {
        CasCounter::new()
    }
}

impl Counter for CasCounter {
    fn increment(&self) {
        self.increment_unbounded(&mut self.policy.waiter());
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// An atomic integer incremented with the hardware's fetch-and-add.
///
/// No retry loop: this is wait-free wherever the platform has a native atomic add.
#[derive(Debug, Default)]
pub struct FetchAddCounter {
    value: CachePadded<AtomicU64>,
}

impl FetchAddCounter {
    pub fn new() -> FetchAddCounter {
        FetchAddCounter {
            value: CachePadded::new(AtomicU64::new(0)),
        }
    }
}

impl Counter for FetchAddCounter {
    fn increment(&self) {
        // Only the total matters; whoever reads it after the incrementing threads are joined is ordered by the join.
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}
