//! The capability shared by every lock in the crate.
use crate::atomic_flag::AtomicFlag;
use crate::sync::Ordering;

/// An exclusive lock.
///
/// Locks only gate entry to a critical section; they do not own the data the section touches.  Some locks need
/// per-acquirer state (the MCS lock's queue node), which is passed explicitly as [Lock::Node].  Locks with purely
/// shared state use `()`.
///
/// The raw methods are unsafe because a node may be linked into shared state for the whole time the lock is held.
/// Most callers want [Lock::with_lock], which cannot be misused.
pub trait Lock: Send + Sync {
    /// Per-acquirer state.
    type Node: Default + Send;

    /// Block until the lock is held.
    ///
    /// # Safety
    ///
    /// `node` must stay alive and must not move until the matching [Lock::release_with] returns, and must not be used
    /// by any other acquisition in the meantime.
    unsafe fn acquire_with(&self, node: &Self::Node);

    /// Release the lock.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock through a previous [Lock::acquire_with] using this same `node`.  Releasing a lock
    /// one does not hold is undefined behavior; nothing checks for it.
    unsafe fn release_with(&self, node: &Self::Node);

    /// Run `critical_section` while holding the lock, releasing afterwards even if it panics.
    fn with_lock<R>(&self, node: &mut Self::Node, critical_section: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        struct ReleaseOnDrop<'a, L: Lock> {
            lock: &'a L,
            node: &'a L::Node,
        }

        impl<L: Lock> Drop for ReleaseOnDrop<'_, L> {
            fn drop(&mut self) {
                // The guard is only built after a successful acquire, and the node is borrowed for its lifetime.
                unsafe { self.lock.release_with(self.node) }
            }
        }

        let node = &*node;
        unsafe { self.acquire_with(node) };
        let _release = ReleaseOnDrop { lock: self, node };
        critical_section()
    }
}

/// Holds a flag-based lock until dropped.
///
/// Returned by [crate::TasLock::guard] and [crate::TtasLock::guard].  Leaking this guard leaves the lock held forever,
/// which deadlocks but is otherwise harmless.
#[must_use = "The lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FlagGuard<'a> {
    flag: &'a AtomicFlag,
}

impl<'a> FlagGuard<'a> {
    /// The caller must have just set `flag`.
    pub(crate) fn new(flag: &'a AtomicFlag) -> FlagGuard<'a> {
        FlagGuard { flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.clear(Ordering::Release);
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    use std::cell::UnsafeCell;

    /// A counter with no synchronization at all.  Only correct when every access happens under one lock.
    #[derive(Default)]
    pub struct Unsynchronized(UnsafeCell<u64>);

    unsafe impl Sync for Unsynchronized {}

    impl Unsynchronized {
        /// # Safety
        ///
        /// Must be called with the protecting lock held.
        pub unsafe fn bump(&self) {
            // Read and write separately so that a lost update is actually possible without the lock.
            let v = std::ptr::read_volatile(self.0.get());
            std::ptr::write_volatile(self.0.get(), v + 1);
        }

        pub fn into_inner(self) -> u64 {
            self.0.into_inner()
        }

        /// # Safety
        ///
        /// No other thread may be touching the counter.
        pub unsafe fn get(&self) -> u64 {
            *self.0.get()
        }
    }

    /// Run `threads` threads each doing `iterations` increments of an unsynchronized counter inside `lock`, and return
    /// the final count.
    #[cfg(not(loom))]
    pub fn hammer<L: Lock>(lock: &L, threads: usize, iterations: usize) -> u64 {
        let counter = Unsynchronized::default();

        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    let mut node = L::Node::default();
                    for _ in 0..iterations {
                        lock.with_lock(&mut node, || unsafe { counter.bump() });
                    }
                });
            }
        });

        counter.into_inner()
    }

    /// Same as [hammer], sized to stay tractable under loom: two threads, one increment each.
    pub fn model_two_threads<L: Lock + 'static>(make: fn() -> L) {
        crate::sync::wrap_test(move || {
            let lock = crate::sync::Arc::new(make());
            let counter = crate::sync::Arc::new(Unsynchronized::default());

            let handles = (0..2)
                .map(|_| {
                    let lock = lock.clone();
                    let counter = counter.clone();
                    crate::sync::spawn(move || {
                        let mut node = L::Node::default();
                        lock.with_lock(&mut node, || unsafe { counter.bump() });
                    })
                })
                .collect::<Vec<_>>();

            for h in handles {
                h.join().unwrap();
            }

            // Every worker has been joined.
            assert_eq!(unsafe { counter.get() }, 2);
        });
    }
}
