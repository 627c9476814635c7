//! The Mellor-Crummey and Scott queue lock.
//!
//! Acquirers form a singly linked FIFO through their own [QueueNode]s.  The lock itself is only a pointer to the
//! newest node.  A waiter spins on the `locked` field of its *own* node, which nobody else touches until the lock is
//! handed to it, so each handoff costs a constant number of cache transfers no matter how many threads are waiting.
//!
//! Acquire:
//!
//! 1. Reset our node: `next = null`, `locked = true`.
//! 2. Swap our node into the tail.  The previous tail is our predecessor.
//! 3. No predecessor: the lock was free and is now ours.
//! 4. Otherwise publish ourselves as `predecessor.next`, and spin until our `locked` is cleared.
//!
//! Release:
//!
//! 1. If our `next` is set, clear the successor's `locked`.  Done.
//! 2. Otherwise try to swing the tail from us back to null.  If that works nobody was waiting.
//! 3. If it fails, someone already swapped the tail but has not yet linked into our `next`.  Wait for the link, then
//!    do step 1.
//!
//! Admission order is the order of the tail swaps.
use std::ptr;

use crossbeam::utils::CachePadded;

use crate::backoff::SpinPolicy;
use crate::lock::Lock;
use crate::sync::{AtomicBool, AtomicPtr, Ordering};

/// Cache line size assumed for padding.
pub const CACHE_LINE_SIZE: usize = 64;

/// Bytes of padding needed to round a [QueueNode] up to [CACHE_LINE_SIZE].
pub const QUEUE_NODE_PADDING: usize = CACHE_LINE_SIZE
    .saturating_sub(std::mem::size_of::<AtomicPtr<QueueNode>>())
    .saturating_sub(std::mem::size_of::<AtomicBool>());

/// One acquirer's place in an [McsLock] queue.
///
/// Nodes are owned by whoever acquires with them and may be reused across acquisitions, but never by two overlapping
/// acquisitions.  Each node occupies a full cache line so that spinning on one node never disturbs a neighbor.
#[repr(C, align(64))]
pub struct QueueNode {
    /// Written by our successor when it links in, read by us on release.
    next: AtomicPtr<QueueNode>,

    /// Spun on by the owner, cleared by the previous holder at handoff.
    locked: AtomicBool,

    _padding: [u8; QUEUE_NODE_PADDING],
}

impl QueueNode {
    pub fn new() -> QueueNode {
        QueueNode {
            next: AtomicPtr::new(ptr::null_mut()),
            locked: AtomicBool::new(true),
            _padding: [0; QUEUE_NODE_PADDING],
        }
    }

    /// Whether another acquirer has queued up directly behind this node.
    pub fn has_successor(&self) -> bool {
        !self.next.load(Ordering::Acquire).is_null()
    }

    fn as_ptr(&self) -> *mut QueueNode {
        self as *const QueueNode as *mut QueueNode
    }
}

impl Default for QueueNode {
    fn default() -> Self {
        QueueNode::new()
    }
}

impl std::fmt::Debug for QueueNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueNode")
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .finish()
    }
}

/// A FIFO queue lock.  See the module documentation for the algorithm.
///
/// Waiters use [SpinPolicy::Yield] by default: handing the lock to a thread which has been descheduled stalls every
/// thread queued behind it, so burning the whole timeslice is rarely what one wants here.
#[derive(Debug)]
pub struct McsLock {
    tail: CachePadded<AtomicPtr<QueueNode>>,
    policy: SpinPolicy,
}

impl McsLock {
    pub fn new() -> McsLock {
        McsLock::with_policy(SpinPolicy::Yield)
    }

    pub fn with_policy(policy: SpinPolicy) -> McsLock {
        McsLock {
            tail: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            policy,
        }
    }

    pub fn policy(&self) -> SpinPolicy {
        self.policy
    }

    /// Block until the lock is held through `node`.
    ///
    /// On return `node.next` is whatever a successor has linked (possibly null) and `node.locked` is meaningless until
    /// the next acquisition resets it.
    ///
    /// # Safety
    ///
    /// `node` must stay alive and in place until the matching [McsLock::release] returns, and must not be used for any
    /// other acquisition of any lock in the meantime.  Prefer [McsLock::with_lock].
    pub unsafe fn acquire(&self, node: &QueueNode) {
        node.next.store(ptr::null_mut(), Ordering::Relaxed);
        node.locked.store(true, Ordering::Relaxed);

        let predecessor = self.tail.swap(node.as_ptr(), Ordering::AcqRel);
        if predecessor.is_null() {
            return;
        }

        // The predecessor cannot release (and so cannot go away) until it has seen this link.
        unsafe { &*predecessor }
            .next
            .store(node.as_ptr(), Ordering::Release);

        let mut waiter = self.policy.waiter();
        while node.locked.load(Ordering::Acquire) {
            waiter.wait();
        }
    }

    /// Hand the lock to the next queued acquirer, or mark it free.
    ///
    /// # Safety
    ///
    /// The caller must currently hold the lock through `node`.
    pub unsafe fn release(&self, node: &QueueNode) {
        let mut next = node.next.load(Ordering::Acquire);

        if next.is_null() {
            if self
                .tail
                .compare_exchange(
                    node.as_ptr(),
                    ptr::null_mut(),
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return;
            }

            // A successor swapped the tail but hasn't linked in yet.  It is already running, so this wait is short.
            loop {
                next = node.next.load(Ordering::Acquire);
                if !next.is_null() {
                    break;
                }
                crate::sync::relax();
            }
        }

        // The successor is spinning on this flag and keeps its node alive until it sees the store.
        unsafe { &*next }.locked.store(false, Ordering::Release);
    }

    /// Alias of [McsLock::acquire].
    ///
    /// # Safety
    ///
    /// As [McsLock::acquire].
    pub unsafe fn lock(&self, node: &QueueNode) {
        unsafe { self.acquire(node) }
    }

    /// Alias of [McsLock::release].
    ///
    /// # Safety
    ///
    /// As [McsLock::release].
    pub unsafe fn unlock(&self, node: &QueueNode) {
        unsafe { self.release(node) }
    }

    /// A racy snapshot of whether anyone holds or is waiting for the lock.
    pub fn is_locked(&self) -> bool {
        !self.tail.load(Ordering::Relaxed).is_null()
    }
}

impl Default for McsLock {
    fn default() -> Self {
        McsLock::new()
    }
}

impl Lock for McsLock {
    type Node = QueueNode;

    unsafe fn acquire_with(&self, node: &QueueNode) {
        unsafe { self.acquire(node) }
    }

    unsafe fn release_with(&self, node: &QueueNode) {
        unsafe { self.release(node) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::lock::test_helpers::*;

    #[cfg(not(loom))]
    #[test]
    fn node_fills_exactly_one_cache_line() {
        assert_eq!(std::mem::size_of::<QueueNode>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::align_of::<QueueNode>(), CACHE_LINE_SIZE);
        assert_eq!(
            QUEUE_NODE_PADDING,
            CACHE_LINE_SIZE
                - std::mem::size_of::<AtomicPtr<QueueNode>>()
                - std::mem::size_of::<AtomicBool>()
        );
    }

    #[test]
    fn uncontended_acquire_and_release() {
        crate::sync::wrap_test(|| {
            let lock = McsLock::new();
            let mut node = QueueNode::new();
            assert!(!lock.is_locked());
            lock.with_lock(&mut node, || assert!(lock.is_locked()));
            assert!(!lock.is_locked());

            // Nodes are reusable.
            lock.with_lock(&mut node, || assert!(lock.is_locked()));
            assert!(!lock.is_locked());
            assert!(!node.has_successor());
        });
    }

    #[test]
    fn model_mutual_exclusion() {
        model_two_threads(McsLock::new);
    }

    #[test]
    fn model_mutual_exclusion_spinning() {
        model_two_threads(|| McsLock::with_policy(SpinPolicy::Spin));
    }

    #[cfg(not(loom))]
    #[test]
    fn mutual_exclusion_across_thread_counts() {
        for threads in [1, 2, 4, 8, 16] {
            let lock = McsLock::new();
            assert_eq!(hammer(&lock, threads, 2000), threads as u64 * 2000);
            assert!(!lock.is_locked());
        }
    }

    /// Queue waiters one at a time behind a held lock, waiting for each to link in before starting the next, then
    /// check that they are admitted in the order they queued.
    #[cfg(not(loom))]
    #[test]
    fn admits_in_queue_order() {
        use std::sync::{Arc, Mutex};

        const WAITERS: usize = 6;

        let lock = Arc::new(McsLock::new());
        let order = Arc::new(Mutex::new(vec![]));
        let nodes = (0..=WAITERS)
            .map(|_| Arc::new(QueueNode::new()))
            .collect::<Vec<_>>();

        // Node 0 is the main thread's.
        unsafe { lock.acquire(&nodes[0]) };

        let mut handles = vec![];
        for i in 1..=WAITERS {
            let lock = lock.clone();
            let order = order.clone();
            let node = nodes[i].clone();
            handles.push(std::thread::spawn(move || {
                unsafe { lock.acquire(&node) };
                order.lock().unwrap().push(i);
                unsafe { lock.release(&node) };
            }));

            // Wait until waiter i has linked itself behind waiter i - 1.
            while !nodes[i - 1].has_successor() {
                std::thread::yield_now();
            }
        }

        unsafe { lock.release(&nodes[0]) };

        for h in handles {
            h.join().unwrap();
        }

        pretty_assertions::assert_eq!(
            *order.lock().unwrap(),
            (1..=WAITERS).collect::<Vec<_>>()
        );
        assert!(!lock.is_locked());
    }
}
