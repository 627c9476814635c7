//! Spin-based synchronization primitives for studying contention.
//!
//! This crate implements the classic busy-waiting algorithms side by side so that they can be compared under the same
//! load:
//!
//! - [TasLock] and [TtasLock], the test-and-set and test-and-test-and-set locks, each usable with or without
//!   exponential backoff.
//! - [McsLock], the Mellor-Crummey and Scott queue lock, where every waiter spins on its own cache line and the lock
//!   is handed over in FIFO order.
//! - [SenseBarrier], a reusable barrier which alternates a single sense bit between phases.
//! - [LockedCounter], [CasCounter], and [FetchAddCounter], three answers to "how do I count from many threads".
//!
//! None of these are meant to replace `std::sync::Mutex` or `std::sync::Barrier` in real programs.  They never park a
//! thread with the OS; the best they do is sleep or yield.  No primitive supports timeouts or cancellation, and a
//! thread blocked in one can only be released by the thread it is waiting on.
//!
//! Misuse (releasing a lock one does not hold, using one queue node for two acquisitions at once) is not detected.
//! Where such misuse could corrupt memory the corresponding functions are `unsafe`; the closure-based
//! [Lock::with_lock] is the safe way in.
//!
//! Building with `RUSTFLAGS="--cfg loom"` runs the small tests under the loom model checker.
mod atomic_flag;
mod backoff;
mod barrier;
mod counter;
mod error;
mod lock;
mod mcs;
mod sync;
mod tas;
mod ttas;

pub use atomic_flag::AtomicFlag;
pub use backoff::{Backoff, BackoffConfig, SpinPolicy, SpinWait};
pub use barrier::{BarrierWaitResult, LocalSense, SenseBarrier};
pub use counter::{CasCounter, Counter, FetchAddCounter, LockedCounter};
pub use error::{Error, Result};
pub use lock::{FlagGuard, Lock};
pub use mcs::{McsLock, QueueNode, CACHE_LINE_SIZE, QUEUE_NODE_PADDING};
pub use tas::TasLock;
pub use ttas::TtasLock;
