//! Switches between `std` and `loom` primitives.
//!
//! Everything in this crate which touches shared memory goes through here, so that building with `--cfg loom` turns
//! the unit tests into model checks.  Loom cannot make progress on a loop that never yields, so the two ways our
//! primitives wait ([relax] and [pause_for]) both collapse to a loom yield in that configuration.
#[cfg(not(loom))]
mod not_loom {
    pub use std::sync::atomic::*;
    pub use std::sync::*;
    pub use std::thread::spawn;
    pub use std::thread::yield_now;

    /// One iteration of a busy-wait.
    #[inline(always)]
    pub fn relax() {
        std::hint::spin_loop();
    }

    /// Suspend the calling thread for roughly `delay`.
    #[inline]
    pub fn pause_for(delay: std::time::Duration) {
        std::thread::sleep(delay);
    }

    #[cfg(test)]
    pub fn wrap_test(what: impl Fn() + Sync + Send + 'static) {
        what()
    }
}

#[cfg(not(loom))]
pub(crate) use not_loom::*;

#[cfg(loom)]
mod with_loom {
    pub use loom::sync::atomic::*;
    pub use loom::sync::*;
    pub use loom::thread::spawn;
    pub use loom::thread::yield_now;

    pub fn relax() {
        loom::thread::yield_now();
    }

    pub fn pause_for(_delay: std::time::Duration) {
        loom::thread::yield_now();
    }

    #[cfg(test)]
    pub fn wrap_test(what: impl Fn() + Sync + Send + 'static) {
        loom::model(what)
    }
}

#[cfg(loom)]
pub(crate) use with_loom::*;
