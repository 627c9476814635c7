use crate::sync::{AtomicBool, Ordering};

/// A boolean which can be atomically set, read, and cleared.
///
/// This is the only shared state of the TAS and TTAS locks.  It is a thin wrapper, but naming the operations after
/// what the locks do with them keeps the orderings visible at the call sites.
#[derive(Debug, Default)]
pub struct AtomicFlag {
    inner: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> AtomicFlag {
        AtomicFlag {
            inner: AtomicBool::new(value),
        }
    }

    /// Set the flag, returning what it was before.
    #[inline(always)]
    pub fn test_and_set(&self, ordering: Ordering) -> bool {
        self.inner.swap(true, ordering)
    }

    #[inline(always)]
    pub fn load(&self, ordering: Ordering) -> bool {
        self.inner.load(ordering)
    }

    #[inline(always)]
    pub fn store(&self, value: bool, ordering: Ordering) {
        self.inner.store(value, ordering)
    }

    #[inline(always)]
    pub fn clear(&self, ordering: Ordering) {
        self.store(false, ordering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_set_reports_previous() {
        crate::sync::wrap_test(|| {
            let flag = AtomicFlag::new(false);
            assert!(!flag.test_and_set(Ordering::Acquire));
            assert!(flag.test_and_set(Ordering::Acquire));
            flag.clear(Ordering::Release);
            assert!(!flag.load(Ordering::Relaxed));
        });
    }

    #[test]
    fn only_one_thread_wins() {
        crate::sync::wrap_test(|| {
            let flag = crate::sync::Arc::new(AtomicFlag::new(false));
            let handles = (0..2)
                .map(|_| {
                    let flag = flag.clone();
                    crate::sync::spawn(move || !flag.test_and_set(Ordering::Acquire))
                })
                .collect::<Vec<_>>();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        });
    }
}
