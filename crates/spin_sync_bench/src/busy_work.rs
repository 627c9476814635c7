//! Synthetic work for critical sections.
//!
//! An empty critical section measures little beyond the cost of the cache line bouncing between cores.  Scenarios
//! can instead hold the lock for a while by testing a run of integers for primality, which is pure computation, takes
//! time roughly proportional to the number of integers, and touches no shared memory.

/// Where the scan starts; large enough that each test does some trial divisions.
const SCAN_START: u64 = 1_000_000;

/// Test `units` consecutive integers for primality and return how many were prime.
pub fn busy_work(units: u64) -> u64 {
    let found = (SCAN_START..SCAN_START + units)
        .filter(|x| primes::is_prime(*x))
        .count() as u64;
    std::hint::black_box(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_primes() {
        assert_eq!(busy_work(0), 0);
        // 1000003 is the first prime after one million.
        assert_eq!(busy_work(3), 0);
        assert_eq!(busy_work(4), 1);
    }
}
