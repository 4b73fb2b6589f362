//! Atomic building blocks.
//!
//! Provides the one-shot flag and bounded wait used by the pool's dispose
//! path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A flag that can be set exactly once.
///
/// Useful for dispose-exactly-once semantics: several threads may race to
/// set it, but only one of them wins.
#[derive(Debug, Default)]
pub struct OnceFlag {
    /// The flag value
    flag: AtomicBool,
}

impl OnceFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Set the flag if it is not already set.
    ///
    /// Returns true if the flag was set by this call, false if it was
    /// already set.
    pub fn try_set(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Get the current state of the flag.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Poll `predicate` until it holds or `timeout` expires.
///
/// Returns true if the predicate held within the timeout, false otherwise.
/// The predicate is always evaluated at least once.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();

    while !predicate() {
        if start.elapsed() >= timeout {
            return false;
        }

        // Short sleep to avoid spinning
        std::thread::sleep(Duration::from_micros(50));
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_once_flag() {
        let flag = OnceFlag::new();

        assert!(!flag.is_set());
        assert!(flag.try_set());
        assert!(flag.is_set());
        assert!(!flag.try_set());
        assert!(flag.is_set());
    }

    #[test]
    fn test_once_flag_threads() {
        let flag = Arc::new(OnceFlag::new());
        let success_count = Arc::new(AtomicUsize::new(0));
        let thread_count = 5;

        let mut handles = vec![];

        for _ in 0..thread_count {
            let flag = Arc::clone(&flag);
            let success_count = Arc::clone(&success_count);

            handles.push(thread::spawn(move || {
                if flag.try_set() {
                    success_count.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Only one thread should have successfully set the flag
        assert_eq!(success_count.load(Ordering::SeqCst), 1);
        assert!(flag.is_set());
    }

    #[test]
    fn test_wait_until_observes_condition() {
        let flag = Arc::new(OnceFlag::new());
        let flag_clone = Arc::clone(&flag);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag_clone.try_set();
        });

        assert!(wait_until(Duration::from_millis(500), || flag.is_set()));

        handle.join().unwrap();
    }

    #[test]
    fn test_wait_until_times_out() {
        let start = Instant::now();
        assert!(!wait_until(Duration::from_millis(20), || false));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
