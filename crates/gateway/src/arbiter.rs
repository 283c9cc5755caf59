use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot admission control for the detection pipeline.
///
/// A request that finds the slot taken is shed, not queued. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct RequestArbiter {
    busy: Arc<AtomicBool>,
}

/// Holds the pipeline slot; dropping it makes the arbiter idle again.
///
/// Owned, so it can travel into a blocking task with the work it guards.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl RequestArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn second_acquire_fails_while_held() {
        let arbiter = RequestArbiter::new();
        let _guard = arbiter.try_acquire().unwrap();

        assert!(arbiter.is_busy());
        assert!(arbiter.try_acquire().is_none());
        assert!(arbiter.clone().try_acquire().is_none(), "clones share the slot");
    }

    #[test]
    fn drop_releases() {
        let arbiter = RequestArbiter::new();
        drop(arbiter.try_acquire());

        assert!(!arbiter.is_busy());
        assert!(arbiter.try_acquire().is_some());
    }

    #[test]
    fn released_on_error_path() {
        fn failing_step(arbiter: &RequestArbiter) -> Result<(), &'static str> {
            let _guard = arbiter.try_acquire().ok_or("busy")?;
            Err("decode failed")
        }

        let arbiter = RequestArbiter::new();
        assert_eq!(failing_step(&arbiter), Err("decode failed"));
        assert!(!arbiter.is_busy());
    }

    #[test]
    fn released_on_panic() {
        let arbiter = RequestArbiter::new();
        let guard = arbiter.try_acquire().unwrap();

        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("inference blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!arbiter.is_busy());
    }

    #[test]
    fn only_one_of_many_racers_wins() {
        const RACERS: usize = 16;
        let arbiter = RequestArbiter::new();
        let winners = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let (arbiter, winners, attempts) =
                    (arbiter.clone(), winners.clone(), attempts.clone());
                thread::spawn(move || {
                    let guard = arbiter.try_acquire();
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if guard.is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                        // Hold the slot until every racer has tried
                        while attempts.load(Ordering::SeqCst) < RACERS {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!arbiter.is_busy());
    }
}
