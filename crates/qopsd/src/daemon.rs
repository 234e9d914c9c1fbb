//! Periodic driver around the reconciler. One pass at a time, paced from
//! the start of the previous pass, backing off exponentially while passes
//! keep failing and running the in-flight pass to completion on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
const MAX_BACKOFF_FACTOR: u32 = 8;

/// The pause before the next pass: the configured interval, doubled per
/// consecutive failure up to eight times the interval, reset on success.
pub fn next_delay(interval: Duration, consecutive_failures: u32) -> Duration {
    if consecutive_failures <= 1 {
        return interval;
    }
    let factor = 2u32
        .saturating_pow(consecutive_failures - 1)
        .min(MAX_BACKOFF_FACTOR);
    interval.saturating_mul(factor)
}

/// Run `tick` until `shutdown` is raised. Each tick reports success or
/// failure; the next tick is scheduled relative to when the previous one
/// *started*. A shutdown raised mid-tick takes effect once the tick
/// returns, never by abandoning it.
///
/// Returns the number of ticks executed.
pub fn run_loop<F>(interval: Duration, shutdown: &AtomicBool, mut tick: F) -> u64
where
    F: FnMut() -> bool,
{
    let mut consecutive_failures = 0u32;
    let mut ticks = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        let started = Instant::now();
        let ok = tick();
        ticks += 1;

        consecutive_failures = if ok {
            0
        } else {
            consecutive_failures.saturating_add(1)
        };
        if !ok {
            tracing::warn!(
                consecutive_failures,
                "reconciliation failed, backing off"
            );
        }

        let deadline = started + next_delay(interval, consecutive_failures);
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return ticks;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(SHUTDOWN_POLL));
        }
    }

    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    #[test]
    fn delay_stays_at_the_interval_through_the_first_failure() {
        let d = Duration::from_secs(10);
        assert_eq!(next_delay(d, 0), d);
        assert_eq!(next_delay(d, 1), d);
    }

    #[test]
    fn delay_doubles_per_consecutive_failure_up_to_eight_times() {
        let d = Duration::from_secs(10);
        assert_eq!(next_delay(d, 2), d * 2);
        assert_eq!(next_delay(d, 3), d * 4);
        assert_eq!(next_delay(d, 4), d * 8);
        assert_eq!(next_delay(d, 9), d * 8);
    }

    #[test]
    fn loop_stops_after_shutdown_and_finishes_the_current_tick() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicU64::new(0));

        let ticks = {
            let shutdown = shutdown.clone();
            let count = count.clone();
            run_loop(Duration::from_millis(1), &shutdown.clone(), move || {
                let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 3 {
                    shutdown.store(true, Ordering::SeqCst);
                }
                true
            })
        };

        assert_eq!(ticks, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn loop_runs_zero_ticks_when_shutdown_is_already_raised() {
        let shutdown = AtomicBool::new(true);
        let ticks = run_loop(Duration::from_millis(1), &shutdown, || true);
        assert_eq!(ticks, 0);
    }

    #[test]
    fn failures_back_off_and_success_resets() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicU64::new(0));
        let started = Instant::now();

        {
            let shutdown = shutdown.clone();
            let count = count.clone();
            run_loop(Duration::from_millis(5), &shutdown.clone(), move || {
                let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    shutdown.store(true, Ordering::SeqCst);
                }
                n != 1
            });
        }

        // tick 1 fails (wait 5ms), tick 2 succeeds (wait 5ms), tick 3 stops.
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
