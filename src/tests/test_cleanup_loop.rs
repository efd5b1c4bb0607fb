use std::{sync::Arc, time::Duration};

use crate::{Capacity, LocalRateLimiterOptions, RateLimiter, RateLimiterOptions, RefillPerMinute};

// Refills 10 tokens per second, so one spent token is back within 100ms.
fn rate_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimiterOptions {
        local: LocalRateLimiterOptions {
            capacity: Capacity::try_from(10).unwrap(),
            refill_per_minute: RefillPerMinute::from(600),
        },
    }))
}

#[test]
fn test_local_cleanup_loop_runs() {
    let rl = rate_limiter();

    // Add some entries
    rl.allow("key1");
    rl.allow("key2");
    rl.allow("key3");

    // Verify entries exist
    assert_eq!(rl.local().len(), 3);

    // Start cleanup loop with aggressive timing (100ms stale, 50ms interval)
    rl.run_cleanup_loop_with_config(100, 50);

    // Wait for entries to become stale, refill and be cleaned up
    std::thread::sleep(Duration::from_millis(400));

    assert_eq!(rl.local().len(), 0);

    rl.stop_cleanup_loop();
}

#[test]
fn test_cleanup_loop_keeps_active_entries() {
    let rl = rate_limiter();
    rl.allow("key1");

    // Start cleanup with 500ms stale threshold, 100ms interval
    rl.run_cleanup_loop_with_config(500, 100);

    // Keep the key active by using it periodically
    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(100));
        rl.allow("key1");
    }

    assert_eq!(rl.local().len(), 1);

    rl.stop_cleanup_loop();
}

#[test]
fn test_cleanup_loop_keeps_draining_buckets() {
    // No refill: an exhausted bucket never becomes full, so it is never evicted.
    let rl = Arc::new(RateLimiter::new(RateLimiterOptions {
        local: LocalRateLimiterOptions {
            capacity: Capacity::try_from(1).unwrap(),
            refill_per_minute: RefillPerMinute::from(0),
        },
    }));
    rl.allow("key1");

    rl.run_cleanup_loop_with_config(50, 20);
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(rl.local().len(), 1);
    assert!(!rl.allow("key1"));

    rl.stop_cleanup_loop();
}

#[test]
fn test_stop_cleanup_loop_prevents_future_cleanup() {
    let rl = rate_limiter();
    rl.allow("key1");
    assert_eq!(rl.local().len(), 1);

    // The cleanup thread runs immediately on start, so stop before the key is stale.
    rl.run_cleanup_loop_with_config(100, 80);
    std::thread::sleep(Duration::from_millis(20));

    // Idempotent stop
    rl.stop_cleanup_loop();
    rl.stop_cleanup_loop();

    // If the loop were still running, a later tick would observe the key as stale and remove it.
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(rl.local().len(), 1);
}

#[test]
fn test_run_cleanup_loop_with_config_is_idempotent() {
    let rl = rate_limiter();
    rl.allow("key1");
    assert_eq!(rl.local().len(), 1);

    // Start with a long stale threshold.
    rl.run_cleanup_loop_with_config(5_000, 50);

    // Second call should be a no-op (no reconfiguration / no second loop).
    rl.run_cleanup_loop_with_config(10, 50);

    // Long enough that the key would be stale and full under the second configuration.
    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(rl.local().len(), 1);

    rl.stop_cleanup_loop();
}

#[test]
fn test_stop_then_restart_cleanup_loop_works() {
    let rl = rate_limiter();
    rl.allow("key1");
    assert_eq!(rl.local().len(), 1);

    rl.run_cleanup_loop_with_config(100, 80);
    std::thread::sleep(Duration::from_millis(20));
    rl.stop_cleanup_loop();
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(rl.local().len(), 1);

    // Restart: now the key is stale and full and should be removed by the first pass.
    rl.run_cleanup_loop_with_config(100, 80);
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(rl.local().len(), 0);

    rl.stop_cleanup_loop();
}

#[test]
fn test_cleanup_loop_ends_when_limiter_is_dropped() {
    let rl = rate_limiter();
    rl.allow("key1");
    rl.run_cleanup_loop_with_config(100, 10);

    let weak = Arc::downgrade(&rl);
    drop(rl);

    std::thread::sleep(Duration::from_millis(50));
    assert!(weak.upgrade().is_none());
}
