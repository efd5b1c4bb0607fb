use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use bucketgate::local::LocalRateLimiterOptions;
use bucketgate::{
    Capacity, LocalRateLimiter, ManualClock, RateLimiter, RateLimiterOptions, RefillPerMinute,
};

fn options(capacity: u64, refill_per_minute: u64) -> RateLimiterOptions {
    RateLimiterOptions {
        local: LocalRateLimiterOptions {
            capacity: Capacity::try_from(capacity).unwrap(),
            refill_per_minute: RefillPerMinute::from(refill_per_minute),
        },
    }
}

#[test]
fn racing_callers_share_exactly_capacity_tokens() {
    let rl = Arc::new(RateLimiter::new(options(100, 0)));
    let barrier = Arc::new(Barrier::new(16));

    let threads: Vec<_> = (0..16)
        .map(|_| {
            let rl = rl.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                (0..50).filter(|_| rl.allow("shared")).count()
            })
        })
        .collect();

    let admitted: usize = threads
        .into_iter()
        .map(|t| t.join().expect("thread panicked"))
        .sum();

    assert_eq!(admitted, 100);
    assert!(!rl.allow("shared"));
}

#[test]
fn many_identities_each_get_their_own_quota() {
    let rl = Arc::new(RateLimiter::new(options(5, 0)));
    let barrier = Arc::new(Barrier::new(8));

    let threads: Vec<_> = (0..8)
        .map(|t| {
            let rl = rl.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                (0..100)
                    .map(|i| format!("user_{}", (i + t) % 25))
                    .filter(|key| rl.allow(key))
                    .count()
            })
        })
        .collect();

    let admitted: usize = threads
        .into_iter()
        .map(|t| t.join().expect("thread panicked"))
        .sum();

    // 25 identities, 5 tokens each, 800 attempts in total.
    assert_eq!(admitted, 125);
    assert_eq!(rl.local().len(), 25);

    for i in 0..25 {
        let status = rl.status(&format!("user_{i}")).unwrap();
        assert_eq!(status.remaining, 0.0);
    }
}

#[test]
fn drained_bucket_recovers_at_the_configured_rate() {
    let clock = ManualClock::new();
    let rl = RateLimiter::with_clock(options(2, 60), clock.clone());

    assert!(rl.allow("k"));
    assert!(rl.allow("k"));
    assert!(!rl.allow("k"));

    clock.advance(Duration::from_millis(500));
    assert!(!rl.allow("k"));
    assert_eq!(rl.status("k").unwrap().remaining, 0.5);

    clock.advance(Duration::from_millis(500));
    assert!(rl.allow("k"));
    assert!(!rl.allow("k"));

    clock.advance(Duration::from_secs(60));
    let status = rl.status("k").unwrap();
    assert_eq!(status.remaining, 2.0);
    assert_eq!(status.capacity, 2);
    assert_eq!(status.refill_per_minute, 60);
}

#[test]
fn status_never_fabricates_state() {
    let limiter = LocalRateLimiter::new(options(3, 60).local);

    for _ in 0..3 {
        assert!(limiter.status("ghost").is_none());
    }

    assert!(limiter.is_empty());
}
