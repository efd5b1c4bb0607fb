use std::time::{Duration, Instant};

use crate::TokenBucket;

#[test]
fn new_bucket_starts_full() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new(5, 1.0, now);

    assert_eq!(bucket.tokens(), 5.0);
    assert_eq!(bucket.inspect(now), (5, 5.0, 1.0));
}

#[test]
fn admits_exactly_capacity_without_refill() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new(3, 0.0, now);

    let decisions: Vec<bool> = (0..4).map(|_| bucket.try_consume(1.0, now)).collect();

    assert_eq!(decisions, vec![true, true, true, false]);
    assert_eq!(bucket.tokens(), 0.0);
}

#[test]
fn rejection_leaves_tokens_untouched() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new(3, 0.0, now);
    bucket.set_tokens(0.5);

    assert!(!bucket.try_consume(1.0, now));
    assert_eq!(bucket.tokens(), 0.5);
}

#[test]
fn admits_after_one_refill_interval() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(2, 1.0, t0);
    bucket.set_tokens(0.0);

    assert!(bucket.try_consume(1.0, t0 + Duration::from_secs(1)));
    assert!(!bucket.try_consume(1.0, t0 + Duration::from_secs(1)));
}

#[test]
fn rejects_before_refill_interval() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(2, 1.0, t0);
    bucket.set_tokens(0.0);

    assert!(!bucket.try_consume(1.0, t0 + Duration::from_millis(400)));

    // The rejected call still banked its refill.
    let (_, tokens, _) = bucket.inspect(t0 + Duration::from_millis(400));
    assert!((tokens - 0.4).abs() < 1e-9);
}

#[test]
fn fractional_refill_accumulates_across_calls() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1, 1.0, t0);
    bucket.set_tokens(0.0);

    assert!(!bucket.try_consume(1.0, t0 + Duration::from_millis(500)));
    assert!(bucket.try_consume(1.0, t0 + Duration::from_millis(1000)));
}

#[test]
fn idle_refill_is_clamped_to_capacity() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(4, 2.0, t0);
    bucket.set_tokens(1.0);

    let (capacity, tokens, _) = bucket.inspect(t0 + Duration::from_secs(3600));

    assert_eq!(capacity, 4);
    assert_eq!(tokens, 4.0);
}

#[test]
fn inspect_refills_without_consuming() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(10, 1.0, t0);
    bucket.set_tokens(2.0);

    let later = t0 + Duration::from_secs(3);
    let first = bucket.inspect(later);
    let second = bucket.inspect(later);
    let third = bucket.inspect(later);

    assert_eq!(first.1, 5.0);
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(bucket.last_update(), later);
}

#[test]
fn earlier_instant_counts_as_no_elapsed_time() {
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(2);
    let mut bucket = TokenBucket::new(5, 1.0, t1);
    bucket.set_tokens(1.0);

    assert!(bucket.try_consume(1.0, t0));
    assert_eq!(bucket.tokens(), 0.0);
    assert_eq!(bucket.last_update(), t1);

    assert!(!bucket.try_consume(1.0, t0));
}

#[test]
fn tokens_stay_within_bounds_over_mixed_operations() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(7, 3.0, t0);
    let mut now = t0;

    // Deterministic pseudo-random walk over step sizes and costs.
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..10_000 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;

        now += Duration::from_millis(state % 700);

        if state % 5 == 0 {
            bucket.inspect(now);
        } else {
            bucket.try_consume((state % 3) as f64, now);
        }

        assert!(bucket.tokens() >= 0.0);
        assert!(bucket.tokens() <= 7.0);
    }
}
