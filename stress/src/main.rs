use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;

use bucketgate::local::LocalRateLimiterOptions;
use bucketgate::{Capacity, RateLimiter, RateLimiterOptions, RefillPerMinute};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Operation {
    /// Spend a token per call.
    Allow,
    /// Read the bucket without spending.
    Status,
    /// Nine `allow` calls for every `status` call.
    Mixed,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyDist {
    Hot,
    Uniform,
    Skewed,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Mode {
    Max,
    TargetQps,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bucketgate-stress",
    about = "Load test / benchmark harness for bucketgate"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = Operation::Allow)]
    operation: Operation,

    #[arg(long, value_enum, default_value_t = KeyDist::Hot)]
    key_dist: KeyDist,

    #[arg(long, value_enum, default_value_t = Mode::Max)]
    mode: Mode,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 60)]
    duration_s: u64,

    #[arg(long, default_value_t = 60)]
    capacity: u64,

    #[arg(long, default_value_t = 60)]
    refill_per_minute: u64,

    #[arg(long, default_value_t = 100000)]
    key_space: usize,

    #[arg(long, default_value_t = 0.8)]
    hot_fraction: f64,

    #[arg(long, default_value_t = 100)]
    sample_every: u64,

    /// Evict idle buckets during the run. 0 disables eviction.
    #[arg(long, default_value_t = 0)]
    cleanup_stale_ms: u64,

    #[arg(long, default_value_t = 1000)]
    cleanup_interval_ms: u64,

    #[arg(long)]
    target_qps: Option<u64>,

    #[arg(long)]
    burst_qps: Option<u64>,

    #[arg(long, default_value_t = 30_000)]
    burst_period_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    burst_duration_ms: u64,
}

#[derive(Default)]
struct Counts {
    allowed: AtomicU64,
    rejected: AtomicU64,
    status_found: AtomicU64,
    status_missing: AtomicU64,
}

fn build_options(args: &Args) -> RateLimiterOptions {
    RateLimiterOptions {
        local: LocalRateLimiterOptions {
            capacity: Capacity::try_from(args.capacity).unwrap(),
            refill_per_minute: RefillPerMinute::from(args.refill_per_minute),
        },
    }
}

fn build_keys(args: &Args) -> Vec<String> {
    let n = match args.key_dist {
        KeyDist::Hot => 1,
        _ => args.key_space.max(1),
    };
    (0..n).map(|i| format!("user_{i}")).collect()
}

fn should_sample(iter: u64, sample_every: u64) -> bool {
    if sample_every <= 1 {
        return true;
    }

    iter.is_multiple_of(sample_every)
}

fn qps_for_now(args: &Args, started: Instant) -> Option<u64> {
    if args.mode == Mode::Max {
        return None;
    }

    let base = args.target_qps?;

    if let Some(burst_qps) = args.burst_qps {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let in_period = elapsed_ms % args.burst_period_ms;
        if in_period < args.burst_duration_ms {
            return Some(burst_qps);
        }
    }

    Some(base)
}

fn pick_key<'a>(args: &Args, keys: &'a [String], thread_rng: &mut impl FnMut() -> u64) -> &'a str {
    match args.key_dist {
        KeyDist::Hot => &keys[0],
        KeyDist::Uniform => {
            let idx = (thread_rng() as usize) % keys.len();
            &keys[idx]
        }
        KeyDist::Skewed => {
            let r = (thread_rng() % 10_000) as f64 / 10_000.0;
            if r < args.hot_fraction {
                &keys[0]
            } else {
                let idx = 1 + ((thread_rng() as usize) % (keys.len().saturating_sub(1).max(1)));
                &keys[idx % keys.len()]
            }
        }
    }
}

fn print_results(
    args: &Args,
    elapsed: Duration,
    ops: u64,
    hist: &Histogram<u64>,
    counts: &Counts,
    buckets: usize,
) {
    let ops_s = ops as f64 / elapsed.as_secs_f64();

    println!("operation={:?} mode={:?}", args.operation, args.mode);
    println!(
        "threads={} duration_s={} capacity={} refill_per_minute={} key_dist={:?} key_space={}",
        args.threads,
        args.duration_s,
        args.capacity,
        args.refill_per_minute,
        args.key_dist,
        args.key_space
    );
    println!(
        "elapsed_s={:.3} ops={} ops_per_s={:.0} buckets={}",
        elapsed.as_secs_f64(),
        ops,
        ops_s,
        buckets
    );
    println!(
        "allowed={} rejected={} status_found={} status_missing={}",
        counts.allowed.load(Ordering::Relaxed),
        counts.rejected.load(Ordering::Relaxed),
        counts.status_found.load(Ordering::Relaxed),
        counts.status_missing.load(Ordering::Relaxed)
    );
    if !hist.is_empty() {
        println!(
            "lat_us p50={} p95={} p99={} p999={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.max()
        );
        println!("sample_every={} samples={}", args.sample_every, hist.len());
    } else {
        println!("no latency samples collected");
    }
}

fn main() {
    let args = Args::parse();
    let keys = Arc::new(build_keys(&args));

    let rl = Arc::new(RateLimiter::new(build_options(&args)));
    if args.cleanup_stale_ms > 0 {
        rl.run_cleanup_loop_with_config(args.cleanup_stale_ms, args.cleanup_interval_ms);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let counts = Arc::new(Counts::default());
    let total_ops = Arc::new(AtomicU64::new(0));

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let rl = Arc::clone(&rl);
        let keys = Arc::clone(&keys);
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let total_ops = Arc::clone(&total_ops);
        let args = args.clone();

        handles.push(std::thread::spawn(move || {
            let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
            let mut i = 0_u64;
            let mut seed = (t as u64 + 1) * 0x9E37_79B9_7F4A_7C15;
            let mut next_deadline = Instant::now();

            let mut rng_u64 = || {
                // xorshift64*
                seed ^= seed >> 12;
                seed ^= seed << 25;
                seed ^= seed >> 27;
                seed = seed.wrapping_mul(0x2545_F491_4F6C_DD1D);
                seed
            };

            while !stop.load(Ordering::Relaxed) {
                if Instant::now() >= deadline {
                    break;
                }

                if let Some(qps) = qps_for_now(&args, started) {
                    let per_op_ns = 1_000_000_000u64 / qps.max(1);
                    let now = Instant::now();
                    if now < next_deadline {
                        std::thread::sleep(next_deadline - now);
                    }
                    next_deadline += Duration::from_nanos(per_op_ns);
                }

                i = i.wrapping_add(1);
                let k = pick_key(&args, &keys, &mut rng_u64);
                let sample = should_sample(i, args.sample_every);
                let t0 = if sample { Some(Instant::now()) } else { None };

                let check_status = match args.operation {
                    Operation::Allow => false,
                    Operation::Status => true,
                    Operation::Mixed => i.is_multiple_of(10),
                };

                if check_status {
                    match rl.status(k) {
                        Some(_) => counts.status_found.fetch_add(1, Ordering::Relaxed),
                        None => counts.status_missing.fetch_add(1, Ordering::Relaxed),
                    };
                } else if rl.allow(k) {
                    counts.allowed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counts.rejected.fetch_add(1, Ordering::Relaxed);
                }

                if let Some(t0) = t0 {
                    let us = t0.elapsed().as_micros() as u64;
                    let _ = hist.record(us.max(1));
                }

                total_ops.fetch_add(1, Ordering::Relaxed);
            }

            hist
        }));
    }

    std::thread::sleep(Duration::from_secs(args.duration_s));
    stop.store(true, Ordering::Relaxed);

    let mut merged = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
    for h in handles {
        let hist = h.join().unwrap();
        merged.add(&hist).unwrap();
    }

    rl.stop_cleanup_loop();

    let elapsed = started.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    print_results(&args, elapsed, ops, &merged, &counts, rl.local().len());
}
