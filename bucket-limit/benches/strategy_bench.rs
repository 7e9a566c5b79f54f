use std::fmt;
use std::num::NonZeroU32;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::DefaultKeyedRateLimiter;
use governor::RateLimiter;
use governor::clock::Clock;
use governor::clock::DefaultClock;

use bucket_limit::KeyedLimiter;
use bucket_limit::Quota;
use bucket_limit::Reason;
use bucket_limit::Strategy;

// Wrapper to bridge Governor's keyed limiter into the bucket-limit Strategy trait
struct GovernorStrategy {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
}

impl fmt::Debug for GovernorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GovernorStrategy")
    }
}

impl Strategy for GovernorStrategy {
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        match self.limiter.check_key(&key.to_owned()) {
            Ok(_) => ControlFlow::Continue(()),
            Err(negative) => {
                let wait: Duration = negative.wait_time_from(self.clock.now());
                ControlFlow::Break(Reason::Overloaded { retry_after: wait })
            }
        }
    }
}

fn client_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xff, (i >> 8) & 0xff, i & 0xff))
        .collect()
}

fn bench_single_key<S: Strategy>(group_name: &str, c: &mut Criterion, strategy: Arc<S>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("single-key", |b| {
        b.iter(|| {
            let _ = black_box(strategy.as_ref()).process(black_box("1.2.3.4"));
        })
    });

    let keys = client_keys(10_000);
    group.bench_function("10k-keys", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            let _ = black_box(strategy.as_ref()).process(&keys[i]);
        })
    });

    group.finish();
}

fn bench_parallel_keys<S: Strategy + Send + Sync + 'static>(
    group_name: &str,
    c: &mut Criterion,
    strategy: Arc<S>,
    shared_key: bool,
) {
    let mut group = c.benchmark_group(group_name);
    let keys = Arc::new(client_keys(1_024));

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for t in 0..n {
                        let s = Arc::clone(&strategy);
                        let bar = Arc::clone(&barrier);
                        let keys = Arc::clone(&keys);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for i in 0..iters_per_thread as usize {
                                let key = if shared_key {
                                    &keys[0]
                                } else {
                                    &keys[(t * 131 + i) % keys.len()]
                                };
                                let _ = black_box(s.process(key));
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let limit_val = 1_000_000;
    let limit = NonZeroUsize::new(limit_val).unwrap();

    let keyed = Arc::new(KeyedLimiter::new(Quota::per_second(limit)));

    let gov_quota = governor::Quota::per_second(NonZeroU32::new(limit_val as u32).unwrap());
    let gov = Arc::new(GovernorStrategy {
        limiter: RateLimiter::keyed(gov_quota),
        clock: DefaultClock::default(),
    });

    bench_single_key("KeyedLimiter", c, Arc::clone(&keyed));
    bench_parallel_keys("KeyedLimiter-SharedKey", c, Arc::clone(&keyed), true);
    bench_parallel_keys("KeyedLimiter-SpreadKeys", c, keyed, false);

    bench_single_key("Governor", c, Arc::clone(&gov));
    bench_parallel_keys("Governor-SharedKey", c, Arc::clone(&gov), true);
    bench_parallel_keys("Governor-SpreadKeys", c, gov, false);
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
