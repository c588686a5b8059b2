//! Load testing for the balancer.

use std::sync::Arc;
use std::time::Instant;
use l7_balancer::load_balancer::ServerPool;

mod common;

const NAMES: [&str; 10] = ["b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7", "b8", "b9"];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_performance() {
    let mut backends = Vec::new();
    for name in NAMES {
        backends.push(common::start_mock_backend(name).await);
    }
    let pool = Arc::new(ServerPool::from_addresses(backends.iter().map(|b| b.url())).unwrap());
    let (proxy, shutdown) = common::start_proxy(pool.clone()).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut failures = 0;
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let (status, _) = common::get(&client, proxy).await;
                if status == 200 {
                    latencies.push(req_start.elapsed());
                } else {
                    failures += 1;
                }
            }
            (latencies, failures)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut failures = 0;
    for task in tasks {
        let (latencies, failed) = task.await.unwrap();
        all_latencies.extend(latencies);
        failures += failed;
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(failures, 0, "every request should reach a backend");
    assert_eq!(all_latencies.len(), total_requests);

    // Every backend is alive, so the rotation hands out exact shares.
    let counts: Vec<u64> = pool.snapshot().iter().map(|s| s.requests).collect();
    assert_eq!(counts.iter().sum::<u64>(), total_requests as u64);
    assert!(counts.iter().all(|&c| c == (total_requests / NAMES.len()) as u64), "{:?}", counts);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Backends:       {}", NAMES.len());
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
}

/// Selection alone, from many threads at once, with no network in the way.
#[test]
fn test_select_next_throughput() {
    let addresses: Vec<String> = (0..10).map(|i| format!("http://10.0.0.{}:8080", i + 1)).collect();
    let pool = Arc::new(ServerPool::from_addresses(&addresses).unwrap());
    pool.backends()[3].set_alive(false);

    let threads = 8;
    let per_thread = 100_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for _ in 0..per_thread {
                    let backend = pool.select_next().expect("nine backends are alive");
                    pool.record_request(&backend);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let duration = start.elapsed();
    let total = (threads * per_thread) as u64;
    println!(
        "select_next: {} selections in {:?} ({:.0}/s)",
        total,
        duration,
        total as f64 / duration.as_secs_f64()
    );

    let counts: Vec<u64> = pool.snapshot().iter().map(|s| s.requests).collect();
    assert_eq!(counts[3], 0);
    assert_eq!(counts.iter().sum::<u64>(), total);
    // Nine live backends share the load within one selection of each other.
    let live: Vec<u64> = counts.iter().enumerate().filter(|(i, _)| *i != 3).map(|(_, c)| *c).collect();
    let (min, max) = (live.iter().min().unwrap(), live.iter().max().unwrap());
    assert!(max - min <= 1, "{:?}", counts);
}
