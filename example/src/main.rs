//! Small service loop instrumented through the process-wide aggregator.
//!
//! Run: cargo run --release (from this directory)

mod cache;
mod checkout;

use std::time::{Duration, Instant};

const REPORT_EVERY: u64 = 500;

fn main() -> iprof::Result<()> {
    iprof::global::init(iprof::AggregatorConfig::default().with_default_window(2_000))?;
    // Receipts are rare enough that a short window still reflects the present
    iprof::global::set_window(checkout::RECEIPT_SECTION, 200)?;

    println!("=== iprof example ===");
    println!("Press Ctrl-C to stop.");
    println!();

    let mut cache = cache::DataCache::new();
    let engine = checkout::CheckoutEngine::new();
    let start = Instant::now();

    for tick in 1u64.. {
        let key = format!("user:{}", tick % 700);
        let body = match cache.get(&key)? {
            Some(hit) => hit,
            None => {
                let body = engine.handle(tick, (tick % 4) as u8)?;
                cache.put(key, body.clone());
                body
            }
        };
        debug_assert!(!body.is_empty());

        if tick.is_multiple_of(REPORT_EVERY) {
            print_report(start.elapsed())?;
        }

        std::thread::sleep(Duration::from_millis(2));
    }

    Ok(())
}

fn print_report(elapsed: Duration) -> iprof::Result<()> {
    println!("[{:>5.1}s]", elapsed.as_secs_f64());
    for (section, s) in iprof::global::stats()? {
        println!(
            "  {:<18} count={:<5} total={:<7} mean={:>8.4}ms p95={:>8.4}ms p99={:>8.4}ms",
            section,
            s.count,
            s.total,
            s.mean,
            s.percentiles.p95(),
            s.percentiles.p99(),
        );
    }
    Ok(())
}
