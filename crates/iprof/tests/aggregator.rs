use chrono::Utc;
use iprof::{Aggregator, AggregatorConfig, Backpressure, Error};
use std::thread;
use std::time::Duration;

fn aggregator() -> Aggregator {
    Aggregator::new(AggregatorConfig::default()).unwrap()
}

/// 20000 readings of 0, 4, 8, ... 79996ms into a window of 5000
fn reference(agg: &Aggregator, section: &str) {
    for i in 0..20_000u64 {
        agg.record(section, Duration::from_millis(i * 4), Utc::now())
            .unwrap();
    }
    agg.flush().unwrap();
}

#[test]
fn reference_scenario_statistics() {
    let agg = aggregator();
    reference(&agg, "ref");

    let s = agg.stat("ref").unwrap();
    assert_eq!(s.count, 5_000);
    assert_eq!(s.total, 20_000);
    assert_eq!(s.mean, 69_998.0);
    assert_eq!(s.percentile(95.0).ceil(), 79_004.0);
    assert_eq!(s.percentile(99.0).ceil(), 79_804.0);
    assert_eq!(s.percentile(100.0), 79_996.0);
    assert_eq!(s.percentiles.min(), 60_000.0);
}

#[test]
fn window_keeps_most_recent_in_arrival_order() {
    let agg = aggregator();
    reference(&agg, "ref");

    let kept: Vec<u128> = agg
        .readings("ref")
        .iter()
        .map(|r| r.duration.as_millis())
        .collect();
    let expected: Vec<u128> = (15_000..20_000u128).map(|i| i * 4).collect();
    assert_eq!(kept, expected);
    assert_eq!(agg.count("ref"), 5_000);
}

#[test]
fn repeated_queries_agree() {
    let agg = aggregator();
    reference(&agg, "ref");

    assert_eq!(agg.stat("ref"), agg.stat("ref"));
    assert_eq!(agg.stats(), agg.stats());
    assert_eq!(agg.stats().get("ref"), agg.stat("ref").as_ref());
}

#[test]
fn unknown_section_has_no_statistics() {
    let agg = aggregator();
    assert!(agg.stat("missing").is_none());
    assert_eq!(agg.count("missing"), 0);
    assert!(agg.readings("missing").is_empty());
    assert!(agg.stats().is_empty());
    assert_eq!(agg.capacity("missing"), iprof::DEFAULT_WINDOW);
}

#[test]
fn concurrent_producers_lose_nothing() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 2_500;

    let agg = aggregator();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let agg = agg.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    agg.record("shared", Duration::from_micros(t * 10 + i), Utc::now())
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    agg.flush().unwrap();

    let s = agg.stat("shared").unwrap();
    assert_eq!(s.total, THREADS * PER_THREAD);
    assert_eq!(s.count, iprof::DEFAULT_WINDOW);
    assert_eq!(agg.processed(), THREADS * PER_THREAD);
    assert_eq!(agg.dropped(), 0);
}

#[test]
fn shrinking_window_drops_oldest() {
    let agg = aggregator();
    for ms in 1..=10u64 {
        agg.record("db", Duration::from_millis(ms), Utc::now())
            .unwrap();
    }
    agg.configure_window("db", 4).unwrap();
    agg.flush().unwrap();

    let kept: Vec<u128> = agg
        .readings("db")
        .iter()
        .map(|r| r.duration.as_millis())
        .collect();
    assert_eq!(kept, vec![7, 8, 9, 10]);
    assert_eq!(agg.capacity("db"), 4);
    assert_eq!(agg.stat("db").unwrap().total, 10);
}

#[test]
fn window_configured_before_first_reading() {
    let agg = aggregator();
    agg.configure_window("small", 2).unwrap();
    for ms in [5u64, 6, 7] {
        agg.record("small", Duration::from_millis(ms), Utc::now())
            .unwrap();
    }
    agg.flush().unwrap();

    let s = agg.stat("small").unwrap();
    assert_eq!(s.count, 2);
    assert_eq!(s.mean, 6.5);
}

#[test]
fn zero_window_is_rejected() {
    let agg = aggregator();
    assert!(matches!(
        agg.configure_window("db", 0),
        Err(Error::InvalidWindow { .. })
    ));
}

#[test]
fn shutdown_rejects_submissions_but_keeps_answering() {
    let agg = aggregator();
    agg.record("db", Duration::from_millis(3), Utc::now())
        .unwrap();
    let timer = agg.begin("db");
    agg.shutdown();
    agg.shutdown();

    assert!(matches!(
        agg.record("db", Duration::from_millis(1), Utc::now()),
        Err(Error::AggregatorClosed)
    ));
    assert!(matches!(
        agg.configure_window("db", 10),
        Err(Error::AggregatorClosed)
    ));
    assert!(matches!(agg.flush(), Err(Error::AggregatorClosed)));
    assert!(matches!(timer.end(), Err(Error::AggregatorClosed)));

    // Work queued before shutdown is drained
    let s = agg.stat("db").unwrap();
    assert_eq!(s.count, 1);
    assert_eq!(s.mean, 3.0);
}

#[test]
fn shutdown_under_load_applies_every_accepted_reading() {
    for _ in 0..25 {
        let agg = aggregator();
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let agg = agg.clone();
                thread::spawn(move || {
                    let mut accepted = 0u64;
                    while agg
                        .record("busy", Duration::from_micros(1), Utc::now())
                        .is_ok()
                    {
                        accepted += 1;
                    }
                    accepted
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(2));
        agg.shutdown();

        let accepted: u64 = producers.into_iter().map(|h| h.join().unwrap()).sum();
        let applied = agg.stat("busy").map(|s| s.total).unwrap_or(0);
        assert_eq!(accepted, applied);
        assert_eq!(agg.processed(), applied);
    }
}

#[test]
fn dropped_readings_are_accounted_for() {
    const SUBMITTED: u64 = 20_000;

    let config = AggregatorConfig::default()
        .with_queue_depth(1)
        .with_backpressure(Backpressure::Drop);
    let agg = Aggregator::new(config).unwrap();
    for i in 0..SUBMITTED {
        agg.record("burst", Duration::from_nanos(i), Utc::now())
            .unwrap();
    }
    agg.flush().unwrap();

    assert_eq!(agg.processed() + agg.dropped(), SUBMITTED);
    let total = agg.stat("burst").map(|s| s.total).unwrap_or(0);
    assert_eq!(total, agg.processed());
}

#[test]
fn timer_measures_elapsed_time() {
    let agg = aggregator();
    let timer = agg.begin("sleep");
    thread::sleep(Duration::from_millis(5));
    let elapsed = timer.end().unwrap();
    assert!(elapsed >= Duration::from_millis(5));

    let value = agg.time("closure", || 21 * 2).unwrap();
    assert_eq!(value, 42);
    agg.flush().unwrap();

    assert!(agg.stat("sleep").unwrap().mean >= 5.0);
    assert_eq!(agg.sections(), vec!["closure".to_string(), "sleep".to_string()]);
}
