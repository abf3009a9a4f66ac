use super::report::{self, ReportMeta};
use crate::aggregator::Aggregator;
use crate::cli::WorkloadArgs;
use crate::error::{Error, Result};
use crate::workload::Workload;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(
    args: &WorkloadArgs,
    duration: Option<Duration>,
    percentiles: &[f64],
    json: bool,
    csv: bool,
) -> Result<()> {
    let aggregator = Aggregator::new(args.aggregator_config())?;
    let workload = Workload::start(
        &aggregator,
        &args.workload_config(Some(args.iterations), None),
    )?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| Error::Workload(format!("failed to set Ctrl-C handler: {e}")))?;

    let start = Instant::now();
    let mut last_progress = Instant::now();
    eprintln!(
        "Running {} producers over {} sections (Ctrl-C to stop)...",
        args.producers,
        args.sections.len()
    );

    while !workload.is_finished() {
        let out_of_time = duration.is_some_and(|max| start.elapsed() >= max);
        if out_of_time || interrupted.load(Ordering::SeqCst) {
            workload.stop();
        }

        if last_progress.elapsed() >= PROGRESS_INTERVAL {
            eprint!(
                "\rSubmitted: {} | Processed: {} | Elapsed: {:.1}s",
                report::format_count(workload.submitted()),
                report::format_count(aggregator.processed()),
                start.elapsed().as_secs_f64()
            );
            last_progress = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(20));
    }

    let submitted = workload.join()?;
    aggregator.flush()?;
    let elapsed = start.elapsed();
    eprintln!("\rDone.{:60}", "");

    let stats = aggregator.stats();
    let meta = ReportMeta {
        generated: chrono::Utc::now(),
        elapsed,
        submitted,
        processed: aggregator.processed(),
        dropped: aggregator.dropped(),
    };

    if json {
        print!("{}", report::render_json(&meta, &stats, percentiles));
    } else if csv {
        print!("{}", report::render_csv(&stats, percentiles));
    } else {
        print!("{}", report::render_table(&meta, &stats, percentiles));
    }

    aggregator.shutdown();
    Ok(())
}
