mod app;
mod ui;

use crate::aggregator::Aggregator;
use crate::cli::WorkloadArgs;
use crate::error::Result;
use crate::workload::Workload;
use std::time::Duration;

pub use app::App;

/// Run a paced synthetic workload and show its sections live
pub fn run(args: &WorkloadArgs, interval: Duration, pace: Duration) -> Result<()> {
    let aggregator = Aggregator::new(args.aggregator_config())?;
    let workload = Workload::start(&aggregator, &args.workload_config(None, Some(pace)))?;
    let mut app = App::new(aggregator, Some(workload), interval);
    app.run()
}
