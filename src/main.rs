#[macro_use]
extern crate tracing;
#[macro_use]
extern crate anyhow;

use anyhow::Result;
use clap::Parser;
use tokio::{runtime, task::LocalSet};

mod args;
mod log;
mod workload;

use args::{ArgsParser, Cmd};
use workload::Config;

fn main() -> Result<()> {
    let args = ArgsParser::parse();
    log::init_logging(args.verbose)?;

    let cfg = match args.cmd {
        Cmd::Check { config } => {
            let cfg = workload::load(&config)?;
            info!("Configuration is valid:\n{cfg:#?}");
            return Ok(());
        }
        Cmd::Run {
            config: Some(config),
        } => workload::load(&config)?,
        Cmd::Run { config: None } => {
            info!("No configuration file given, running the example workload");
            Config::example()?
        }
    };

    // every task shares one thread, and only gives it up at an .await
    debug!("Launching runtime");
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = LocalSet::new();
    let report = local.block_on(&runtime, workload::run(cfg));
    drop(local);
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!("Workload failed: {e:#}");
            return Err(e);
        }
    };
    let secs = report.elapsed.as_secs_f64();
    info!(
        "Moved {} message(s) over {} channel(s) in {:.3}s ({:.0} msg/s)",
        report.received,
        report.channels,
        secs,
        report.received as f64 / secs.max(f64::EPSILON),
    );
    Ok(())
}
