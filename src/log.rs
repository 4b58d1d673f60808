use anyhow::Result;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

/// log level used when `RUST_LOG` is not set, from the number of `-v` flags
pub fn default_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// installs the global subscriber. `RUST_LOG` directives take priority over `verbose`
pub fn init_logging(verbose: u8) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose).into())
        .from_env()?;
    let subscriber = fmt().with_env_filter(filter).with_thread_ids(verbose > 1);
    if verbose > 0 {
        tracing::subscriber::set_global_default(subscriber.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(subscriber.compact().finish())?;
    }
    Ok(())
}
