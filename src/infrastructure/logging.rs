/// Log subscriber setup for the binary. Library code only emits events.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the given verbosity. `RUST_LOG` wins when set.
pub fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if quiet {
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter_for(verbose, quiet))
        .try_init()?;
    Ok(())
}
