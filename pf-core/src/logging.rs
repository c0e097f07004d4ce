use tracing_subscriber::EnvFilter;

use crate::errors::*;

// `verbosity` is any valid env-filter directive string, e.g. "info" or "pf_monitor=debug,warn".
pub fn setup_for_cli(verbosity: &str) -> EmptyResult {
    let filter = EnvFilter::try_new(verbosity)?;
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .without_time()
        .compact()
        .try_init()
        .map_err(|e| anyhow!("could not install log subscriber: {e}"))
}
