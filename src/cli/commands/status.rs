use crate::config::Config;
use crate::error::SweepError;
use crate::progress::ProgressStore;
use crate::report;

/// Print aggregate progress. Read-only; does not take the run lock.
pub fn status(config: &Config) -> Result<(), SweepError> {
    let store = ProgressStore::load(config.progress_file.clone());
    println!("{}", report::status_report(&store.stats(), store.path()));
    Ok(())
}
