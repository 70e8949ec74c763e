use crate::config::Config;
use crate::error::SweepError;
use crate::progress::ProgressStore;
use crate::run_lock::RunLock;

/// Delete the progress file. Refused while a run holds the lock.
pub fn reset(config: &Config) -> Result<(), SweepError> {
    let mut lock = RunLock::open(&config.progress_file)?;
    let _guard = lock.try_acquire()?;

    let store = ProgressStore::load(config.progress_file.clone());
    if store.reset()? {
        println!("✓ Progress reset");
    } else {
        println!("✓ Nothing to reset: {} does not exist", store.path());
    }
    Ok(())
}
