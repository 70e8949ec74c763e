use crate::config::Config;
use crate::discovery::{self, UnitOfWork};
use crate::error::SweepError;
use crate::progress::ProgressStore;
use crate::quality::{self, Assessment};
use crate::report;

/// Print effective settings and the queue a run would process.
///
/// Never invokes the tool and never writes the progress file.
pub fn dry_run(config: &Config) -> Result<(), SweepError> {
    let store = ProgressStore::load(config.progress_file.clone());

    println!("Effective configuration:");
    for (key, value, source) in config.effective_config() {
        println!("  {key} = {value}  [{source}]");
    }
    match config.tool.resolve() {
        Some(path) => println!("  tool resolves to {}", path.display()),
        None => println!("  ⚠ tool '{}' not found on PATH", config.tool.program),
    }
    println!();

    let units = discovery::discover(config.projects_root()?, &store)?;
    if units.is_empty() {
        println!("✓ Nothing to do: all projects have been processed");
        return Ok(());
    }

    println!(
        "{}",
        report::run_banner(
            units.len(),
            config.workers.min(units.len()),
            &discovery::platform_distribution(&units),
        )
    );
    for unit in &units {
        println!("  {}", describe(unit, config.min_words));
    }
    println!("\nDry run: no tool invoked, progress file untouched.");
    Ok(())
}

fn describe(unit: &UnitOfWork, min_words: usize) -> String {
    match quality::assess(&unit.output_path, min_words) {
        Ok(Assessment::Present {
            words,
            acceptable: true,
        }) => format!("{} (would skip: {words} words)", unit.id),
        Ok(Assessment::Present { words, .. }) => format!("{} (regenerate: {words} words)", unit.id),
        Ok(Assessment::Missing) => format!("{} (generate)", unit.id),
        Err(e) => format!("{} (unreadable output: {e})", unit.id),
    }
}
