//! Black-box tests of the `reqsweep` binary.

mod test_support;

use assert_cmd::Command;
use camino::Utf8PathBuf;
use predicates::prelude::*;
use reqsweep::progress::{ProgressStore, UnitStatus};
use reqsweep::run_lock::RunLock;
use tempfile::TempDir;
use test_support::Projects;

/// Binary with a clean environment rooted at `cwd`.
fn reqsweep(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("reqsweep").unwrap();
    cmd.current_dir(cwd.path())
        .env_remove("PROJECTS_DIR")
        .env_remove("REQSWEEP_TOOL")
        .env_remove("RUST_LOG")
        .env("HOME", cwd.path())
        .env("NO_COLOR", "1");
    cmd
}

/// TOML config running `sh -c <script> sh {output_dir}`, so scripts see the
/// expanded output directory as `$1`.
fn write_tool_config(cwd: &TempDir, script: &str, timeout_secs: u64) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(cwd.path().join("reqsweep.toml")).unwrap();
    std::fs::write(
        &path,
        format!(
            "[run]\nworkers = 2\ninter_unit_delay_ms = 0\nunit_timeout_secs = {timeout_secs}\n\n\
             [tool]\nprogram = \"sh\"\nargs = [\"-c\", {script:?}, \"sh\", \"{{output_dir}}\"]\n"
        ),
    )
    .unwrap();
    path
}

fn progress_arg(projects: &Projects) -> [String; 2] {
    ["--progress-file".to_string(), projects.progress_file.to_string()]
}

#[test]
fn test_status_on_empty_progress() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    reqsweep(&cwd)
        .arg("--status")
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Total processed: 0"))
        .stdout(predicate::str::contains(projects.progress_file.as_str()));
}

#[test]
fn test_status_reports_recorded_outcomes() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    let store = ProgressStore::load(projects.progress_file.clone());
    store.record_outcome("a", "web-app", UnitStatus::Success, 2100, None);
    store.record_outcome("b", "api-service", UnitStatus::Success, 2600, None);
    store.record_outcome("c", "api-service", UnitStatus::Success, 2400, None);
    store.record_outcome("d", "existing", UnitStatus::Skipped, 3000, None);

    reqsweep(&cwd)
        .arg("--status")
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Total processed: 4"))
        .stdout(predicate::str::contains("Skipped: 1"))
        .stdout(predicate::str::is_match(r"(?s)api-service: 2 projects.*web-app: 1 projects").unwrap());
}

#[test]
fn test_corrupt_progress_file_is_not_fatal() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    std::fs::write(&projects.progress_file, "{\"processedCount\": ").unwrap();

    reqsweep(&cwd)
        .arg("--status")
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Total processed: 0"));
}

#[test]
fn test_reset_deletes_progress() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    ProgressStore::load(projects.progress_file.clone())
        .record_outcome("a", "unknown", UnitStatus::Failed, 0, None);
    assert!(projects.progress_file.exists());

    reqsweep(&cwd)
        .arg("--reset")
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress reset"));
    assert!(!projects.progress_file.exists());
}

#[test]
fn test_missing_root_exits_with_discovery_code() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    reqsweep(&cwd)
        .args(["--root", "/definitely/not/a/projects/dir"])
        .args(progress_arg(&projects))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not a readable directory"));
}

#[test]
fn test_invalid_worker_count_is_rejected() {
    let cwd = TempDir::new().unwrap();
    reqsweep(&cwd)
        .args(["--workers", "0", "--status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_conflicting_operations_are_rejected() {
    let cwd = TempDir::new().unwrap();
    reqsweep(&cwd).args(["--status", "--reset"]).assert().code(2);
}

#[test]
fn test_dry_run_lists_queue_without_side_effects() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    projects.with_spec("alpha");
    projects.with_spec("beta").with_requirements("beta", 2600);

    reqsweep(&cwd)
        .arg("--dry-run")
        .args(["--root", projects.root.as_str()])
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 projects to process"))
        .stdout(predicate::str::contains("alpha (generate)"))
        .stdout(predicate::str::contains("beta (would skip: 2600 words)"))
        .stdout(predicate::str::contains("[cli]"));
    assert!(!projects.progress_file.exists());
}

#[test]
fn test_run_is_refused_while_another_holds_the_lock() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    let mut lock = RunLock::open(&projects.progress_file).unwrap();
    let _guard = lock.try_acquire().unwrap();

    reqsweep(&cwd)
        .arg("--reset")
        .args(progress_arg(&projects))
        .assert()
        .code(9)
        .stderr(predicate::str::contains("Another run already holds"));
}

#[cfg(unix)]
#[test]
fn test_full_run_then_resume_via_config_file() {
    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    projects.with_spec("alpha");
    projects.with_spec("beta");

    let script = test_support::writing_script("Discord Bot", 2050);
    let config_path = write_tool_config(&cwd, &script, 30);

    reqsweep(&cwd)
        .args(["--config", config_path.as_str(), "--root", projects.root.as_str()])
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 projects to process"))
        .stdout(predicate::str::contains("Run Complete"))
        .stdout(predicate::str::contains("discord-bot: 2 projects"));

    assert!(projects.requirements("alpha").exists());
    let stats = ProgressStore::load(projects.progress_file.clone()).stats();
    assert_eq!(stats.total_success, 2);

    reqsweep(&cwd)
        .args(["--config", config_path.as_str(), "--root", projects.root.as_str()])
        .args(progress_arg(&projects))
        .assert()
        .success()
        .stdout(predicate::str::contains("Found existing progress: 2 projects"))
        .stdout(predicate::str::contains("All projects have been processed"));
}

#[cfg(unix)]
#[test]
fn test_relative_root_gives_tool_a_real_output_dir() {
    let cwd = TempDir::new().unwrap();
    let outputs = cwd.path().join("projects/alpha/ai-generated");
    std::fs::create_dir_all(&outputs).unwrap();
    std::fs::write(outputs.join("specification.yaml"), "project:\n  type: cli-tool\n").unwrap();

    let script = r#"
        cat > /dev/null
        if [ ! -d "$1" ]; then echo "no such dir: $1 (cwd $PWD)" >&2; exit 1; fi
        { echo '# CLI Tool'; i=0; while [ $i -lt 2100 ]; do echo word; i=$((i+1)); done; } > "$1/requirements.md"
    "#;
    let config_path = write_tool_config(&cwd, script, 30);
    let progress = cwd.path().join("progress.json");

    reqsweep(&cwd)
        .args(["--config", config_path.as_str(), "--root", "projects"])
        .arg("--progress-file")
        .arg(&progress)
        .assert()
        .success()
        .stdout(predicate::str::contains("Run Complete"));

    assert!(outputs.join("requirements.md").is_file());
    let store = ProgressStore::load(Utf8PathBuf::from_path_buf(progress).unwrap());
    let state = store.snapshot();
    assert_eq!(state.completed_projects["alpha"].status, UnitStatus::Success);
    assert!(state.completed_projects["alpha"].word_count >= 2000);
}

#[cfg(unix)]
#[test]
fn test_interrupt_saves_progress_and_kills_in_flight_tool() {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let cwd = TempDir::new().unwrap();
    let projects = Projects::new();
    projects.with_spec("stuck");
    let config_path = write_tool_config(&cwd, r#"echo $$ > "$1/tool.pid"; exec sleep 77"#, 120);

    let mut child = StdCommand::new(env!("CARGO_BIN_EXE_reqsweep"))
        .args(["--config", config_path.as_str(), "--root", projects.root.as_str()])
        .args(progress_arg(&projects))
        .current_dir(cwd.path())
        .env_remove("PROJECTS_DIR")
        .env_remove("REQSWEEP_TOOL")
        .env_remove("RUST_LOG")
        .env("HOME", cwd.path())
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let pid_file = projects.output_dir("stuck").join("tool.pid");
    let deadline = Instant::now() + Duration::from_secs(20);
    let tool_pid = loop {
        if let Ok(text) = std::fs::read_to_string(&pid_file) {
            if !text.trim().is_empty() {
                break text.trim().to_string();
            }
        }
        assert!(Instant::now() < deadline, "tool never started");
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(test_support::pid_alive(&tool_pid));

    let started = Instant::now();
    kill(Pid::from_raw(i32::try_from(child.id()).unwrap()), Signal::SIGINT).unwrap();
    while child.try_wait().unwrap().is_none() {
        if started.elapsed() > Duration::from_secs(10) {
            let _ = child.kill();
            panic!("reqsweep kept running after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(130));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Gracefully shutting down... Progress has been saved."),
        "stdout was: {stdout}"
    );
    assert!(test_support::wait_gone(&tool_pid), "tool {tool_pid} outlived the run");
    assert!(!ProgressStore::load(projects.progress_file.clone()).is_complete("stuck"));
}
