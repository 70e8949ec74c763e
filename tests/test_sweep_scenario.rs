//! End-to-end sweep with a real subprocess tool.
//!
//! Units: A has an input spec and no output; B has an input spec and a
//! 2500-word output; C has an output but no input spec. B is queued and
//! recorded as `skipped` without invoking the tool; C is never eligible.

#![cfg(unix)]

mod test_support;

use reqsweep::classify::EXISTING;
use reqsweep::progress::{ProgressStore, UnitStatus};
use std::collections::BTreeSet;
use std::sync::Arc;
use test_support::{Projects, settings, sh_tool, sweep, word_count_of, writing_script};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_example_scenario() {
    let projects = Projects::new();
    projects.with_spec("A");
    projects.with_spec("B").with_requirements("B", 2500);
    projects.with_requirements("C", 100);

    let store = Arc::new(ProgressStore::load(projects.progress_file.clone()));
    let queued: BTreeSet<String> = reqsweep::discover(&projects.root, &store)
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(queued, BTreeSet::from(["A".to_string(), "B".to_string()]));

    let tool = sh_tool(&writing_script("Web Application requirements", 2100));
    let handled = sweep(&projects, &store, tool, settings(2)).await;
    assert_eq!(handled, 2);

    let stats = store.stats();
    assert_eq!(stats.total_success, 1);
    assert_eq!(stats.total_skipped, 1);
    assert_eq!(stats.total_failed, 0);
    assert_eq!(stats.total_processed, 2);

    let state = ProgressStore::load(projects.progress_file.clone()).snapshot();
    let a = &state.completed_projects["A"];
    assert_eq!(a.status, UnitStatus::Success);
    assert_eq!(a.word_count, 2100);
    assert_eq!(a.detected_platform, "web-app");
    let b = &state.completed_projects["B"];
    assert_eq!(b.status, UnitStatus::Skipped);
    assert_eq!(b.detected_platform, EXISTING);
    assert!(!state.completed_projects.contains_key("C"));

    assert_eq!(word_count_of(&projects.requirements("A")), 2100);
    assert_eq!(word_count_of(&projects.requirements("B")), 2500);
    assert!(!projects.output_dir("B").join("payload.txt").exists());
}

#[tokio::test]
async fn test_payload_reaches_tool_stdin_unchanged() {
    let projects = Projects::new();
    projects.with_spec("alpha");
    projects.with_spec("beta");

    let store = Arc::new(ProgressStore::load(projects.progress_file.clone()));
    sweep(&projects, &store, sh_tool(&writing_script("CLI Tool", 2000)), settings(1)).await;

    let alpha = std::fs::read_to_string(projects.output_dir("alpha").join("payload.txt")).unwrap();
    let beta = std::fs::read_to_string(projects.output_dir("beta").join("payload.txt")).unwrap();
    assert!(alpha.contains("Save to: ai-generated/requirements.md"));
    assert_eq!(alpha, beta);
    assert_eq!(store.stats().platforms_detected.get("cli-tool"), Some(&2));
}

#[tokio::test]
async fn test_tool_failures_are_recorded_and_batch_continues() {
    let projects = Projects::new();
    for id in ["short", "silent", "good"] {
        projects.with_spec(id);
    }

    let script = r#"
        cat > /dev/null
        case "$(basename "$PWD")" in
          short) echo "too few words" > ai-generated/requirements.md ;;
          silent) echo "crashed" >&2; exit 2 ;;
          good) i=0; while [ $i -lt 2000 ]; do echo word; i=$((i+1)); done > ai-generated/requirements.md ;;
        esac
    "#;
    sweep(&projects, &store_for(&projects), sh_tool(script), settings(3)).await;

    let state = ProgressStore::load(projects.progress_file.clone()).snapshot();
    let reason = |id: &str| state.completed_projects[id].reason.map(|r| r.to_string());
    assert_eq!(reason("short").as_deref(), Some("quality-too-low"));
    assert_eq!(reason("silent").as_deref(), Some("no-output-produced"));
    assert_eq!(state.completed_projects["good"].status, UnitStatus::Success);
    assert_eq!(state.completed_projects["good"].detected_platform, "unknown");
    assert_eq!(state.stats.total_failed, 2);
    assert!(state.is_consistent());
}

#[tokio::test]
async fn test_missing_tool_is_a_spawn_failure() {
    let projects = Projects::new();
    projects.with_spec("alpha");
    let tool = reqsweep::ToolConfig {
        program: "reqsweep-no-such-tool".to_string(),
        args: Vec::new(),
    };
    sweep(&projects, &store_for(&projects), tool, settings(1)).await;

    let state = ProgressStore::load(projects.progress_file.clone()).snapshot();
    let record = &state.completed_projects["alpha"];
    assert_eq!(record.status, UnitStatus::Failed);
    assert_eq!(record.reason.map(|r| r.to_string()).as_deref(), Some("spawn-error"));
}

fn store_for(projects: &Projects) -> Arc<ProgressStore> {
    Arc::new(ProgressStore::load(projects.progress_file.clone()))
}
