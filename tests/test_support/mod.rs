//! Shared fixtures: a projects root in a temp dir and shell-script tools.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use reqsweep::config::ToolConfig;
use reqsweep::discovery::{OUTPUT_DIR, REQUIREMENTS_FILE, SPEC_FILE};
use tempfile::TempDir;

pub struct Projects {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    _state: TempDir,
    pub progress_file: Utf8PathBuf,
}

impl Projects {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let progress_file =
            Utf8PathBuf::from_path_buf(state.path().join(".platform-regeneration-progress.json"))
                .unwrap();
        Self {
            _dir: dir,
            root,
            _state: state,
            progress_file,
        }
    }

    pub fn output_dir(&self, id: &str) -> Utf8PathBuf {
        self.root.join(id).join(OUTPUT_DIR)
    }

    /// Unit with an input spec.
    pub fn with_spec(&self, id: &str) -> &Self {
        std::fs::create_dir_all(self.output_dir(id)).unwrap();
        std::fs::write(
            self.output_dir(id).join(SPEC_FILE),
            "project:\n  name: Demo\n  type: web-app\n",
        )
        .unwrap();
        self
    }

    /// Existing `requirements.md` with exactly `words` words.
    pub fn with_requirements(&self, id: &str, words: usize) -> &Self {
        std::fs::create_dir_all(self.output_dir(id)).unwrap();
        std::fs::write(self.requirements(id), "word ".repeat(words)).unwrap();
        self
    }

    pub fn requirements(&self, id: &str) -> Utf8PathBuf {
        self.output_dir(id).join(REQUIREMENTS_FILE)
    }
}

/// `sh -c <script>` as the generation tool. The script runs in the unit
/// directory with the payload on stdin.
pub fn sh_tool(script: &str) -> ToolConfig {
    ToolConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

/// Script that saves its stdin and writes a requirements file of `words`
/// words whose first line is `# <heading>`.
pub fn writing_script(heading: &str, words: usize) -> String {
    let heading_words = 1 + heading.split_whitespace().count();
    let body = words.saturating_sub(heading_words);
    format!(
        "cat > ai-generated/payload.txt; \
         {{ echo '# {heading}'; i=0; while [ $i -lt {body} ]; do echo word; i=$((i+1)); done; }} \
         > ai-generated/requirements.md"
    )
}

pub fn word_count_of(path: &Utf8Path) -> usize {
    std::fs::read_to_string(path).unwrap().split_whitespace().count()
}

use reqsweep::payload::Payload;
use reqsweep::pool::{PoolSettings, WorkQueue, WorkerContext, run_pool};
use reqsweep::progress::ProgressStore;
use reqsweep_runner::{BufferConfig, ToolRunner};
use std::sync::Arc;
use std::time::Duration;

pub fn settings(workers: usize) -> PoolSettings {
    PoolSettings {
        workers,
        min_words: 2500,
        accept_min_words: 2000,
        unit_timeout: Duration::from_secs(20),
        inter_unit_delay: Duration::ZERO,
    }
}

pub fn context(
    store: &Arc<ProgressStore>,
    tool: ToolConfig,
    settings: PoolSettings,
    kill_grace: Duration,
) -> Arc<WorkerContext> {
    Arc::new(WorkerContext {
        store: Arc::clone(store),
        invoker: Arc::new(ToolRunner::new(BufferConfig::default(), kill_grace)),
        tool,
        payload: Payload::built_in(settings.min_words),
        settings,
    })
}

/// Discover under `projects.root` and drain the queue with real subprocesses.
pub async fn sweep(
    projects: &Projects,
    store: &Arc<ProgressStore>,
    tool: ToolConfig,
    settings: PoolSettings,
) -> usize {
    let units = reqsweep::discover(&projects.root, store).unwrap();
    let ctx = context(store, tool, settings, Duration::from_secs(1));
    run_pool(ctx, Arc::new(WorkQueue::new(units))).await
}

/// Process is running and not a zombie. Orphans may linger unreaped inside
/// containers whose init does not reap.
pub fn pid_alive(pid: &str) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        return stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X');
    }
    std::process::Command::new("kill")
        .args(["-0", pid])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Poll until `pid` is gone, up to five seconds.
pub fn wait_gone(pid: &str) -> bool {
    for _ in 0..50 {
        if !pid_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    false
}
