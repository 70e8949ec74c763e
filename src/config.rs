//! Run configuration
//!
//! Resolved once at startup with precedence CLI flags > environment >
//! config file > built-in defaults. The config file is
//! `.reqsweep/config.toml`, found by searching upward from the working
//! directory, or given explicitly with `--config`.

use crate::discovery::UnitOfWork;
use crate::error::ConfigError;
use crate::progress::DEFAULT_PROGRESS_FILE;
use camino::{Utf8Path, Utf8PathBuf};
use reqsweep_runner::{BufferConfig, CommandSpec};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Replaced in tool arguments with the unit's output directory.
pub const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

pub const PROJECTS_DIR_ENV: &str = "PROJECTS_DIR";
pub const TOOL_ENV: &str = "REQSWEEP_TOOL";

const CONFIG_DIR: &str = ".reqsweep";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_ROOT_UNDER_HOME: &str = "ai/projects/projecthubv3/projects";
const DEFAULT_TOOL: &str = "claude";
const DEFAULT_TOOL_ARGS: &[&str] = &[
    "--allowedTools",
    "Read,Write",
    "--add-dir",
    OUTPUT_DIR_PLACEHOLDER,
    "--dangerously-skip-permissions",
    "-p",
];

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile(Utf8PathBuf),
    Environment(&'static str),
    Cli,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::ConfigFile(path) => write!(f, "config {path}"),
            Self::Environment(var) => write!(f, "env {var}"),
            Self::Cli => f.write_str("cli"),
        }
    }
}

/// External tool program and argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL.to_string(),
            args: DEFAULT_TOOL_ARGS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ToolConfig {
    /// Invocation for one unit: cwd is the unit directory and
    /// [`OUTPUT_DIR_PLACEHOLDER`] expands to its output directory.
    #[must_use]
    pub fn command_for(&self, unit: &UnitOfWork) -> CommandSpec {
        let output_dir = unit.output_dir();
        CommandSpec::new(&self.program)
            .args(
                self.args
                    .iter()
                    .map(|arg| arg.replace(OUTPUT_DIR_PLACEHOLDER, output_dir.as_str())),
            )
            .cwd(unit.dir.as_std_path())
    }

    /// Locate the program on `PATH` (or check it directly if it is a path).
    #[must_use]
    pub fn resolve(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }
}

/// Overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub root_dir: Option<Utf8PathBuf>,
    pub workers: Option<usize>,
    pub min_words: Option<usize>,
    pub accept_min_words: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub delay_ms: Option<u64>,
    pub progress_file: Option<Utf8PathBuf>,
    pub tool: Option<String>,
    pub prompt_file: Option<Utf8PathBuf>,
}

/// The environment variables configuration reads, captured up front so
/// tests never touch process-global state.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub projects_dir: Option<String>,
    pub tool: Option<String>,
    pub home_dir: Option<PathBuf>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        let non_empty = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        Self {
            projects_dir: non_empty(PROJECTS_DIR_ENV),
            tool: non_empty(TOOL_ENV),
            home_dir: dirs::home_dir(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    run: RunSection,
    #[serde(default)]
    tool: ToolSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    root_dir: Option<String>,
    workers: Option<usize>,
    min_words: Option<usize>,
    accept_min_words: Option<usize>,
    unit_timeout_secs: Option<u64>,
    kill_grace_secs: Option<u64>,
    inter_unit_delay_ms: Option<u64>,
    status_interval_secs: Option<u64>,
    progress_file: Option<String>,
    prompt_file: Option<String>,
    stdout_cap_bytes: Option<usize>,
    stderr_cap_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolSection {
    program: Option<String>,
    args: Option<Vec<String>>,
}

/// Fully resolved, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: Utf8PathBuf,
    pub workers: usize,
    /// Existing output at or above this is skipped
    pub min_words: usize,
    /// Fresh output at or above this is a success
    pub accept_min_words: usize,
    pub unit_timeout_secs: u64,
    pub kill_grace_secs: u64,
    pub inter_unit_delay_ms: u64,
    pub status_interval_secs: u64,
    pub progress_file: Utf8PathBuf,
    pub tool: ToolConfig,
    pub prompt_file: Option<Utf8PathBuf>,
    pub stdout_cap_bytes: usize,
    pub stderr_cap_bytes: usize,
    /// Config file that was applied, if any
    pub config_file: Option<Utf8PathBuf>,
    pub source_attribution: BTreeMap<&'static str, ConfigSource>,
}

macro_rules! apply {
    ($config:ident, $field:ident, $value:expr, $source:expr) => {
        if let Some(value) = $value {
            $config.$field = value;
            $config
                .source_attribution
                .insert(stringify!($field), $source.clone());
        }
    };
}

impl Config {
    /// Built-in defaults; `None` root when no home directory is known.
    fn defaults(home_dir: Option<&PathBuf>) -> Self {
        let root_dir = home_dir
            .and_then(|home| Utf8PathBuf::from_path_buf(home.clone()).ok())
            .map(|home| home.join(DEFAULT_ROOT_UNDER_HOME))
            .unwrap_or_default();
        let buffers = BufferConfig::default();
        Self {
            root_dir,
            workers: 5,
            min_words: 2500,
            accept_min_words: 2000,
            unit_timeout_secs: 180,
            kill_grace_secs: 5,
            inter_unit_delay_ms: 500,
            status_interval_secs: 3,
            progress_file: Utf8PathBuf::from(DEFAULT_PROGRESS_FILE),
            tool: ToolConfig::default(),
            prompt_file: None,
            stdout_cap_bytes: buffers.stdout_cap,
            stderr_cap_bytes: buffers.stderr_cap,
            config_file: None,
            source_attribution: BTreeMap::new(),
        }
    }

    /// Resolve configuration from the current directory and process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable config files or invalid values.
    pub fn discover(cli: &CliArgs) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::InvalidValue {
            key: "cwd".to_string(),
            reason: e.to_string(),
        })?;
        Self::discover_from(&cwd, cli, &EnvSnapshot::capture())
    }

    /// Path-driven variant of [`Config::discover`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable config files or invalid values.
    pub fn discover_from(
        start_dir: &std::path::Path,
        cli: &CliArgs,
        env: &EnvSnapshot,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::defaults(env.home_dir.as_ref());

        let config_path = match &cli.config_path {
            Some(path) => Some(path.clone()),
            None => discover_config_file_from(start_dir),
        };
        if let Some(path) = &config_path {
            let file = load_config_file(path)?;
            config.apply_file(file, &ConfigSource::ConfigFile(path.clone()));
            config.config_file = Some(path.clone());
        }

        apply!(
            config,
            root_dir,
            env.projects_dir.as_deref().map(Utf8PathBuf::from),
            ConfigSource::Environment(PROJECTS_DIR_ENV)
        );
        if let Some(program) = &env.tool {
            config.tool.program.clone_from(program);
            config
                .source_attribution
                .insert("tool", ConfigSource::Environment(TOOL_ENV));
        }

        config.apply_cli(cli);
        config.validate()?;
        config.anchor_root(start_dir)?;
        debug!(config_file = ?config.config_file, "configuration resolved");
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig, source: &ConfigSource) {
        let run = file.run;
        apply!(self, root_dir, run.root_dir.map(Utf8PathBuf::from), source);
        apply!(self, workers, run.workers, source);
        apply!(self, min_words, run.min_words, source);
        apply!(self, accept_min_words, run.accept_min_words, source);
        apply!(self, unit_timeout_secs, run.unit_timeout_secs, source);
        apply!(self, kill_grace_secs, run.kill_grace_secs, source);
        apply!(self, inter_unit_delay_ms, run.inter_unit_delay_ms, source);
        apply!(self, status_interval_secs, run.status_interval_secs, source);
        apply!(self, progress_file, run.progress_file.map(Utf8PathBuf::from), source);
        apply!(self, prompt_file, run.prompt_file.map(|p| Some(Utf8PathBuf::from(p))), source);
        apply!(self, stdout_cap_bytes, run.stdout_cap_bytes, source);
        apply!(self, stderr_cap_bytes, run.stderr_cap_bytes, source);

        if let Some(program) = file.tool.program {
            self.tool.program = program;
            self.source_attribution.insert("tool", source.clone());
        }
        if let Some(args) = file.tool.args {
            self.tool.args = args;
            self.source_attribution.insert("tool_args", source.clone());
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let source = ConfigSource::Cli;
        apply!(self, root_dir, cli.root_dir.clone(), source);
        apply!(self, workers, cli.workers, source);
        apply!(self, min_words, cli.min_words, source);
        apply!(self, accept_min_words, cli.accept_min_words, source);
        apply!(self, unit_timeout_secs, cli.timeout_secs, source);
        apply!(self, inter_unit_delay_ms, cli.delay_ms, source);
        apply!(self, progress_file, cli.progress_file.clone(), source);
        apply!(self, prompt_file, cli.prompt_file.clone().map(Some), source);
        if let Some(program) = &cli.tool {
            self.tool.program.clone_from(program);
            self.source_attribution.insert("tool", source);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.workers == 0 {
            return invalid("workers", "must be at least 1");
        }
        if self.unit_timeout_secs == 0 {
            return invalid("unit_timeout_secs", "must be greater than 0");
        }
        if self.status_interval_secs == 0 {
            return invalid("status_interval_secs", "must be greater than 0");
        }
        if self.tool.program.trim().is_empty() {
            return invalid("tool", "program must not be empty");
        }
        if self.progress_file.as_str().is_empty() {
            return invalid("progress_file", "must not be empty");
        }
        Ok(())
    }

    /// Resolve a relative root against `start_dir`. The root becomes part of
    /// tool arguments that run with the unit directory as cwd.
    fn anchor_root(&mut self, start_dir: &std::path::Path) -> Result<(), ConfigError> {
        if self.root_dir.as_str().is_empty() || self.root_dir.is_absolute() {
            return Ok(());
        }
        let base = Utf8Path::from_path(start_dir).ok_or_else(|| ConfigError::InvalidValue {
            key: "root_dir".to_string(),
            reason: format!("working directory {} is not valid UTF-8", start_dir.display()),
        })?;
        self.root_dir = base.join(&self.root_dir);
        Ok(())
    }

    /// The projects root, required only by operations that scan it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoRoot`] when neither a home directory, `PROJECTS_DIR`
    /// nor `--root` supplied one.
    pub fn projects_root(&self) -> Result<&Utf8Path, ConfigError> {
        if self.root_dir.as_str().is_empty() {
            return Err(ConfigError::NoRoot);
        }
        Ok(&self.root_dir)
    }

    #[must_use]
    pub const fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    #[must_use]
    pub const fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }

    #[must_use]
    pub const fn inter_unit_delay(&self) -> Duration {
        Duration::from_millis(self.inter_unit_delay_ms)
    }

    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    #[must_use]
    pub const fn buffers(&self) -> BufferConfig {
        BufferConfig {
            stdout_cap: self.stdout_cap_bytes,
            stderr_cap: self.stderr_cap_bytes,
        }
    }

    /// Source label for a key, `default` when never overridden.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }

    /// Effective values with their sources, for `--dry-run` output.
    #[must_use]
    pub fn effective_config(&self) -> Vec<(&'static str, String, ConfigSource)> {
        let entry = |key: &'static str, value: String| (key, value, self.source_of(key));
        vec![
            entry("root_dir", self.root_dir.to_string()),
            entry("workers", self.workers.to_string()),
            entry("min_words", self.min_words.to_string()),
            entry("accept_min_words", self.accept_min_words.to_string()),
            entry("unit_timeout_secs", self.unit_timeout_secs.to_string()),
            entry("kill_grace_secs", self.kill_grace_secs.to_string()),
            entry("inter_unit_delay_ms", self.inter_unit_delay_ms.to_string()),
            entry("progress_file", self.progress_file.to_string()),
            entry("tool", self.tool.program.clone()),
            entry("tool_args", self.tool.args.join(" ")),
            entry(
                "prompt_file",
                self.prompt_file
                    .as_ref()
                    .map_or_else(|| "(built-in)".to_string(), ToString::to_string),
            ),
        ]
    }
}

/// Walk upward from `start_dir` looking for `.reqsweep/config.toml`,
/// stopping at a repository root or the filesystem root.
#[must_use]
pub fn discover_config_file_from(start_dir: &std::path::Path) -> Option<Utf8PathBuf> {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Utf8PathBuf::from_path_buf(candidate).ok();
        }
        if [".git", ".hg", ".svn"].iter().any(|m| dir.join(m).exists()) {
            break;
        }
        current = dir.parent();
    }
    None
}

fn load_config_file(path: &Utf8Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
