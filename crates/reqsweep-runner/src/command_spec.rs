use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command as TokioCommand;

/// Specification for one invocation of the external tool.
///
/// Arguments are kept as discrete `OsString` elements and handed to the OS
/// argv-style, so a unit ID or path containing shell metacharacters is never
/// interpreted.
///
/// ```rust
/// use reqsweep_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("claude")
///     .args(["--add-dir", "/projects/demo/ai-generated"])
///     .arg("-p")
///     .cwd("/projects/demo");
///
/// assert_eq!(cmd.program, OsString::from("claude"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements
    pub args: Vec<OsString>,
    /// Working directory; the unit directory for tool runs
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment
    pub env: BTreeMap<OsString, OsString>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Program name for log lines and error messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Human-readable rendering of the command line. Not shell-escaped;
    /// for diagnostics only.
    #[must_use]
    pub fn display(&self) -> String {
        let mut out = self.program_name();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    /// Build a `tokio::process::Command` with program, args, cwd and env
    /// applied. Stdio wiring is left to the caller.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        cmd
    }
}
