//! Subprocess supervision for the external generation tool
//!
//! One [`ToolRunner::run`] call owns one child process from spawn to reap:
//! the instruction payload is streamed to its stdin, stdout and stderr are
//! captured into bounded [`RingBuffer`]s, and a single-shot timer escalates
//! SIGTERM to SIGKILL on the child's whole process group.
//!
//! All process execution goes through [`CommandSpec`], so arguments are
//! passed argv-style and never interpreted by a shell.

pub mod command_spec;
pub mod error;
pub mod process;
pub mod ring_buffer;
mod terminate;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use process::{BufferConfig, RunResult, ToolInvoker, ToolRunner, DEFAULT_KILL_GRACE};
pub use ring_buffer::RingBuffer;
