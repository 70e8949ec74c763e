//! Exit code constants for the reqsweep CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed (per-unit failures do not change this) |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `DISCOVERY` | Root directory missing or unreadable |
//! | 9 | `LOCK_HELD` | Another run already owns the progress file |
//! | 130 | `INTERRUPTED` | Run interrupted by the operator (SIGINT) |

/// Type-safe process exit code.
///
/// Use the named constants, then [`as_i32()`](Self::as_i32) for
/// `std::process::exit()`.
///
/// ```rust
/// use reqsweep_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(130), ExitCode::INTERRUPTED);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Operation completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// General failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Invalid command-line arguments or configuration values
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Root directory missing or unreadable; no worker was started
    pub const DISCOVERY: ExitCode = ExitCode(3);

    /// Another run holds the progress lock
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// Interrupted by SIGINT; recorded progress is intact
    pub const INTERRUPTED: ExitCode = ExitCode(130);

    /// Numeric value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Wrap a raw value. Prefer the named constants.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
