pub mod atomic_write;
pub mod exit_codes;
pub mod logging;
