//! Handlers for each CLI operation

mod dry_run;
mod reset;
mod status;
mod sweep;

pub(super) use dry_run::dry_run;
pub(super) use reset::reset;
pub(super) use status::status;
pub(super) use sweep::sweep;
