//! Subcommands of the `rohcheck` binary

pub mod inspect;
pub mod run;
