//! Subcommand implementations.

pub mod check;
pub mod inspect;
pub mod pack;
