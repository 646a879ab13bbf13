//! CLI subcommands

pub mod assert;
pub mod filter;
pub mod run;
pub mod state;
