//! End-to-end runs behind the CLI subcommands.

pub mod classify;
pub mod script;
pub mod select;
pub mod types;

pub use types::{ClassifyOutcome, SelectionOutcome};
