//! Command line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Command, RunArgs};
pub use commands::{dispatch, exit_code, Context};
