//! CLI subcommands.

pub mod check;
pub mod common;
pub mod config;
pub mod init;
pub mod serve;
