//! CLI module for the bgmodel library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
mod frames;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, Cli, CliKernel, CliLogFormat};
