//! sagal-cli library root.
//!
//! Exposes config, AWS wiring, and command handling so integration tests can
//! exercise them without spawning the binary.

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
