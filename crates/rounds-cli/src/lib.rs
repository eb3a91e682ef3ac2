//! rounds-cli
//!
//! Configuration and command parsing for the `rounds` terminal tutor. The
//! interactive loop itself lives in the binary.

pub mod commands;
pub mod config;
