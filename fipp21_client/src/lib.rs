//! Internal modules for the FIPP21 command-line client.
//!
//! This library provides command parsing, the interactive shell, and logging
//! setup used by the fipp21_client binary.

pub mod commands;
pub mod logging;
pub mod shell;
