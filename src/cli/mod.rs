//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod feedback;
pub mod helpers;
pub mod info;
pub mod init;
pub mod recommend;
pub mod retrain;
