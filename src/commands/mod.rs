//! Command implementations.

pub mod build;
pub mod edit;
pub mod init;

mod session_ui;
