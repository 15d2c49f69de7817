//! Provisioning workflows.

pub mod session;
pub mod wait;
