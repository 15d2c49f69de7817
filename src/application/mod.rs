//! Application layer — provisioning workflows behind port traits.

pub mod ports;
pub mod services;
