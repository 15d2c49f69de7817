//! Domain types — no I/O, no provider, no terminal.

pub mod environment;
pub mod error;
pub mod instance;

pub use environment::EnvironmentRecord;
pub use error::{ConfigError, ProviderError, UserCancellation};
pub use instance::{ImageStatus, InstanceStatus, VmHandle};
