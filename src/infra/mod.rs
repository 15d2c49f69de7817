//! Infrastructure adapters: Linode API, record file, network, clock, shell.

pub mod clock;
pub mod linode;
pub mod probe;
pub mod shell;
pub mod store;
pub mod token;
