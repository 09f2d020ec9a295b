//! monalertd library half: configuration and server assembly, shared by
//! the binary and the integration tests.

pub mod config;
pub mod server;
