//! Shared glue between the `rcopy` and `rcopy-server` binaries: CLI argument
//! parsing, tracing setup, and the concrete `UdpSocket`-backed
//! [`rcopy_proto::channel::DatagramChannel`] implementation.

pub mod cli;
pub mod logging;
pub mod net;
