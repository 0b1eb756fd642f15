//! Random-sample cache for YouTube channel records, served over raw TCP.
//!
//! See `README.md` for the wire protocol and how to run the service. Each
//! module focuses on a concrete responsibility:
//!
//! - [`cache`] holds the current dataset snapshot and swaps it atomically.
//! - [`refresh`] reloads the cache from a [`store::RecordStore`] on a timer.
//! - [`sampler`] draws distinct random records from a snapshot.
//! - [`protocol`] frames the 4-byte request and encodes the protobuf reply.
//! - [`connection`] runs the per-connection request/response state machine.
//! - [`server`] accepts TCP connections and spawns a handler for each.
//! - [`client`] sends a single request and decodes the reply.
//! - [`cli`] parses the command-line interface for server and client modes.
//!
//! Integration tests drive the server through real sockets with an in-memory
//! record store.

pub mod cache;
pub mod cli;
pub mod client;
pub mod connection;
pub mod protocol;
pub mod record;
pub mod refresh;
pub mod sampler;
pub mod server;
pub mod store;
