//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections, one connection per worker
//! - A blocking GET parks only its own worker

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
