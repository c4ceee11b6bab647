//! # pathium-server
//!
//! Serves a [`pathium::Pathium`] application over TCP with hyper.
//!
//! ```ignore
//! use pathium_server::Server;
//!
//! let server = Server::bind("127.0.0.1:8000".parse()?).await?;
//! server.serve(app).await?;
//! ```
//!
//! The [`adapter`] module holds the hyper-to-transport conversion and can be
//! used on its own from any hyper service. [`demo`] builds the example
//! application run by the `pathium-demo` binary.

pub mod adapter;
pub mod demo;
mod error;
mod server;

pub use adapter::handle;
pub use error::{Result, ServerError};
pub use server::Server;
