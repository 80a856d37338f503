//! # Upstream
//!
//! Clients for the managed-channel service the bridge pulls from and
//! publishes to.
//!
//! Two [`contracts::UpstreamClient`] implementations:
//! - [`TcpUpstreamClient`] speaks the length-prefixed wire protocol to a
//!   remote service
//! - [`MemoryUpstreamClient`] runs against an in-process [`MemoryHub`]
//!
//! [`UpstreamServer`] serves the same wire protocol from a `MemoryHub`, so
//! the TCP path can be exercised end to end without a real deployment.

mod memory;
mod server;
mod tcp;
pub mod wire;

pub use memory::{MemoryHub, MemoryUpstreamClient, DEFAULT_RETAINED};
pub use server::UpstreamServer;
pub use tcp::TcpUpstreamClient;
