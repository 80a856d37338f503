//! # Contracts
//!
//! Frozen interface contracts shared by every bridge crate: frame and
//! recipient types, the upstream client trait, the configuration surface,
//! and the error taxonomy. Business crates depend on this crate only;
//! reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Record time is seconds since the Unix epoch (`f64`)
//! - Tailed data that carries no timestamp of its own is stamped on ingest

mod channel;
mod config;
mod error;
mod frame;
mod recipient;
mod upstream;

pub use channel::ChannelName;
pub use config::*;
pub use error::*;
pub use frame::*;
pub use recipient::Recipient;
pub use upstream::*;
