//! Fan-out delivery of accepted frames over UDP.
//!
//! A [`RecipientRegistry`] fixes the delivery targets at startup and a
//! [`Disseminator`] sends each frame's payload to all of them, treating
//! every recipient independently.

mod registry;
mod sender;

pub use registry::{RecipientRegistry, DEFAULT_RECIPIENT_HOST, DEFAULT_RECIPIENT_PORT};
pub use sender::{Disseminator, DeliveryReport, BIND_ATTEMPTS};
