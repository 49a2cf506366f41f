//! Client SDK for the upstream chat service: REST calls plus the
//! real-time event stream. No IRC-specific concepts live here — this
//! crate only knows about the chat service's own API surface.

pub mod backoff;
pub mod client;
pub mod error;
pub mod model;
pub mod stream;

pub use backoff::Backoff;
pub use client::Client;
pub use error::{Error, Result};
pub use stream::EventStream;
