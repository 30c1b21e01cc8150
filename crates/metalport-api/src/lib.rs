// metalport-api: Async Rust client for the Equinix Metal port and virtual network API

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::MetalClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
