//! Client for pushr release servers.
//!
//! Mirrors the server's read/write contract. Version ordering and channel
//! resolution come from `pushr-types`, so "latest" computed locally over a
//! release listing agrees with what the server resolves.

pub mod client;
pub mod error;

pub use client::{ClientConfig, PushrClient};
pub use error::{ClientError, ClientResult};

pub use pushr_types::{Asset, Channel, RegistryRelease, Release, Version};
