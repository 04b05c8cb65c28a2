//! Data models for the Nest API.
//!
//! This module contains the wire types exchanged with the service and the
//! snapshot document the entity views read from.

// Export submodules
pub mod auth;
pub mod device;
pub mod snapshot;
pub mod structure;
