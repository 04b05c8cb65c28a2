//! # nest-client
//!
//! A Rust client library for the Nest thermostat cloud API.
//!
//! The service exposes the whole account as one JSON snapshot. This crate
//! fetches that snapshot and presents it as navigable views (users, their
//! settings, devices and structures), and issues the few writes the service
//! accepts: moving a temperature setpoint, switching the fan mode and
//! toggling a structure's away status.
//!
//! ## Features
//!
//! - 🔐 Login with session headers handled for you
//! - 🏠 Stable views: the same id always yields the same `Arc`
//! - 🌡️ Setpoint, fan and away writes
//! - 🛡️ Every failure surfaces as a typed [`NestError`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use nest_client::{Connection, TemperatureTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::builder()
//!         .username("user@example.com")
//!         .password_from_env("NEST_PASSWORD")
//!         .connect()
//!         .await?;
//!
//!     for (id, device) in connection.devices() {
//!         println!("{id}: {} at {:.1}", device.name()?, device.current_temperature()?);
//!         device.change_temperature(0.5, TemperatureTarget::Target).await?;
//!     }
//!
//!     for structure in connection.structures()?.values() {
//!         structure.toggle_away().await?;
//!     }
//!
//!     // Writes are not reflected locally until the next refresh.
//!     connection.refresh_status().await?;
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod error;
pub mod models;
mod registry;

pub use api::device::Device;
pub use api::structure::Structure;
pub use api::user::{User, UserSettings};
pub use client::{Connection, ConnectionBuilder, DEFAULT_AUTH_URL, DEFAULT_USER_AGENT};
pub use error::{NestError, NestResult};
pub use models::device::{FanMode, TemperatureTarget};
pub use models::snapshot::{Category, Record, Snapshot};
pub use registry::EntityKind;
pub use url::ParseError as UrlParseError;
