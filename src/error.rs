use http::StatusCode;
use thiserror::Error;

use crate::registry::EntityKind;
use crate::UrlParseError;

/// Error types for the Nest API client.
#[derive(Error, Debug)]
pub enum NestError {
    /// Login was rejected or returned an unusable response.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The operation needs a session and none has been established.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The HTTP request could not be completed (network failure, timeout).
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    /// A mutating call was answered with a non-success status.
    #[error("Remote write to {endpoint} failed with status code: {status}")]
    RemoteWriteError {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    /// The API returned an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// The identifier is not present in the snapshot.
    #[error("{kind} {id} not found in snapshot")]
    EntityNotFound { kind: EntityKind, id: String },

    /// The field is absent from every record consulted for the entity.
    #[error("{kind} {id} has no attribute {field}")]
    AttributeNotFound {
        kind: EntityKind,
        id: String,
        field: String,
    },

    /// The field exists but does not hold the expected kind of value.
    #[error("{kind} {id} attribute {field} is invalid: {reason}")]
    InvalidAttribute {
        kind: EntityKind,
        id: String,
        field: String,
        reason: String,
    },

    /// Error serializing or deserializing JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Error parsing URL.
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] UrlParseError),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    /// The connection owning an entity view has been dropped.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type for Nest API operations.
pub type NestResult<T> = Result<T, NestError>;
