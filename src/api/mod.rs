// Export submodules
pub mod device;
pub mod structure;
pub mod user;

use std::sync::Weak;

use serde_json::Value;

use crate::client::ConnectionInner;
use crate::registry::EntityKind;
use crate::{Connection, NestError, NestResult};

/// Common behavior of the views handed out by a connection.
///
/// A view holds only its identifier and a weak handle to the connection;
/// every read goes to the connection's current snapshot.
pub(crate) trait EntityView {
    const KIND: EntityKind;

    /// The normalized identifier of the entity.
    fn id(&self) -> &str;

    fn handle(&self) -> &Weak<ConnectionInner>;

    /// Reads a field from the records backing this view.
    fn read(&self, field: &str) -> NestResult<Value>;

    /// Get the connection that created this view.
    fn connection(&self) -> NestResult<Connection> {
        self.handle()
            .upgrade()
            .map(Connection::from_inner)
            .ok_or(NestError::ConnectionClosed)
    }

    fn invalid(&self, field: &str, reason: String) -> NestError {
        NestError::InvalidAttribute {
            kind: Self::KIND,
            id: self.id().to_string(),
            field: field.to_string(),
            reason,
        }
    }

    /// Reads a numeric field; numbers sent as strings are accepted.
    fn read_f64(&self, field: &str) -> NestResult<f64> {
        match self.read(field)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| self.invalid(field, format!("{n} is not representable as f64"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid(field, format!("expected a number, got {s:?}"))),
            other => Err(self.invalid(field, format!("expected a number, got {other}"))),
        }
    }

    fn read_string(&self, field: &str) -> NestResult<String> {
        match self.read(field)? {
            Value::String(s) => Ok(s),
            other => Err(self.invalid(field, format!("expected a string, got {other}"))),
        }
    }
}
