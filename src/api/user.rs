use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use serde_json::Value;

use super::EntityView;
use crate::client::ConnectionInner;
use crate::models::snapshot::Category;
use crate::registry::EntityKind;
use crate::{NestResult, Structure};

/// An account holder, read from the `user` category.
#[derive(Debug)]
pub struct User {
    connection: Weak<ConnectionInner>,
    user_id: String,
}

impl EntityView for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.user_id
    }

    fn handle(&self) -> &Weak<ConnectionInner> {
        &self.connection
    }

    fn read(&self, field: &str) -> NestResult<Value> {
        self.connection()?
            .snapshot()
            .read_through(Self::KIND, &self.user_id, &[Category::User], field)
    }
}

impl User {
    pub(crate) fn new(connection: Weak<ConnectionInner>, user_id: String) -> Self {
        Self { connection, user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reads a field of the user record.
    pub fn get(&self, field: &str) -> NestResult<Value> {
        self.read(field)
    }

    pub fn name(&self) -> NestResult<String> {
        self.read_string("name")
    }

    pub fn email(&self) -> NestResult<String> {
        self.read_string("email")
    }

    /// The user's settings record.
    pub fn settings(&self) -> NestResult<Arc<UserSettings>> {
        Ok(self.connection()?.user_settings(&self.user_id))
    }

    /// Structures the user belongs to, keyed by id without prefix.
    pub fn structures(&self) -> NestResult<BTreeMap<String, Arc<Structure>>> {
        let connection = self.connection()?;
        let Value::Array(ids) = self.read("structures")? else {
            return Err(self.invalid("structures", "expected a list of structure ids".into()));
        };

        ids.iter()
            .map(|id| -> NestResult<(String, Arc<Structure>)> {
                let id = id.as_str().ok_or_else(|| {
                    self.invalid("structures", format!("expected a structure id, got {id}"))
                })?;
                let structure = connection.structure(id);
                Ok((structure.structure_id().to_string(), structure))
            })
            .collect()
    }
}

/// Per-user preferences, read from the `user_settings` category.
#[derive(Debug)]
pub struct UserSettings {
    connection: Weak<ConnectionInner>,
    user_id: String,
}

impl EntityView for UserSettings {
    const KIND: EntityKind = EntityKind::UserSettings;

    fn id(&self) -> &str {
        &self.user_id
    }

    fn handle(&self) -> &Weak<ConnectionInner> {
        &self.connection
    }

    fn read(&self, field: &str) -> NestResult<Value> {
        self.connection()?
            .snapshot()
            .read_through(Self::KIND, &self.user_id, &[Category::UserSettings], field)
    }
}

impl UserSettings {
    pub(crate) fn new(connection: Weak<ConnectionInner>, user_id: String) -> Self {
        Self { connection, user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reads a field of the settings record.
    pub fn get(&self, field: &str) -> NestResult<Value> {
        self.read(field)
    }

    pub fn email(&self) -> NestResult<String> {
        self.read_string("email")
    }

    pub fn temperature_scale(&self) -> NestResult<String> {
        self.read_string("temperature_scale")
    }

    /// The user these settings belong to.
    pub fn user(&self) -> NestResult<Arc<User>> {
        Ok(self.connection()?.user(&self.user_id))
    }
}
