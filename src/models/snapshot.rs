//! The account snapshot returned by the status endpoint.
//!
//! The snapshot groups records by category and, within a category, by
//! entity identifier. Records are kept as raw JSON objects since their shape
//! varies between device generations and firmware versions.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::registry::EntityKind;
use crate::{NestError, NestResult};

/// A single entity record: field name to raw JSON value.
pub type Record = Map<String, Value>;

/// All records of one category, keyed by entity identifier.
pub type Records = HashMap<String, Record>;

/// Top-level grouping of records within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Device,
    Shared,
    User,
    UserSettings,
    Link,
    Structure,
}

impl Category {
    /// The key of this category in the snapshot document.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Device => "device",
            Category::Shared => "shared",
            Category::User => "user",
            Category::UserSettings => "user_settings",
            Category::Link => "link",
            Category::Structure => "structure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full account state as of the last refresh.
///
/// Missing categories deserialize as empty and unknown top-level keys are
/// ignored. A snapshot is never mutated after it has been installed on a
/// connection; a refresh replaces it as a whole.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    device: Records,
    #[serde(default)]
    shared: Records,
    #[serde(default)]
    user: Records,
    #[serde(default)]
    user_settings: Records,
    #[serde(default)]
    link: Records,
    #[serde(default)]
    structure: Records,
    #[serde(skip)]
    generation: u64,
}

impl Snapshot {
    /// Counter incremented every time a connection installs a new snapshot.
    /// Zero means no snapshot has been fetched yet.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// All records of a category.
    pub fn records(&self, category: Category) -> &Records {
        match category {
            Category::Device => &self.device,
            Category::Shared => &self.shared,
            Category::User => &self.user,
            Category::UserSettings => &self.user_settings,
            Category::Link => &self.link,
            Category::Structure => &self.structure,
        }
    }

    /// The record for `id` within `category`, if present.
    pub fn record(&self, category: Category, id: &str) -> Option<&Record> {
        self.records(category).get(id)
    }

    /// Identifiers present in a category, in sorted order.
    pub fn ids(&self, category: Category) -> Vec<String> {
        let mut ids: Vec<String> = self.records(category).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Reads `field` for entity `id`, trying each category in order.
    ///
    /// Fails with `EntityNotFound` if no category holds a record for `id`
    /// and with `AttributeNotFound` if records exist but none has `field`.
    pub(crate) fn read_through(
        &self,
        kind: EntityKind,
        id: &str,
        categories: &[Category],
        field: &str,
    ) -> NestResult<Value> {
        let mut found_record = false;
        for &category in categories {
            if let Some(record) = self.record(category, id) {
                found_record = true;
                if let Some(value) = record.get(field) {
                    return Ok(value.clone());
                }
            }
        }

        if found_record {
            Err(NestError::AttributeNotFound {
                kind,
                id: id.to_string(),
                field: field.to_string(),
            })
        } else {
            Err(NestError::EntityNotFound {
                kind,
                id: id.to_string(),
            })
        }
    }

    /// The structure identifier a device is linked to, as stored on the wire
    /// (usually with a `structure.` prefix).
    pub(crate) fn linked_structure(&self, device_id: &str) -> NestResult<String> {
        let value = self
            .record(Category::Link, device_id)
            .and_then(|link| link.get("structure"))
            .ok_or_else(|| NestError::AttributeNotFound {
                kind: EntityKind::Device,
                id: device_id.to_string(),
                field: "structure".to_string(),
            })?;

        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NestError::InvalidAttribute {
                kind: EntityKind::Device,
                id: device_id.to_string(),
                field: "structure".to_string(),
                reason: format!("expected a string, got {value}"),
            })
    }
}
