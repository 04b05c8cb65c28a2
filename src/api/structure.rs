use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::EntityView;
use crate::client::ConnectionInner;
use crate::models::snapshot::Category;
use crate::models::structure::AwayRequest;
use crate::registry::EntityKind;
use crate::{Device, NestError, NestResult};

/// Away status written through this view, tagged with the snapshot it was
/// written against.
#[derive(Debug, Clone, Copy)]
struct LocalAway {
    generation: u64,
    away: bool,
}

/// A home: a group of devices sharing an away status.
///
/// The identifier is kept without its `structure.` prefix.
#[derive(Debug)]
pub struct Structure {
    connection: Weak<ConnectionInner>,
    structure_id: String,
    away: Mutex<Option<LocalAway>>,
}

impl EntityView for Structure {
    const KIND: EntityKind = EntityKind::Structure;

    fn id(&self) -> &str {
        &self.structure_id
    }

    fn handle(&self) -> &Weak<ConnectionInner> {
        &self.connection
    }

    fn read(&self, field: &str) -> NestResult<Value> {
        self.connection()?
            .snapshot()
            .record(Category::Structure, &self.structure_id)
            .and_then(|record| record.get(field))
            .cloned()
            .ok_or_else(|| NestError::AttributeNotFound {
                kind: Self::KIND,
                id: self.structure_id.clone(),
                field: field.to_string(),
            })
    }
}

impl Structure {
    pub(crate) fn new(connection: Weak<ConnectionInner>, structure_id: String) -> Self {
        Self {
            connection,
            structure_id,
            away: Mutex::new(None),
        }
    }

    pub fn structure_id(&self) -> &str {
        &self.structure_id
    }

    /// Devices whose link points at this structure, keyed by device id.
    pub fn devices(&self) -> NestResult<BTreeMap<String, Arc<Device>>> {
        Ok(self
            .connection()?
            .links()?
            .into_iter()
            .filter(|(_, structure)| structure.structure_id == self.structure_id)
            .map(|(device, _)| (device.device_id().to_string(), device))
            .collect())
    }

    /// Whether the structure is in away mode.
    ///
    /// A value written with [`set_away`](Self::set_away) is reported until
    /// the next refresh; after that the `structure` record of the snapshot
    /// is authoritative.
    ///
    /// # Errors
    ///
    /// Returns `AttributeNotFound` if the snapshot has no away status for
    /// this structure and none was written since the last refresh.
    pub fn away(&self) -> NestResult<bool> {
        let generation = self.connection()?.snapshot().generation();
        if let Some(local) = *self.away.lock() {
            if local.generation == generation {
                return Ok(local.away);
            }
        }

        match self.read("away")? {
            Value::Bool(away) => Ok(away),
            other => Err(self.invalid("away", format!("expected a boolean, got {other}"))),
        }
    }

    /// Writes `away` to the structure and records it locally once accepted.
    ///
    /// # Errors
    ///
    /// Returns `RemoteWriteError` if the service answers with a non-success
    /// status. The previously reported value is kept in that case.
    pub async fn set_away(&self, away: bool) -> NestResult<()> {
        let connection = self.connection()?;
        let generation = connection.snapshot().generation();

        connection
            .post_json(
                &format!("/v1/put/structure.{}", self.structure_id),
                &AwayRequest { away },
            )
            .await?;

        *self.away.lock() = Some(LocalAway { generation, away });
        Ok(())
    }

    /// Flips the away status and returns the new value.
    pub async fn toggle_away(&self) -> NestResult<bool> {
        let away = !self.away()?;
        self.set_away(away).await?;
        Ok(away)
    }
}
