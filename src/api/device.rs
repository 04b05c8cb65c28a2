use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::EntityView;
use crate::client::ConnectionInner;
use crate::models::device::{FanModeRequest, TemperatureChangeRequest};
use crate::models::snapshot::{Category, Record};
use crate::registry::EntityKind;
use crate::{FanMode, NestError, NestResult, Structure, TemperatureTarget};

/// A thermostat.
///
/// Fields are read from the device's `device` record and, when absent
/// there, from its `shared` record. Obtain instances through
/// [`Connection::devices`](crate::Connection::devices) or
/// [`Connection::device`](crate::Connection::device).
#[derive(Debug)]
pub struct Device {
    connection: Weak<ConnectionInner>,
    device_id: String,
    fan_mode: Mutex<Option<FanMode>>,
}

impl EntityView for Device {
    const KIND: EntityKind = EntityKind::Device;

    fn id(&self) -> &str {
        &self.device_id
    }

    fn handle(&self) -> &Weak<ConnectionInner> {
        &self.connection
    }

    fn read(&self, field: &str) -> NestResult<Value> {
        self.connection()?.snapshot().read_through(
            Self::KIND,
            &self.device_id,
            &[Category::Device, Category::Shared],
            field,
        )
    }
}

impl Device {
    pub(crate) fn new(connection: Weak<ConnectionInner>, device_id: String) -> Self {
        Self {
            connection,
            device_id,
            fan_mode: Mutex::new(None),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Reads a field, falling back from the `device` record to the `shared`
    /// record.
    ///
    /// # Errors
    ///
    /// Returns `AttributeNotFound` if neither record has the field and
    /// `EntityNotFound` if the snapshot has no record for this device.
    pub fn get(&self, field: &str) -> NestResult<Value> {
        self.read(field)
    }

    /// The raw `device` record.
    pub fn data(&self) -> NestResult<Record> {
        self.connection()?
            .snapshot()
            .record(Category::Device, &self.device_id)
            .cloned()
            .ok_or_else(|| NestError::EntityNotFound {
                kind: Self::KIND,
                id: self.device_id.clone(),
            })
    }

    /// User-assigned name of the thermostat.
    pub fn name(&self) -> NestResult<String> {
        self.read_string("name")
    }

    pub fn serial_number(&self) -> NestResult<String> {
        self.read_string("serial_number")
    }

    /// Measured temperature, in degrees Celsius.
    pub fn current_temperature(&self) -> NestResult<f64> {
        self.read_f64("current_temperature")
    }

    pub fn current_humidity(&self) -> NestResult<f64> {
        self.read_f64("current_humidity")
    }

    pub fn target_temperature(&self) -> NestResult<f64> {
        self.read_f64(TemperatureTarget::Target.field())
    }

    pub fn target_temperature_high(&self) -> NestResult<f64> {
        self.read_f64(TemperatureTarget::High.field())
    }

    pub fn target_temperature_low(&self) -> NestResult<f64> {
        self.read_f64(TemperatureTarget::Low.field())
    }

    /// Current HVAC mode, e.g. `heat`, `cool`, `range` or `off`.
    pub fn target_temperature_type(&self) -> NestResult<String> {
        self.read_string("target_temperature_type")
    }

    /// Display scale, `C` or `F`.
    pub fn temperature_scale(&self) -> NestResult<String> {
        self.read_string("temperature_scale")
    }

    /// The structure this device is linked to.
    pub fn structure(&self) -> NestResult<Arc<Structure>> {
        let connection = self.connection()?;
        let structure_id = connection.snapshot().linked_structure(&self.device_id)?;
        Ok(connection.structure(&structure_id))
    }

    /// The fan mode last set through this view.
    ///
    /// The snapshot carries no fan mode, so this is `None` until
    /// [`set_fan_mode`](Self::set_fan_mode) or [`toggle_fan`](Self::toggle_fan)
    /// has been called.
    pub fn fan_mode(&self) -> Option<FanMode> {
        *self.fan_mode.lock()
    }

    /// Records `mode` locally and writes it to the device.
    ///
    /// # Errors
    ///
    /// Returns `RemoteWriteError` if the service answers with a non-success
    /// status. The local value keeps `mode` in that case.
    pub async fn set_fan_mode(&self, mode: FanMode) -> NestResult<()> {
        let connection = self.connection()?;
        *self.fan_mode.lock() = Some(mode);

        connection
            .post_json(
                &format!("/v2/put/device.{}", self.device_id),
                &FanModeRequest { fan_mode: mode },
            )
            .await
    }

    /// Switches the fan between `on` and `auto` and returns the new mode.
    ///
    /// With no mode set yet the fan is switched `on`.
    pub async fn toggle_fan(&self) -> NestResult<FanMode> {
        let mode = self.fan_mode().map_or(FanMode::On, FanMode::toggled);
        self.set_fan_mode(mode).await?;
        Ok(mode)
    }

    /// Moves a setpoint by `delta` degrees and returns the requested value.
    ///
    /// The current setpoint is read from the snapshot. The snapshot is not
    /// updated; refresh the connection to observe the value the device
    /// accepted.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(connection: &nest_client::Connection) -> Result<(), nest_client::NestError> {
    /// use nest_client::TemperatureTarget;
    ///
    /// for device in connection.devices().values() {
    ///     device.change_temperature(-0.5, TemperatureTarget::Target).await?;
    /// }
    /// connection.refresh_status().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn change_temperature(&self, delta: f64, target: TemperatureTarget) -> NestResult<f64> {
        let connection = self.connection()?;
        let value = self.read_f64(target.field())? + delta;

        connection
            .post_json(
                &format!("/v2/put/shared.{}", self.device_id),
                &TemperatureChangeRequest { target, value },
            )
            .await?;

        Ok(value)
    }
}
