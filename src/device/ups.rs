// This file is part of ts_chwp_controller.
//
// Developed for the Vera Rubin Observatory Systems.
// This product includes software developed by the LSST Project
// (https://www.lsst.org).
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::channel::device_channel::DeviceCommand;
use crate::channel::gateway::LockedCommandGateway;
use crate::device::reply::parse_float;
use crate::error::ChannelError;

// SNMP object identifiers of the APC UPS.
pub const OID_BATTERY_CAPACITY: &str = "1.3.6.1.4.1.318.1.1.1.2.2.1.0";
pub const OID_INPUT_VOLTAGE: &str = "1.3.6.1.4.1.318.1.1.1.3.2.1.0";
pub const OID_INPUT_FREQUENCY: &str = "1.3.6.1.4.1.318.1.1.1.3.2.4.0";
pub const OID_OUTPUT_STATUS: &str = "1.3.6.1.4.1.318.1.1.1.4.1.1.0";
pub const OID_OUTPUT_VOLTAGE: &str = "1.3.6.1.4.1.318.1.1.1.4.2.1.0";
pub const OID_OUTPUT_FREQUENCY: &str = "1.3.6.1.4.1.318.1.1.1.4.2.2.0";
pub const OID_OUTPUT_LOAD: &str = "1.3.6.1.4.1.318.1.1.1.4.2.3.0";

// Fields reported by the status, in order.
const STATUS_FIELDS: [(&str, &str); 7] = [
    ("battery_capacity", OID_BATTERY_CAPACITY),
    ("input_voltage", OID_INPUT_VOLTAGE),
    ("input_frequency", OID_INPUT_FREQUENCY),
    ("output_status", OID_OUTPUT_STATUS),
    ("output_voltage", OID_OUTPUT_VOLTAGE),
    ("output_frequency", OID_OUTPUT_FREQUENCY),
    ("output_load", OID_OUTPUT_LOAD),
];

/// Backup power supply. Each field is one query.
pub struct Ups {
    _gateway: LockedCommandGateway,
}

impl Ups {
    pub fn new(gateway: LockedCommandGateway) -> Self {
        Self { _gateway: gateway }
    }

    /// Read one field.
    ///
    /// # Arguments
    /// * `oid` - Object identifier of the field.
    ///
    /// # Returns
    /// Value of the field.
    pub fn get(&mut self, oid: &str) -> Result<f64, ChannelError> {
        let reply = self
            ._gateway
            .execute(&DeviceCommand::query(&format!("GET {oid}")))?;

        parse_float(self._gateway.name(), &reply)
    }

    /// Read the battery capacity.
    ///
    /// # Returns
    /// Capacity in percent.
    pub fn get_battery_capacity(&mut self) -> Result<f64, ChannelError> {
        self.get(OID_BATTERY_CAPACITY)
    }

    /// Read all the fields.
    ///
    /// # Returns
    /// Values by field name.
    pub fn get_status(&mut self) -> Result<Vec<(&'static str, f64)>, ChannelError> {
        STATUS_FIELDS
            .iter()
            .map(|(name, oid)| Ok((*name, self.get(oid)?)))
            .collect()
    }
}
