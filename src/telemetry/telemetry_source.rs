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

use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

use crate::channel::gateway::create_gateway;
use crate::config::Config;
use crate::device::cyberswitch::Cyberswitch;
use crate::device::gripper::Gripper;
use crate::device::pid_controller::PidController;
use crate::device::power_supply::PowerSupply;
use crate::device::ups::Ups;
use crate::enums::{ChannelId, TelemetryDevice};
use crate::error::ControlError;
use crate::mock::mock_plant::MockPlant;

/// Device group sampled by a telemetry publisher.
pub trait TelemetrySource {
    fn device(&self) -> TelemetryDevice;

    /// Round a value to a specific digit.
    ///
    /// # Arguments
    /// * `value` - The value to be rounded.
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The rounded value.
    fn round(&self, value: f64, digit: i32) -> f64 {
        crate::utility::round(value, digit)
    }

    /// Sample the devices.
    ///
    /// # Arguments
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// Flat record of the values by name.
    fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError>;
}

/// Create the telemetry source of a device group.
///
/// # Arguments
/// * `device` - Device group.
/// * `config` - Configuration.
/// * `plant` - Mock plant in the simulation mode.
///
/// # Returns
/// Telemetry source.
pub fn create_telemetry_source(
    device: TelemetryDevice,
    config: &Config,
    plant: Option<&Arc<Mutex<MockPlant>>>,
) -> Box<dyn TelemetrySource> {
    match device {
        TelemetryDevice::Ups => Box::new(TelemetryUps {
            _ups: Ups::new(create_gateway(config, ChannelId::Ups, plant)),
        }),
        TelemetryDevice::Cyberswitch => Box::new(TelemetryCyberswitch {
            _cyberswitch: Cyberswitch::new(create_gateway(config, ChannelId::Cyberswitch, plant)),
        }),
        TelemetryDevice::Gripper => Box::new(TelemetryGripper {
            _gripper: Gripper::new(create_gateway(config, ChannelId::Gripper, plant)),
        }),
        TelemetryDevice::Pid => Box::new(TelemetryPid {
            _pid: PidController::new(create_gateway(config, ChannelId::Pid, plant)),
        }),
        TelemetryDevice::Pmx => Box::new(TelemetryPmx {
            _power_supplies: [ChannelId::Drive, ChannelId::Bias1, ChannelId::Bias2]
                .iter()
                .map(|id| PowerSupply::new(create_gateway(config, *id, plant)))
                .collect(),
        }),
    }
}

pub struct TelemetryUps {
    _ups: Ups,
}

impl TelemetrySource for TelemetryUps {
    fn device(&self) -> TelemetryDevice {
        TelemetryDevice::Ups
    }

    fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError> {
        let mut record = Map::new();
        for (name, value) in self._ups.get_status()? {
            record.insert(String::from(name), json!(self.round(value, digit)));
        }

        Ok(record)
    }
}

pub struct TelemetryCyberswitch {
    _cyberswitch: Cyberswitch,
}

impl TelemetrySource for TelemetryCyberswitch {
    fn device(&self) -> TelemetryDevice {
        TelemetryDevice::Cyberswitch
    }

    fn sample(&mut self, _digit: i32) -> Result<Map<String, Value>, ControlError> {
        Ok(self
            ._cyberswitch
            .get_status()?
            .iter()
            .enumerate()
            .map(|(idx, status)| (format!("port{}", idx + 1), json!(status.is_on() as u8)))
            .collect())
    }
}

pub struct TelemetryGripper {
    _gripper: Gripper,
}

impl TelemetrySource for TelemetryGripper {
    fn device(&self) -> TelemetryDevice {
        TelemetryDevice::Gripper
    }

    fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError> {
        Ok(self
            ._gripper
            .get_status()?
            .into_iter()
            .map(|(name, value)| (name, json!(self.round(value, digit))))
            .collect())
    }
}

pub struct TelemetryPid {
    _pid: PidController,
}

impl TelemetrySource for TelemetryPid {
    fn device(&self) -> TelemetryDevice {
        TelemetryDevice::Pid
    }

    fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError> {
        let frequency = self._pid.get_frequency()?;
        let direction = self._pid.get_direction()?;

        let mut record = Map::new();
        record.insert(
            String::from("frequency"),
            json!(self.round(frequency, digit)),
        );
        record.insert(String::from("direction"), json!(direction as u8));

        Ok(record)
    }
}

/// Drive and bias power supplies.
pub struct TelemetryPmx {
    _power_supplies: Vec<PowerSupply>,
}

impl TelemetrySource for TelemetryPmx {
    fn device(&self) -> TelemetryDevice {
        TelemetryDevice::Pmx
    }

    fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError> {
        let mut record = Map::new();
        for power_supply in self._power_supplies.iter_mut() {
            let (voltage, current) = power_supply.get_voltage_and_current()?;
            let output = power_supply.get_output()?;

            let name = String::from(power_supply.name());
            record.insert(
                format!("{name}_voltage"),
                json!(crate::utility::round(voltage, digit)),
            );
            record.insert(
                format!("{name}_current"),
                json!(crate::utility::round(current, digit)),
            );
            record.insert(format!("{name}_output"), json!(output.is_on() as u8));
        }

        Ok(record)
    }
}
