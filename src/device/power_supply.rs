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
use crate::device::reply::{parse_flag, parse_pair};
use crate::enums::{PowerStatus, RotationMode};
use crate::error::ChannelError;

/// Kikusui power supply of the drive or the bias.
pub struct PowerSupply {
    _gateway: LockedCommandGateway,
}

impl PowerSupply {
    pub fn new(gateway: LockedCommandGateway) -> Self {
        Self { _gateway: gateway }
    }

    pub fn name(&self) -> &str {
        self._gateway.name()
    }

    /// Enable or disable the output.
    ///
    /// # Arguments
    /// * `status` - Output status.
    pub fn set_output(&mut self, status: PowerStatus) -> Result<(), ChannelError> {
        let command = match status {
            PowerStatus::On => "ON",
            PowerStatus::Off => "OFF",
        };
        self._gateway.execute(&DeviceCommand::write(command))?;

        Ok(())
    }

    /// Get the output status.
    ///
    /// # Returns
    /// Output status.
    pub fn get_output(&mut self) -> Result<PowerStatus, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("O?"))?;

        if parse_flag(self.name(), &reply)? {
            Ok(PowerStatus::On)
        } else {
            Ok(PowerStatus::Off)
        }
    }

    /// Set the voltage set-point.
    ///
    /// # Arguments
    /// * `voltage` - Voltage in volt.
    pub fn set_voltage(&mut self, voltage: f64) -> Result<(), ChannelError> {
        self._gateway
            .execute(&DeviceCommand::write(&format!("V {voltage:.3}")))?;

        Ok(())
    }

    /// Get the measured voltage and current.
    ///
    /// # Returns
    /// Voltage in volt and current in ampere.
    pub fn get_voltage_and_current(&mut self) -> Result<(f64, f64), ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("VC?"))?;

        parse_pair(self.name(), &reply)
    }

    /// Select the drive mode. The PID mode hands the output over to the
    /// external control of the PID controller.
    ///
    /// # Arguments
    /// * `mode` - Drive mode.
    pub fn select_mode(&mut self, mode: RotationMode) -> Result<(), ChannelError> {
        let command = match mode {
            RotationMode::Pid => "U",
            RotationMode::Voltage => "I",
        };
        self._gateway.execute(&DeviceCommand::write(command))?;

        Ok(())
    }
}
