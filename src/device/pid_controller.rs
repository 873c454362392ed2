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
use crate::enums::RotationDirection;
use crate::error::ChannelError;

/// Omega PID controller that drives the rotor through the drive power supply.
pub struct PidController {
    _gateway: LockedCommandGateway,
}

impl PidController {
    pub fn new(gateway: LockedCommandGateway) -> Self {
        Self { _gateway: gateway }
    }

    pub fn name(&self) -> &str {
        self._gateway.name()
    }

    /// Write the direction register.
    ///
    /// # Arguments
    /// * `direction` - Direction.
    pub fn set_direction(&mut self, direction: RotationDirection) -> Result<(), ChannelError> {
        self._gateway
            .execute(&DeviceCommand::write(&format!("DIR {}", direction as u8)))?;

        Ok(())
    }

    /// Read the direction register.
    ///
    /// # Returns
    /// Direction.
    pub fn get_direction(&mut self) -> Result<RotationDirection, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("DIR?"))?;

        reply
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(RotationDirection::from_repr)
            .ok_or_else(|| ChannelError::protocol(self.name(), &reply, "unknown direction"))
    }

    /// Declare the frequency set-point.
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz.
    pub fn declare_frequency(&mut self, frequency: f64) -> Result<(), ChannelError> {
        self._gateway
            .execute(&DeviceCommand::write(&format!("SETPOINT {frequency:.3}")))?;

        Ok(())
    }

    /// Load the gains to track the frequency set-point.
    ///
    /// # Arguments
    /// * `gain` - Gains of (P, I, D).
    pub fn tune_frequency(&mut self, gain: &[f64; 3]) -> Result<(), ChannelError> {
        self.tune("FREQ", gain)
    }

    /// Load the gains to brake the rotor.
    ///
    /// # Arguments
    /// * `gain` - Gains of (P, I, D).
    pub fn tune_stop(&mut self, gain: &[f64; 3]) -> Result<(), ChannelError> {
        self.tune("STOP", gain)
    }

    fn tune(&mut self, target: &str, gain: &[f64; 3]) -> Result<(), ChannelError> {
        self._gateway.execute(&DeviceCommand::write(&format!(
            "TUNE {target} {} {} {}",
            gain[0], gain[1], gain[2]
        )))?;

        Ok(())
    }

    /// Read the rotation frequency.
    ///
    /// # Returns
    /// Frequency in Hz.
    pub fn get_frequency(&mut self) -> Result<f64, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("FREQ?"))?;

        parse_float(self.name(), &reply)
    }
}
