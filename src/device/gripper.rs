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

use std::collections::BTreeMap;

use crate::channel::device_channel::DeviceCommand;
use crate::channel::gateway::LockedCommandGateway;
use crate::device::reply::{parse_flag, parse_key_values};
use crate::enums::PowerStatus;
use crate::error::ChannelError;

/// Controller of the three gripper motors. The axes are 1-based.
pub struct Gripper {
    _gateway: LockedCommandGateway,
}

impl Gripper {
    pub fn new(gateway: LockedCommandGateway) -> Self {
        Self { _gateway: gateway }
    }

    pub fn name(&self) -> &str {
        self._gateway.name()
    }

    fn write(&mut self, command: &str) -> Result<(), ChannelError> {
        self._gateway.execute(&DeviceCommand::write(command))?;

        Ok(())
    }

    /// Move all the axes to the home position.
    pub fn home(&mut self) -> Result<(), ChannelError> {
        self.write("HOME")
    }

    /// Turn off the motors.
    pub fn motors_off(&mut self) -> Result<(), ChannelError> {
        self.write("OFF")
    }

    /// Reset the alarm.
    pub fn reset(&mut self) -> Result<(), ChannelError> {
        self.write("RESET")
    }

    /// Get the total alarm state.
    ///
    /// # Returns
    /// True if any axis alarms.
    pub fn get_alarm(&mut self) -> Result<bool, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("ALARM?"))?;

        parse_flag(self.name(), &reply)
    }

    /// Push an axis forward and read the alarm in one session. The alarm is
    /// raised when the axis touches the rotor.
    ///
    /// # Arguments
    /// * `axis` - Axis (1-based).
    /// * `increment` - Increment in mm.
    ///
    /// # Returns
    /// Alarm after the push.
    pub fn push(&mut self, axis: usize, increment: f64) -> Result<bool, ChannelError> {
        let command = DeviceCommand::write(&format!("PUSH {axis} {increment}"));

        self._gateway.with_channel(|channel| {
            channel.execute(&command)?;
            let reply = channel.execute(&DeviceCommand::query("ALARM?"))?;

            parse_flag(channel.name(), &reply)
        })
    }

    /// Move an axis by a relative distance.
    ///
    /// # Arguments
    /// * `axis` - Axis (1-based).
    /// * `delta` - Distance in mm.
    pub fn move_axis(&mut self, axis: usize, delta: f64) -> Result<(), ChannelError> {
        self.write(&format!("MOVE {axis} {delta}"))
    }

    /// Engage or release the brake.
    ///
    /// # Arguments
    /// * `status` - On to engage the brake.
    pub fn set_brake(&mut self, status: PowerStatus) -> Result<(), ChannelError> {
        match status {
            PowerStatus::On => self.write("BRAKE ON"),
            PowerStatus::Off => self.write("BRAKE OFF"),
        }
    }

    /// Get the status.
    ///
    /// # Returns
    /// Status values by name.
    pub fn get_status(&mut self) -> Result<BTreeMap<String, f64>, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("STATUS?"))?;

        parse_key_values(self.name(), &reply)
    }
}
