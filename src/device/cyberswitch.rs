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
use crate::constants::NUM_CYBERSWITCH_PORT;
use crate::enums::PowerStatus;
use crate::error::{ChannelError, ControlError};

/// Network power switch of the CHWP electronics. The ports are 1-based.
pub struct Cyberswitch {
    _gateway: LockedCommandGateway,
}

impl Cyberswitch {
    pub fn new(gateway: LockedCommandGateway) -> Self {
        Self { _gateway: gateway }
    }

    pub fn name(&self) -> &str {
        self._gateway.name()
    }

    /// Switch all the ports.
    ///
    /// # Arguments
    /// * `status` - Power status.
    pub fn set_all(&mut self, status: PowerStatus) -> Result<(), ChannelError> {
        let command = match status {
            PowerStatus::On => "ALL ON",
            PowerStatus::Off => "ALL OFF",
        };
        self._gateway.execute(&DeviceCommand::write(command))?;

        Ok(())
    }

    fn check_port(port: usize) -> Result<(), ControlError> {
        if (1..=NUM_CYBERSWITCH_PORT).contains(&port) {
            Ok(())
        } else {
            Err(ControlError::InvalidArgument(format!(
                "port should be in [1, {NUM_CYBERSWITCH_PORT}] instead of {port}"
            )))
        }
    }

    /// Switch a port.
    ///
    /// # Arguments
    /// * `port` - Port (1-based).
    /// * `status` - Power status.
    pub fn set_port(&mut self, port: usize, status: PowerStatus) -> Result<(), ControlError> {
        Self::check_port(port)?;

        let action = match status {
            PowerStatus::On => "ON",
            PowerStatus::Off => "OFF",
        };
        self._gateway
            .execute(&DeviceCommand::write(&format!("{action} {port}")))?;

        Ok(())
    }

    /// Power-cycle a port.
    ///
    /// # Arguments
    /// * `port` - Port (1-based).
    pub fn reboot_port(&mut self, port: usize) -> Result<(), ControlError> {
        Self::check_port(port)?;

        self._gateway
            .execute(&DeviceCommand::write(&format!("REBOOT {port}")))?;

        Ok(())
    }

    /// Get the status of all the ports.
    ///
    /// # Returns
    /// Power status of each port.
    pub fn get_status(&mut self) -> Result<Vec<PowerStatus>, ChannelError> {
        let reply = self._gateway.execute(&DeviceCommand::query("STATUS?"))?;
        let reply = reply.trim();

        if reply.len() != NUM_CYBERSWITCH_PORT {
            return Err(ChannelError::protocol(
                self.name(),
                reply,
                "wrong number of ports",
            ));
        }

        reply
            .chars()
            .map(|item| match item {
                '1' => Ok(PowerStatus::On),
                '0' => Ok(PowerStatus::Off),
                _ => Err(ChannelError::protocol(self.name(), reply, "not a port status")),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    use crate::channel::gateway::create_gateway;
    use crate::config::get_test_config;
    use crate::enums::ChannelId;
    use crate::mock::mock_plant::MockPlant;

    #[test]
    fn test_cyberswitch() {
        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());
        let plant = Arc::new(Mutex::new(MockPlant::new()));

        let mut cyberswitch =
            Cyberswitch::new(create_gateway(&config, ChannelId::Cyberswitch, Some(&plant)));

        cyberswitch.set_all(PowerStatus::Off).unwrap();
        cyberswitch.set_port(3, PowerStatus::On).unwrap();
        cyberswitch.reboot_port(5).unwrap();

        assert_eq!(
            cyberswitch.get_status().unwrap(),
            vec![
                PowerStatus::Off,
                PowerStatus::Off,
                PowerStatus::On,
                PowerStatus::Off,
                PowerStatus::On
            ]
        );
    }

    #[test]
    fn test_invalid_port() {
        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());
        let plant = Arc::new(Mutex::new(MockPlant::new()));

        let mut cyberswitch =
            Cyberswitch::new(create_gateway(&config, ChannelId::Cyberswitch, Some(&plant)));

        assert!(matches!(
            cyberswitch.set_port(0, PowerStatus::On),
            Err(ControlError::InvalidArgument(_))
        ));
        assert!(cyberswitch.reboot_port(6).is_err());

        assert!(plant.lock().unwrap().commands.is_empty());
    }
}
