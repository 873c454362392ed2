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

use std::io;
use std::sync::{Arc, Mutex};

use crate::channel::device_channel::{DeviceChannel, DeviceCommand};
use crate::enums::ChannelId;
use crate::error::ChannelError;
use crate::mock::mock_plant::MockPlant;

/// Channel to a device of the mock plant.
pub struct MockChannel {
    _id: ChannelId,
    _plant: Arc<Mutex<MockPlant>>,
    _is_open: bool,
}

impl MockChannel {
    /// Create a new mock channel.
    ///
    /// # Arguments
    /// * `id` - Channel ID.
    /// * `plant` - Mock plant shared by all the channels.
    ///
    /// # Returns
    /// A new mock channel.
    pub fn new(id: ChannelId, plant: &Arc<Mutex<MockPlant>>) -> Self {
        Self {
            _id: id,
            _plant: plant.clone(),
            _is_open: false,
        }
    }

    fn connection_error(&self, reason: &str) -> ChannelError {
        ChannelError::Connection {
            channel: String::from(self._id.as_ref()),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, reason.to_string()),
        }
    }
}

impl DeviceChannel for MockChannel {
    fn name(&self) -> &str {
        self._id.as_ref()
    }

    fn open(&mut self) -> Result<(), ChannelError> {
        let is_reachable = match self._plant.lock() {
            Ok(plant) => plant.is_reachable(self._id),
            Err(_) => return Err(self.connection_error("mock plant is poisoned")),
        };

        if !is_reachable {
            return Err(self.connection_error("device is unreachable"));
        }

        self._is_open = true;

        Ok(())
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<String, ChannelError> {
        if !self._is_open {
            return Err(ChannelError::NotOpen {
                channel: String::from(self._id.as_ref()),
            });
        }

        match self._plant.lock() {
            Ok(mut plant) => Ok(plant.reply(self._id, command)),
            Err(_) => Err(self.connection_error("mock plant is poisoned")),
        }
    }

    fn close(&mut self) {
        self._is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute() {
        let plant = Arc::new(Mutex::new(MockPlant::new()));
        let mut channel = MockChannel::new(ChannelId::Drive, &plant);

        assert_eq!(channel.name(), "drive");
        assert!(matches!(
            channel.execute(&DeviceCommand::write("ON")),
            Err(ChannelError::NotOpen { .. })
        ));

        channel.open().unwrap();
        channel.execute(&DeviceCommand::write("ON")).unwrap();
        assert_eq!(channel.execute(&DeviceCommand::query("O?")).unwrap(), "1");
        channel.close();

        assert_eq!(
            plant.lock().unwrap().get_commands(ChannelId::Drive),
            vec!["ON", "O?"]
        );
    }

    #[test]
    fn test_open_unreachable() {
        let plant = Arc::new(Mutex::new(MockPlant::new()));
        plant.lock().unwrap().unreachable.insert(ChannelId::Gripper);

        let mut channel = MockChannel::new(ChannelId::Gripper, &plant);

        assert!(channel.open().unwrap_err().is_connection());
    }
}
