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

use crate::enums::RotationMode;

#[derive(Clone)]
pub struct MockPowerSupply {
    // Output is enabled or not.
    pub is_output_on: bool,
    // Mode selected by the front panel command.
    pub mode: RotationMode,
    // Voltage set-point in volt.
    pub voltage_setpoint: f64,
    // Load resistance in ohm.
    _resistance: f64,
}

impl MockPowerSupply {
    /// Mock power supply to simulate the Kikusui power supply.
    ///
    /// # Arguments
    /// * `resistance` - Load resistance in ohm.
    /// * `voltage` - Initial voltage set-point in volt.
    ///
    /// # Returns
    /// A new mock power supply.
    pub fn new(resistance: f64, voltage: f64) -> Self {
        Self {
            is_output_on: false,
            mode: RotationMode::Voltage,
            voltage_setpoint: voltage,
            _resistance: resistance,
        }
    }

    /// Get the voltage and current values.
    ///
    /// # Returns
    /// A tuple containing the voltage in volt and current in ampere.
    pub fn get_voltage_and_current(&self) -> (f64, f64) {
        if !self.is_output_on {
            return (0.0, 0.0);
        }

        let voltage = self.voltage_setpoint;
        (voltage, voltage / self._resistance)
    }

    /// Reply to a command.
    ///
    /// # Arguments
    /// * `command` - Command.
    ///
    /// # Returns
    /// Reply, or None if the command is unknown.
    pub fn reply(&mut self, command: &str) -> Option<String> {
        match command {
            "U" => self.mode = RotationMode::Pid,
            "I" => self.mode = RotationMode::Voltage,
            "ON" => self.is_output_on = true,
            "OFF" => self.is_output_on = false,
            "O?" => return Some(String::from(if self.is_output_on { "1" } else { "0" })),
            "VC?" => {
                let (voltage, current) = self.get_voltage_and_current();
                return Some(format!("{voltage:.3},{current:.3}"));
            }
            _ => {
                let voltage = command.strip_prefix("V ")?.trim().parse::<f64>().ok()?;
                self.voltage_setpoint = voltage;
            }
        }

        Some(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_voltage_and_current() {
        let mut power_supply = MockPowerSupply::new(8.0, 16.0);

        assert_eq!(power_supply.get_voltage_and_current(), (0.0, 0.0));

        power_supply.is_output_on = true;
        assert_eq!(power_supply.get_voltage_and_current(), (16.0, 2.0));
    }

    #[test]
    fn test_reply() {
        let mut power_supply = MockPowerSupply::new(8.0, 0.0);

        assert_eq!(power_supply.reply("U").unwrap(), "");
        assert_eq!(power_supply.mode, RotationMode::Pid);

        power_supply.reply("V 24").unwrap();
        power_supply.reply("ON").unwrap();
        assert_eq!(power_supply.reply("O?").unwrap(), "1");
        assert_eq!(power_supply.reply("VC?").unwrap(), "24.000,3.000");

        assert!(power_supply.reply("V abc").is_none());
        assert!(power_supply.reply("HELLO").is_none());
    }
}
