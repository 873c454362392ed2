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

use log::info;

use crate::command::command_schema::{get_argument, parse_float_argument, report, Command};
use crate::enums::{PowerStatus, RotationDirection, RotationMode};
use crate::model::Model;

/// Command to switch the bias power supplies.
pub struct CommandRotationBias;
impl Command for CommandRotationBias {
    fn name(&self) -> &str {
        "rotation_bias"
    }

    fn help(&self) -> &str {
        "on|off"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let status = report(PowerStatus::parse(get_argument(arguments, 0, "status")?))?;

        report(model.rotation.set_bias(status))
    }
}

/// Command to set the direction of the rotation.
pub struct CommandRotationDirection;
impl Command for CommandRotationDirection {
    fn name(&self) -> &str {
        "rotation_direction"
    }

    fn help(&self) -> &str {
        "forward|reverse"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let direction = report(RotationDirection::parse(get_argument(
            arguments,
            0,
            "direction",
        )?))?;

        report(model.rotation.set_direction(direction))
    }
}

/// Command to set the drive mode.
pub struct CommandRotationMode;
impl Command for CommandRotationMode {
    fn name(&self) -> &str {
        "rotation_mode"
    }

    fn help(&self) -> &str {
        "pid|voltage"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let mode = report(RotationMode::parse(get_argument(arguments, 0, "mode")?))?;

        report(model.rotation.set_mode(mode))
    }
}

/// Command to show the status of the rotation hardware.
pub struct CommandRotationStatus;
impl Command for CommandRotationStatus {
    fn name(&self) -> &str {
        "rotation_status"
    }

    fn help(&self) -> &str {
        "show the drive, bias, and frequency"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        let status = report(model.rotation.status())?;

        info!(
            "Rotation is {} at {:.3} Hz ({}, mode: {}).",
            status.state.as_ref(),
            status.frequency,
            status.direction.as_ref(),
            status.mode.as_ref().map_or("unknown", |mode| mode.as_ref()),
        );
        info!(
            "Drive is {} with {:.3} V and {:.3} A. Bias is {}/{}.",
            status.drive_output.as_ref(),
            status.drive_voltage,
            status.drive_current,
            status.bias_output[0].as_ref(),
            status.bias_output[1].as_ref(),
        );

        Some(())
    }
}

/// Command to brake the rotor to rest.
pub struct CommandRotationStop;
impl Command for CommandRotationStop {
    fn name(&self) -> &str {
        "rotation_stop"
    }

    fn help(&self) -> &str {
        "brake the rotor to rest"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.rotation.stop())
    }
}

/// Command to spin the rotor at a frequency.
pub struct CommandRotationSpin;
impl Command for CommandRotationSpin {
    fn name(&self) -> &str {
        "rotation_spin"
    }

    fn help(&self) -> &str {
        "frequency (Hz)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let frequency = parse_float_argument(arguments, 0, "frequency")?;

        report(model.rotation.spin(frequency))
    }
}

/// Command to drive the rotor with a constant voltage.
pub struct CommandRotationVoltage;
impl Command for CommandRotationVoltage {
    fn name(&self) -> &str {
        "rotation_voltage"
    }

    fn help(&self) -> &str {
        "voltage (V)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let voltage = parse_float_argument(arguments, 0, "voltage")?;

        report(model.rotation.set_voltage(voltage))
    }
}

/// Command to turn the drive output off.
pub struct CommandRotationOff;
impl Command for CommandRotationOff {
    fn name(&self) -> &str {
        "rotation_off"
    }

    fn help(&self) -> &str {
        "turn the drive off"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.rotation.power_off())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enums::{ChannelId, RotationState};
    use crate::model::get_test_model;

    #[test]
    fn test_command_rotation_bias() {
        let (mut model, plant, _, _directory) = get_test_model();

        let command = CommandRotationBias;

        assert_eq!(command.name(), "rotation_bias");
        assert!(command.execute(&["on"], &mut model).is_some());
        assert!(plant.lock().unwrap().bias[1].is_output_on);

        assert!(command.execute(&["half"], &mut model).is_none());
        assert!(command.execute(&[], &mut model).is_none());
    }

    #[test]
    fn test_command_rotation_direction() {
        let (mut model, plant, _, _directory) = get_test_model();

        let command = CommandRotationDirection;

        assert!(command.execute(&["reverse"], &mut model).is_some());
        assert_eq!(plant.lock().unwrap().pid_direction, 1);
        assert_eq!(model.rotation.direction(), RotationDirection::Reverse);

        assert!(command.execute(&["up"], &mut model).is_none());
    }

    #[test]
    fn test_command_rotation_mode() {
        let (mut model, plant, _, _directory) = get_test_model();

        let command = CommandRotationMode;

        assert!(command.execute(&["pid"], &mut model).is_some());
        assert_eq!(plant.lock().unwrap().drive.mode, RotationMode::Pid);

        assert!(command.execute(&["VOLTAGE"], &mut model).is_some());
        assert_eq!(model.rotation.mode(), Some(RotationMode::Voltage));

        assert!(command.execute(&["torque"], &mut model).is_none());
    }

    #[test]
    fn test_command_rotation_spin_and_stop() {
        let (mut model, plant, _, _directory) = get_test_model();

        assert!(CommandRotationSpin.execute(&["1.0"], &mut model).is_some());
        assert_eq!(model.rotation.state(), RotationState::AtSpeed);
        assert!((plant.lock().unwrap().frequency - 1.0).abs() <= 0.005);

        assert!(CommandRotationStatus.execute(&[], &mut model).is_some());

        assert!(CommandRotationStop.execute(&[], &mut model).is_some());
        assert_eq!(model.rotation.state(), RotationState::Stopped);
        assert!(plant.lock().unwrap().frequency <= 0.15);
    }

    #[test]
    fn test_command_rotation_spin_out_of_range() {
        let (mut model, plant, _, _directory) = get_test_model();

        assert!(CommandRotationSpin.execute(&["3.6"], &mut model).is_none());
        assert!(CommandRotationSpin.execute(&["fast"], &mut model).is_none());

        assert!(plant.lock().unwrap().get_commands(ChannelId::Pid).is_empty());
    }

    #[test]
    fn test_command_rotation_voltage_and_off() {
        let (mut model, plant, _, _directory) = get_test_model();

        assert!(CommandRotationVoltage.execute(&["12"], &mut model).is_some());
        assert!(plant.lock().unwrap().drive.is_output_on);
        assert_eq!(plant.lock().unwrap().drive.voltage_setpoint, 12.0);

        assert!(CommandRotationOff.execute(&[], &mut model).is_some());
        assert!(!plant.lock().unwrap().drive.is_output_on);
    }

    #[test]
    fn test_command_rotation_status_fail() {
        let (mut model, plant, _, _directory) = get_test_model();
        plant.lock().unwrap().unreachable.insert(ChannelId::Drive);

        assert!(CommandRotationStatus.execute(&[], &mut model).is_none());
    }
}
