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

use crate::command::command_schema::{
    get_argument, parse_position_argument, report, Command,
};
use crate::enums::PowerStatus;
use crate::model::Model;

/// Command to grip the rotor at the room temperature.
pub struct CommandWarmGrip;
impl Command for CommandWarmGrip {
    fn name(&self) -> &str {
        "warm_grip"
    }

    fn help(&self) -> &str {
        "x y z (mm, centered position of each axis)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let position = parse_position_argument(arguments, 0)?;

        report(model.gripper.warm_grip(&position))
    }
}

/// Command to keep the rotor gripped during the cooldown.
pub struct CommandCooldownGrip;
impl Command for CommandCooldownGrip {
    fn name(&self) -> &str {
        "cooldown_grip"
    }

    fn help(&self) -> &str {
        "regrip periodically until interrupted (Ctrl-C)"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.gripper.cooldown_grip())
    }
}

/// Command to grip the rotor at the cryogenic temperature.
pub struct CommandColdGrip;
impl Command for CommandColdGrip {
    fn name(&self) -> &str {
        "cold_grip"
    }

    fn help(&self) -> &str {
        "grip the cold rotor"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.gripper.cold_grip())
    }
}

/// Command to release the rotor at the cryogenic temperature.
pub struct CommandColdUngrip;
impl Command for CommandColdUngrip {
    fn name(&self) -> &str {
        "cold_ungrip"
    }

    fn help(&self) -> &str {
        "x y z (mm, position to record before releasing)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let position = parse_position_argument(arguments, 0)?;

        report(model.gripper.cold_ungrip(&position))
    }
}

/// Command to move the gripper to the home position.
pub struct CommandGripperHome;
impl Command for CommandGripperHome {
    fn name(&self) -> &str {
        "gripper_home"
    }

    fn help(&self) -> &str {
        "move all axes home"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.gripper.home())
    }
}

/// Command to engage or release the brake.
pub struct CommandGripperBrake;
impl Command for CommandGripperBrake {
    fn name(&self) -> &str {
        "gripper_brake"
    }

    fn help(&self) -> &str {
        "on|off"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let status = report(PowerStatus::parse(get_argument(arguments, 0, "status")?))?;

        report(model.gripper.set_brake(status))
    }
}

/// Command to show the alarm.
pub struct CommandGripperAlarm;
impl Command for CommandGripperAlarm {
    fn name(&self) -> &str {
        "gripper_alarm"
    }

    fn help(&self) -> &str {
        "show the alarm"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        let is_alarmed = report(model.gripper.get_alarm())?;
        info!(
            "Gripper alarm is {}.",
            if is_alarmed { "on" } else { "off" }
        );

        Some(())
    }
}

/// Command to reset the alarm.
pub struct CommandGripperReset;
impl Command for CommandGripperReset {
    fn name(&self) -> &str {
        "gripper_reset"
    }

    fn help(&self) -> &str {
        "reset the alarm"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.gripper.reset())
    }
}

/// Command to power-cycle the gripper controller.
pub struct CommandGripperReboot;
impl Command for CommandGripperReboot {
    fn name(&self) -> &str {
        "gripper_reboot"
    }

    fn help(&self) -> &str {
        "power-cycle the gripper controller"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.gripper.reboot())
    }
}

/// Command to show the positions, or to record a pose when the name and the
/// position are given.
pub struct CommandGripperPosition;
impl Command for CommandGripperPosition {
    fn name(&self) -> &str {
        "gripper_position"
    }

    fn help(&self) -> &str {
        "[name x y z] (show the positions, or record a pose)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        if let Some(name) = arguments.first() {
            let position = parse_position_argument(arguments, 1)?;
            return report(model.gripper.record_position(name, &position));
        }

        let position = report(model.gripper.get_position())?;
        info!("Gripper position: {position:?} mm.");

        for (name, pose) in report(model.gripper.get_recorded_positions())? {
            info!("Recorded {name}: {pose:?} mm.");
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enums::ChannelId;
    use crate::grip::gripper_controller::{POSE_COLD_UNGRIP, POSE_WARM_CENTERED};
    use crate::model::get_test_model;

    #[test]
    fn test_command_warm_grip() {
        let (mut model, plant, _, _directory) = get_test_model();

        let command = CommandWarmGrip;

        assert_eq!(command.name(), "warm_grip");
        assert!(command
            .execute(&["0.1", "0.2", "0.3"], &mut model)
            .is_some());

        assert_eq!(
            model.gripper.get_recorded_positions().unwrap()[POSE_WARM_CENTERED],
            [0.1, 0.2, 0.3]
        );
        assert!(!plant.lock().unwrap().gripper.is_motor_on);

        // Missing axis.
        assert!(command.execute(&["0.1", "0.2"], &mut model).is_none());
    }

    #[test]
    fn test_command_cooldown_grip_fail() {
        let (mut model, plant, _, _directory) = get_test_model();
        plant.lock().unwrap().unreachable.insert(ChannelId::Gripper);

        assert!(CommandCooldownGrip.execute(&[], &mut model).is_none());
    }

    #[test]
    fn test_command_cold_grip_and_ungrip() {
        let (mut model, plant, _, _directory) = get_test_model();

        assert!(CommandColdGrip.execute(&[], &mut model).is_some());
        assert!(plant.lock().unwrap().gripper.position[0] > 0.0);

        assert!(CommandColdUngrip
            .execute(&["1", "2", "3"], &mut model)
            .is_some());
        assert_eq!(plant.lock().unwrap().gripper.position, [0.0; 3]);
        assert_eq!(
            model.gripper.get_recorded_positions().unwrap()[POSE_COLD_UNGRIP],
            [1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_command_gripper_home() {
        let (mut model, plant, _, _directory) = get_test_model();
        plant.lock().unwrap().gripper.position = [1.0, 1.0, 1.0];

        assert!(CommandGripperHome.execute(&[], &mut model).is_some());
        assert_eq!(plant.lock().unwrap().gripper.position, [0.0; 3]);

        plant.lock().unwrap().unreachable.insert(ChannelId::Gripper);
        assert!(CommandGripperHome.execute(&[], &mut model).is_none());
    }

    #[test]
    fn test_command_gripper_brake_alarm_reset() {
        let (mut model, plant, _, _directory) = get_test_model();

        assert!(CommandGripperBrake.execute(&["on"], &mut model).is_some());
        assert!(plant.lock().unwrap().gripper.is_brake_on);
        assert!(CommandGripperBrake.execute(&["tight"], &mut model).is_none());

        plant.lock().unwrap().gripper.alarm[2] = true;
        assert!(CommandGripperAlarm.execute(&[], &mut model).is_some());

        assert!(CommandGripperReset.execute(&[], &mut model).is_some());
        assert_eq!(plant.lock().unwrap().gripper.alarm, [false; 3]);
    }

    #[test]
    fn test_command_gripper_reboot() {
        let (mut model, plant, _, _directory) = get_test_model();
        plant.lock().unwrap().unreachable.insert(ChannelId::Gripper);

        assert!(CommandGripperReboot.execute(&[], &mut model).is_some());
        assert!(plant.lock().unwrap().is_reachable(ChannelId::Gripper));
    }

    #[test]
    fn test_command_gripper_position() {
        let (mut model, _, _, _directory) = get_test_model();

        let command = CommandGripperPosition;

        assert!(command.execute(&[], &mut model).is_some());

        assert!(command
            .execute(&["Spare", "1", "2", "3"], &mut model)
            .is_some());
        assert_eq!(
            model.gripper.get_recorded_positions().unwrap()["Spare"],
            [1.0, 2.0, 3.0]
        );

        assert!(command.execute(&["Spare", "1"], &mut model).is_none());
        assert!(command
            .execute(&["a,b", "1", "2", "3"], &mut model)
            .is_none());
    }
}
