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

use log::warn;
use std::collections::{HashSet, VecDeque};

use crate::channel::device_channel::DeviceCommand;
use crate::constants::{NUM_CYBERSWITCH_PORT, NUM_GRIPPER_AXIS};
use crate::device::ups::{
    OID_BATTERY_CAPACITY, OID_INPUT_FREQUENCY, OID_INPUT_VOLTAGE, OID_OUTPUT_FREQUENCY,
    OID_OUTPUT_LOAD, OID_OUTPUT_STATUS, OID_OUTPUT_VOLTAGE,
};
use crate::enums::{ChannelId, RotationMode};
use crate::mock::mock_constants::{
    PLANT_ACCELERATION, PLANT_BATTERY_CAPACITY, PLANT_CONTACT_POSITION, PLANT_DECELERATION,
    PLANT_FRICTION, PLANT_HZ_PER_VOLT, PLANT_RESISTANCE_BIAS, PLANT_RESISTANCE_DRIVE,
    PLANT_UNKNOWN_REPLY, PLANT_UPS_FREQUENCY, PLANT_UPS_LOAD, PLANT_UPS_VOLTAGE,
    PLANT_VOLTAGE_BIAS,
};
use crate::mock::mock_power_supply::MockPowerSupply;

/// Tuning loaded into the PID controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MockTuning {
    Frequency,
    Stop,
}

#[derive(Clone)]
pub struct MockGripper {
    // Position of each axis in mm.
    pub position: [f64; NUM_GRIPPER_AXIS],
    // Alarm of each axis. It is raised when the axis touches the rotor.
    pub alarm: [bool; NUM_GRIPPER_AXIS],
    pub is_motor_on: bool,
    pub is_brake_on: bool,
    // Contact position of each axis in mm.
    _contact: [f64; NUM_GRIPPER_AXIS],
}

impl MockGripper {
    fn new(contact: [f64; NUM_GRIPPER_AXIS]) -> Self {
        Self {
            position: [0.0; NUM_GRIPPER_AXIS],
            alarm: [false; NUM_GRIPPER_AXIS],
            is_motor_on: false,
            is_brake_on: false,
            _contact: contact,
        }
    }

    /// Parse the "axis value" arguments.
    fn parse_axis(arguments: &str) -> Option<(usize, f64)> {
        let mut items = arguments.split_whitespace();
        let axis = items.next()?.parse::<usize>().ok()?;
        let value = items.next()?.parse::<f64>().ok()?;

        if (1..=NUM_GRIPPER_AXIS).contains(&axis) {
            Some((axis - 1, value))
        } else {
            None
        }
    }

    fn reply(&mut self, command: &str) -> Option<String> {
        match command {
            "HOME" => {
                self.position = [0.0; NUM_GRIPPER_AXIS];
                self.alarm = [false; NUM_GRIPPER_AXIS];
                self.is_motor_on = true;
            }
            "OFF" => self.is_motor_on = false,
            "RESET" => self.alarm = [false; NUM_GRIPPER_AXIS],
            "BRAKE ON" => self.is_brake_on = true,
            "BRAKE OFF" => self.is_brake_on = false,
            "ALARM?" => {
                return Some(String::from(if self.alarm.iter().any(|x| *x) {
                    "1"
                } else {
                    "0"
                }))
            }
            "STATUS?" => {
                return Some(format!(
                    "pos1={:.2} pos2={:.2} pos3={:.2} alarm={} brake={} motor={}",
                    self.position[0],
                    self.position[1],
                    self.position[2],
                    self.alarm.iter().any(|x| *x) as u8,
                    self.is_brake_on as u8,
                    self.is_motor_on as u8,
                ))
            }
            _ => {
                if let Some(arguments) = command.strip_prefix("PUSH ") {
                    let (axis, increment) = Self::parse_axis(arguments)?;
                    self.is_motor_on = true;
                    if !self.alarm[axis] {
                        self.position[axis] += increment;
                        if self.position[axis] >= self._contact[axis] {
                            self.position[axis] = self._contact[axis];
                            self.alarm[axis] = true;
                        }
                    }
                } else if let Some(arguments) = command.strip_prefix("MOVE ") {
                    let (axis, delta) = Self::parse_axis(arguments)?;
                    self.is_motor_on = true;
                    self.position[axis] += delta;
                } else {
                    return None;
                }
            }
        }

        Some(String::new())
    }
}

/// Simulated CHWP hardware behind all the channels.
pub struct MockPlant {
    pub drive: MockPowerSupply,
    pub bias: [MockPowerSupply; 2],
    // PID controller registers.
    pub pid_direction: u8,
    pub pid_setpoint: f64,
    pub pid_tuning: Option<MockTuning>,
    // Rotation frequency of the rotor in Hz.
    pub frequency: f64,
    // The rotor does not respond to the drive. Used to simulate a timeout.
    pub is_stalled: bool,
    pub gripper: MockGripper,
    pub cyberswitch: [bool; NUM_CYBERSWITCH_PORT],
    // Battery capacity readings in percent. The last one is repeated.
    _battery: VecDeque<f64>,
    // Channels that can not be opened.
    pub unreachable: HashSet<ChannelId>,
    // Channels that reply with the garbage.
    pub garbled: HashSet<ChannelId>,
    // Every executed command in order.
    pub commands: Vec<(ChannelId, String)>,
}

impl MockPlant {
    /// Create a new mock plant with the rotor at rest and ungripped.
    ///
    /// # Returns
    /// A new mock plant.
    pub fn new() -> Self {
        Self {
            drive: MockPowerSupply::new(PLANT_RESISTANCE_DRIVE, 0.0),
            bias: [
                MockPowerSupply::new(PLANT_RESISTANCE_BIAS, PLANT_VOLTAGE_BIAS),
                MockPowerSupply::new(PLANT_RESISTANCE_BIAS, PLANT_VOLTAGE_BIAS),
            ],
            pid_direction: 0,
            pid_setpoint: 0.0,
            pid_tuning: None,
            frequency: 0.0,
            is_stalled: false,
            gripper: MockGripper::new(PLANT_CONTACT_POSITION),
            cyberswitch: [true; NUM_CYBERSWITCH_PORT],
            _battery: VecDeque::from([PLANT_BATTERY_CAPACITY]),
            unreachable: HashSet::new(),
            garbled: HashSet::new(),
            commands: Vec::new(),
        }
    }

    /// Set the battery capacity readings of the UPS.
    ///
    /// # Arguments
    /// * `readings` - Readings in percent. The last one is repeated.
    pub fn set_battery_readings(&mut self, readings: &[f64]) {
        if !readings.is_empty() {
            self._battery = readings.iter().copied().collect();
        }
    }

    /// Get the commands executed on a channel.
    ///
    /// # Arguments
    /// * `id` - Channel ID.
    ///
    /// # Returns
    /// Commands in order.
    pub fn get_commands(&self, id: ChannelId) -> Vec<String> {
        self.commands
            .iter()
            .filter(|(channel, _)| *channel == id)
            .map(|(_, command)| command.clone())
            .collect()
    }

    /// Can the channel be opened or not.
    pub fn is_reachable(&self, id: ChannelId) -> bool {
        !self.unreachable.contains(&id)
    }

    /// Reply to a command on a channel.
    ///
    /// # Arguments
    /// * `id` - Channel ID.
    /// * `command` - Command.
    ///
    /// # Returns
    /// Reply of the device.
    pub fn reply(&mut self, id: ChannelId, command: &DeviceCommand) -> String {
        let text = command.text();
        self.commands.push((id, String::from(text)));

        if self.garbled.contains(&id) {
            return String::from("#!?");
        }

        let reply = match id {
            ChannelId::Drive => self.drive.reply(text),
            ChannelId::Bias1 => self.bias[0].reply(text),
            ChannelId::Bias2 => self.bias[1].reply(text),
            ChannelId::Pid => self.reply_pid(text),
            ChannelId::Gripper => self.gripper.reply(text),
            ChannelId::Cyberswitch => self.reply_cyberswitch(text),
            ChannelId::Ups => self.reply_ups(text),
        };

        match reply {
            Some(reply) => reply,
            None => {
                warn!("Mock {} does not know the command: {text}.", id.as_ref());
                String::from(PLANT_UNKNOWN_REPLY)
            }
        }
    }

    fn reply_pid(&mut self, command: &str) -> Option<String> {
        match command {
            "FREQ?" => {
                self.update_rotor();
                Some(format!("{:.4}", self.frequency))
            }
            "DIR?" => Some(self.pid_direction.to_string()),
            _ => {
                if let Some(direction) = command.strip_prefix("DIR ") {
                    self.pid_direction = match direction.trim() {
                        "0" => 0,
                        "1" => 1,
                        _ => return None,
                    };
                } else if let Some(setpoint) = command.strip_prefix("SETPOINT ") {
                    self.pid_setpoint = setpoint.trim().parse::<f64>().ok()?;
                } else if command.starts_with("TUNE FREQ") {
                    self.pid_tuning = Some(MockTuning::Frequency);
                } else if command.starts_with("TUNE STOP") {
                    self.pid_tuning = Some(MockTuning::Stop);
                } else {
                    return None;
                }

                Some(String::new())
            }
        }
    }

    fn reply_cyberswitch(&mut self, command: &str) -> Option<String> {
        match command {
            "ALL ON" => {
                self.cyberswitch = [true; NUM_CYBERSWITCH_PORT];
                // Power cycle recovers the gripper controller.
                self.unreachable.remove(&ChannelId::Gripper);
            }
            "ALL OFF" => self.cyberswitch = [false; NUM_CYBERSWITCH_PORT],
            "STATUS?" => {
                return Some(
                    self.cyberswitch
                        .iter()
                        .map(|is_on| if *is_on { '1' } else { '0' })
                        .collect(),
                )
            }
            _ => {
                let mut items = command.split_whitespace();
                let action = items.next()?;
                let port = items.next()?.parse::<usize>().ok()?;
                if !(1..=NUM_CYBERSWITCH_PORT).contains(&port) {
                    return None;
                }

                match action {
                    "ON" | "REBOOT" => self.cyberswitch[port - 1] = true,
                    "OFF" => self.cyberswitch[port - 1] = false,
                    _ => return None,
                }
            }
        }

        Some(String::new())
    }

    fn reply_ups(&mut self, command: &str) -> Option<String> {
        let oid = command.strip_prefix("GET ")?.trim();

        let value = match oid {
            OID_BATTERY_CAPACITY => {
                let capacity = *self._battery.front()?;
                if self._battery.len() > 1 {
                    self._battery.pop_front();
                }
                capacity
            }
            OID_INPUT_VOLTAGE | OID_OUTPUT_VOLTAGE => PLANT_UPS_VOLTAGE,
            OID_INPUT_FREQUENCY | OID_OUTPUT_FREQUENCY => PLANT_UPS_FREQUENCY,
            OID_OUTPUT_LOAD => PLANT_UPS_LOAD,
            // On line.
            OID_OUTPUT_STATUS => 2.0,
            _ => return None,
        };

        Some(value.to_string())
    }

    /// Advance the rotor by one read-back.
    fn update_rotor(&mut self) {
        if self.is_stalled {
            return;
        }

        let (target, step) = if self.drive.is_output_on {
            match self.drive.mode {
                RotationMode::Pid => match self.pid_tuning {
                    Some(MockTuning::Frequency) => (self.pid_setpoint, PLANT_ACCELERATION),
                    Some(MockTuning::Stop) => (0.0, PLANT_DECELERATION),
                    None => (0.0, PLANT_FRICTION),
                },
                RotationMode::Voltage => (
                    self.drive.voltage_setpoint * PLANT_HZ_PER_VOLT,
                    PLANT_ACCELERATION,
                ),
            }
        } else {
            (0.0, PLANT_FRICTION)
        };

        let difference = target - self.frequency;
        if difference.abs() <= step {
            self.frequency = target;
        } else {
            self.frequency += step * difference.signum();
        }
    }
}
