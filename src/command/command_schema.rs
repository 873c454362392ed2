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

use log::error;

use crate::constants::NUM_GRIPPER_AXIS;
use crate::enums::CommandStatus;
use crate::error::ControlError;
use crate::model::Model;

pub trait Command {
    /// Get the name of the command.
    ///
    /// # Returns
    /// Command name.
    fn name(&self) -> &str;

    /// Get the usage of the command.
    ///
    /// # Returns
    /// Usage.
    fn help(&self) -> &str;

    /// Execute the command.
    ///
    /// # Arguments
    /// * `arguments` - Arguments of the command.
    /// * `model` - Model to execute the command.
    ///
    /// # Returns
    /// Command execution result.
    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()>;
}

pub struct CommandSchema {
    // List of commands.
    pub commands: Vec<Box<dyn Command + Send>>,
}

impl CommandSchema {
    /// Create a new command schema.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command to the schema.
    pub fn add_command(&mut self, command: Box<dyn Command + Send>) {
        self.commands.push(command);
    }

    /// Execute a command line such as "rotation_spin 2.0".
    ///
    /// # Arguments
    /// * `line` - Command line.
    /// * `model` - Model to execute the command.
    ///
    /// # Returns
    /// Command execution result.
    pub fn execute(&self, line: &str, model: &mut Model) -> CommandStatus {
        let mut items = line.split_whitespace();
        let name = items.next().unwrap_or("");
        let arguments: Vec<&str> = items.collect();

        for cmd in &self.commands {
            if cmd.name() == name {
                return match cmd.execute(&arguments, model) {
                    Some(_) => CommandStatus::Success,
                    None => {
                        error!("Command execution failed: {line}");

                        CommandStatus::Fail
                    }
                };
            }
        }

        error!("Unknown command: {line}");

        CommandStatus::Fail
    }

    /// Get the usage of all the commands.
    ///
    /// # Returns
    /// One line per command.
    pub fn help(&self) -> String {
        let width = self
            .commands
            .iter()
            .map(|cmd| cmd.name().len())
            .max()
            .unwrap_or(0);

        self.commands
            .iter()
            .map(|cmd| format!("{:width$}  {}", cmd.name(), cmd.help()))
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Get the number of commands.
    ///
    /// # Returns
    /// Number of commands.
    pub fn number_of_commands(&self) -> usize {
        self.commands.len()
    }
}

/// Log the error of an operation.
///
/// # Arguments
/// * `result` - Result of the operation.
///
/// # Returns
/// Value of the operation, or None if it failed.
pub fn report<T>(result: Result<T, ControlError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            error!("{error}");
            None
        }
    }
}

/// Get the argument at the index.
///
/// # Arguments
/// * `arguments` - Arguments.
/// * `idx` - Index.
/// * `name` - Name of the argument.
///
/// # Returns
/// Argument.
pub fn get_argument<'a>(arguments: &[&'a str], idx: usize, name: &str) -> Option<&'a str> {
    let argument = arguments.get(idx).copied();
    if argument.is_none() {
        error!("Missing argument: {name}.");
    }

    argument
}

/// Parse the float argument at the index.
///
/// # Arguments
/// * `arguments` - Arguments.
/// * `idx` - Index.
/// * `name` - Name of the argument.
///
/// # Returns
/// Value.
pub fn parse_float_argument(arguments: &[&str], idx: usize, name: &str) -> Option<f64> {
    let argument = get_argument(arguments, idx, name)?;

    report(argument.parse::<f64>().map_err(|_| {
        ControlError::InvalidArgument(format!("{name} should be a number instead of '{argument}'"))
    }))
}

/// Parse the index argument at the index.
///
/// # Arguments
/// * `arguments` - Arguments.
/// * `idx` - Index.
/// * `name` - Name of the argument.
///
/// # Returns
/// Value.
pub fn parse_index_argument(arguments: &[&str], idx: usize, name: &str) -> Option<usize> {
    let argument = get_argument(arguments, idx, name)?;

    report(argument.parse::<usize>().map_err(|_| {
        ControlError::InvalidArgument(format!(
            "{name} should be a non-negative integer instead of '{argument}'"
        ))
    }))
}

/// Parse the position of each gripper axis starting at the index.
///
/// # Arguments
/// * `arguments` - Arguments.
/// * `idx` - Index of the first axis.
///
/// # Returns
/// Position in mm.
pub fn parse_position_argument(arguments: &[&str], idx: usize) -> Option<[f64; NUM_GRIPPER_AXIS]> {
    let mut position = [0.0; NUM_GRIPPER_AXIS];
    for (axis, value) in position.iter_mut().enumerate() {
        *value = parse_float_argument(arguments, idx + axis, &format!("position{}", axis + 1))?;
    }

    Some(position)
}
