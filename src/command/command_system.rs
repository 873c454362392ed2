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

use crate::command::command_schema::{parse_index_argument, report, Command};
use crate::model::Model;

/// Command to reboot the encoder boards.
pub struct CommandBbReboot;
impl Command for CommandBbReboot {
    fn name(&self) -> &str {
        "bb_reboot"
    }

    fn help(&self) -> &str {
        "index (0 for all boards)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let index = parse_index_argument(arguments, 0, "index")?;

        report(model.encoder_boards.reboot(&mut model.orchestrator, index))
    }
}

/// Command to start collecting the encoder packets.
pub struct CommandBbPacketCollectStart;
impl Command for CommandBbPacketCollectStart {
    fn name(&self) -> &str {
        "bb_packet_collect_start"
    }

    fn help(&self) -> &str {
        "index (0 for all boards)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let index = parse_index_argument(arguments, 0, "index")?;

        report(
            model
                .encoder_boards
                .start_packet_collect(&mut model.orchestrator, index),
        )
    }
}

/// Command to stop collecting the encoder packets.
pub struct CommandBbPacketCollectStop;
impl Command for CommandBbPacketCollectStop {
    fn name(&self) -> &str {
        "bb_packet_collect_stop"
    }

    fn help(&self) -> &str {
        "index (0 for all boards)"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let index = parse_index_argument(arguments, 0, "index")?;

        report(
            model
                .encoder_boards
                .stop_packet_collect(&mut model.orchestrator, index),
        )
    }
}

/// Command to start the emergency monitor.
pub struct CommandEmergencyMonitorStart;
impl Command for CommandEmergencyMonitorStart {
    fn name(&self) -> &str {
        "emergency_monitor_start"
    }

    fn help(&self) -> &str {
        "[verbose]"
    }

    fn execute(&self, arguments: &[&str], model: &mut Model) -> Option<()> {
        let is_verbose = match arguments.first() {
            None => false,
            Some(&"verbose") => true,
            Some(argument) => {
                error!("Unknown option of the emergency monitor: {argument}.");
                return None;
            }
        };

        report(model.start_emergency_monitor(is_verbose))
    }
}

/// Command to stop the emergency monitor.
pub struct CommandEmergencyMonitorStop;
impl Command for CommandEmergencyMonitorStop {
    fn name(&self) -> &str {
        "emergency_monitor_stop"
    }

    fn help(&self) -> &str {
        "stop the emergency monitor after it confirms"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.stop_emergency_monitor())
    }
}

/// Command to start the telemetry publishers.
pub struct CommandSlowdaqPublishersStart;
impl Command for CommandSlowdaqPublishersStart {
    fn name(&self) -> &str {
        "slowdaq_publishers_start"
    }

    fn help(&self) -> &str {
        "start the telemetry publishers"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.start_publishers())
    }
}

/// Command to stop the telemetry publishers.
pub struct CommandSlowdaqPublishersStop;
impl Command for CommandSlowdaqPublishersStop {
    fn name(&self) -> &str {
        "slowdaq_publishers_stop"
    }

    fn help(&self) -> &str {
        "stop the telemetry publishers"
    }

    fn execute(&self, _arguments: &[&str], model: &mut Model) -> Option<()> {
        report(model.stop_publishers())
    }
}
