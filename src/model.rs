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

use log::{error, info};
use std::env::current_exe;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use strum::IntoEnumIterator;

use crate::channel::gateway::create_gateway;
use crate::command::{
    command_gripper::{
        CommandColdGrip, CommandColdUngrip, CommandCooldownGrip, CommandGripperAlarm,
        CommandGripperBrake, CommandGripperHome, CommandGripperPosition, CommandGripperReboot,
        CommandGripperReset, CommandWarmGrip,
    },
    command_rotation::{
        CommandRotationBias, CommandRotationDirection, CommandRotationMode, CommandRotationOff,
        CommandRotationSpin, CommandRotationStatus, CommandRotationStop, CommandRotationVoltage,
    },
    command_schema::CommandSchema,
    command_system::{
        CommandBbPacketCollectStart, CommandBbPacketCollectStop, CommandBbReboot,
        CommandEmergencyMonitorStart, CommandEmergencyMonitorStop, CommandSlowdaqPublishersStart,
        CommandSlowdaqPublishersStop,
    },
};
use crate::config::Config;
use crate::device::ups::Ups;
use crate::enums::{ChannelId, PowerStatus, TelemetryDevice};
use crate::error::ControlError;
use crate::grip::gripper_controller::GripperController;
use crate::mock::mock_plant::MockPlant;
use crate::orchestrator::encoder_boards::EncoderBoards;
use crate::orchestrator::process_orchestrator::ProcessOrchestrator;
use crate::orchestrator::supervised_task::{TaskSpawner, TaskSpec};
use crate::rotation::rotation_controller::RotationController;
use crate::safety::emergency_monitor::{EmergencyMonitor, MONITOR_TASK_NAME};
use crate::safety::safety_status::SafetyStatusFile;
use crate::safety::safety_supervisor::ShutdownSequence;

/// How to launch this executable in another process role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleLauncher {
    pub program: String,
    // Arguments shared by all the roles.
    pub base_args: Vec<String>,
}

impl RoleLauncher {
    /// Create the launcher of the running executable.
    ///
    /// # Arguments
    /// * `config_file` - Parameter file.
    /// * `is_simulation_mode` - Is the simulation mode or not.
    /// * `log_level` - Log level.
    ///
    /// # Returns
    /// Launcher.
    pub fn from_current_exe(
        config_file: &str,
        is_simulation_mode: bool,
        log_level: u32,
    ) -> Result<Self, ControlError> {
        let program = current_exe().map_err(|error| ControlError::Process {
            name: String::from("self"),
            reason: error.to_string(),
        })?;

        let mut base_args = vec![
            String::from("--config"),
            String::from(config_file),
            String::from("--log-level"),
            log_level.to_string(),
        ];
        if is_simulation_mode {
            base_args.push(String::from("--simulate"));
        }

        Ok(Self {
            program: program.to_string_lossy().into_owned(),
            base_args: base_args,
        })
    }

    /// Get the task of a role.
    ///
    /// # Arguments
    /// * `name` - Name of the task.
    /// * `role_args` - Subcommand and its arguments.
    ///
    /// # Returns
    /// Task.
    pub fn spec(&self, name: &str, role_args: &[&str]) -> TaskSpec {
        let mut args = self.base_args.clone();
        args.extend(role_args.iter().map(|arg| String::from(*arg)));

        TaskSpec::new(name, &self.program, &args)
    }
}

/// Everything the shell commands act on.
pub struct Model {
    pub config: Config,
    pub rotation: RotationController,
    pub gripper: GripperController,
    pub emergency_monitor: EmergencyMonitor,
    pub encoder_boards: EncoderBoards,
    pub orchestrator: ProcessOrchestrator,
    _launcher: RoleLauncher,
    // Simulated hardware in the simulation mode.
    _plant: Option<Arc<Mutex<MockPlant>>>,
}

impl Model {
    /// Create a new model.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    /// * `plant` - Mock plant in the simulation mode. Put None to use the
    /// hardware.
    /// * `interrupt` - User interrupt to cancel the blocking operations.
    /// * `spawner` - Spawner of the helper processes.
    /// * `launcher` - Launcher of this executable in the other roles.
    ///
    /// # Returns
    /// A new model.
    pub fn new(
        config: Config,
        plant: Option<Arc<Mutex<MockPlant>>>,
        interrupt: &Arc<AtomicBool>,
        spawner: Box<dyn TaskSpawner>,
        launcher: RoleLauncher,
    ) -> Self {
        let plant_ref = plant.as_ref();

        Self {
            rotation: RotationController::from_config(&config, plant_ref, interrupt),
            gripper: GripperController::from_config(&config, plant_ref, interrupt),
            emergency_monitor: EmergencyMonitor::new(
                SafetyStatusFile::new(&config.status_file),
                config.safety.stop_poll_interval,
                interrupt,
            ),
            encoder_boards: EncoderBoards::new(&config.encoder),
            orchestrator: ProcessOrchestrator::new(spawner),

            _launcher: launcher,
            _plant: plant.clone(),

            config: config,
        }
    }

    /// Create the command schema of the shell.
    ///
    /// # Returns
    /// Command schema.
    pub fn create_command_schema() -> CommandSchema {
        let mut command_schema = CommandSchema::new();

        command_schema.add_command(Box::new(CommandWarmGrip));
        command_schema.add_command(Box::new(CommandCooldownGrip));
        command_schema.add_command(Box::new(CommandColdGrip));
        command_schema.add_command(Box::new(CommandColdUngrip));
        command_schema.add_command(Box::new(CommandGripperHome));
        command_schema.add_command(Box::new(CommandGripperBrake));
        command_schema.add_command(Box::new(CommandGripperAlarm));
        command_schema.add_command(Box::new(CommandGripperReset));
        command_schema.add_command(Box::new(CommandGripperReboot));
        command_schema.add_command(Box::new(CommandGripperPosition));

        command_schema.add_command(Box::new(CommandRotationBias));
        command_schema.add_command(Box::new(CommandRotationDirection));
        command_schema.add_command(Box::new(CommandRotationMode));
        command_schema.add_command(Box::new(CommandRotationStatus));
        command_schema.add_command(Box::new(CommandRotationStop));
        command_schema.add_command(Box::new(CommandRotationSpin));
        command_schema.add_command(Box::new(CommandRotationVoltage));
        command_schema.add_command(Box::new(CommandRotationOff));

        command_schema.add_command(Box::new(CommandBbReboot));
        command_schema.add_command(Box::new(CommandBbPacketCollectStart));
        command_schema.add_command(Box::new(CommandBbPacketCollectStop));
        command_schema.add_command(Box::new(CommandEmergencyMonitorStart));
        command_schema.add_command(Box::new(CommandEmergencyMonitorStop));
        command_schema.add_command(Box::new(CommandSlowdaqPublishersStart));
        command_schema.add_command(Box::new(CommandSlowdaqPublishersStop));

        command_schema
    }

    /// Create the UPS that the emergency monitor watches.
    pub fn create_ups(&self) -> Ups {
        Ups::new(create_gateway(
            &self.config,
            ChannelId::Ups,
            self._plant.as_ref(),
        ))
    }

    /// Get the task name of a publisher.
    ///
    /// # Arguments
    /// * `device` - Device group.
    ///
    /// # Returns
    /// Name.
    pub fn get_publisher_name(device: TelemetryDevice) -> String {
        format!("publisher_{}", device.as_ref())
    }

    /// Start the publishers of all the device groups. Every publisher is
    /// tried.
    pub fn start_publishers(&mut self) -> Result<(), ControlError> {
        let mut result = Ok(());
        for device in TelemetryDevice::iter() {
            let spec = self._launcher.spec(
                &Self::get_publisher_name(device),
                &["publish", device.as_ref()],
            );

            if let Err(error) = self.orchestrator.start(&spec) {
                error!("Failed to start the publisher of {}: {error}", device.as_ref());
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }

        result
    }

    /// Stop the publishers of all the device groups.
    pub fn stop_publishers(&mut self) -> Result<(), ControlError> {
        for device in TelemetryDevice::iter() {
            self.orchestrator.stop(&Self::get_publisher_name(device))?;
        }

        Ok(())
    }

    /// Start the emergency monitor process.
    ///
    /// # Arguments
    /// * `is_verbose` - Log each battery sample or not.
    pub fn start_emergency_monitor(&mut self, is_verbose: bool) -> Result<(), ControlError> {
        let mut role_args = vec!["monitor"];
        if is_verbose {
            role_args.push("--verbose");
        }

        let spec = self._launcher.spec(MONITOR_TASK_NAME, &role_args);
        self.emergency_monitor.start(&mut self.orchestrator, &spec)
    }

    /// Stop the emergency monitor process after it confirms.
    pub fn stop_emergency_monitor(&mut self) -> Result<(), ControlError> {
        self.emergency_monitor.stop(&mut self.orchestrator)
    }

    /// Stop the helper processes started by the shell. The emergency monitor
    /// keeps running.
    pub fn shutdown(&mut self) {
        if let Err(error) = self.stop_publishers() {
            error!("Failed to stop the publishers: {error}");
        }

        if let Err(error) = self
            .encoder_boards
            .stop_packet_collect(&mut self.orchestrator, 0)
        {
            error!("Failed to stop the packet collectors: {error}");
        }

        info!("Helper processes of the shell are stopped.");
    }
}

impl ShutdownSequence for Model {
    fn gripper_home(&mut self) -> Result<(), ControlError> {
        self.gripper.home()
    }

    fn gripper_reboot(&mut self) -> Result<(), ControlError> {
        self.gripper.reboot()
    }

    fn rotation_stop(&mut self) -> Result<(), ControlError> {
        self.rotation.stop()
    }

    fn rotation_off(&mut self) -> Result<(), ControlError> {
        self.rotation.power_off()
    }

    fn cold_grip(&mut self) -> Result<(), ControlError> {
        self.gripper.cold_grip()
    }

    fn bias_off(&mut self) -> Result<(), ControlError> {
        self.rotation.set_bias(PowerStatus::Off)
    }
}

/// Get the model used by the unit tests. It runs on the mock plant and the
/// fake spawner.
///
/// # Returns
/// Model, mock plant, spawner, and the directory of the files.
#[cfg(test)]
pub fn get_test_model() -> (
    Model,
    Arc<Mutex<MockPlant>>,
    crate::orchestrator::process_orchestrator::fake::FakeSpawner,
    tempfile::TempDir,
) {
    let directory = tempfile::tempdir().unwrap();
    let config = crate::config::get_test_config(directory.path());
    let plant = Arc::new(Mutex::new(MockPlant::new()));
    let spawner = crate::orchestrator::process_orchestrator::fake::FakeSpawner::default();

    let launcher = RoleLauncher {
        program: String::from("run_chwp_controller"),
        base_args: vec![String::from("--simulate")],
    };

    let model = Model::new(
        config,
        Some(plant.clone()),
        &Arc::new(AtomicBool::new(false)),
        Box::new(spawner.clone()),
        launcher,
    );

    (model, plant, spawner, directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enums::SafetyState;
    use crate::safety::safety_supervisor::SafetySupervisor;

    #[test]
    fn test_create_command_schema() {
        let schema = Model::create_command_schema();

        assert_eq!(schema.number_of_commands(), 25);
    }

    #[test]
    fn test_role_launcher() {
        let launcher = RoleLauncher::from_current_exe("config/a.yaml", true, 4).unwrap();
        let spec = launcher.spec("publisher_ups", &["publish", "ups"]);

        assert_eq!(spec.name, "publisher_ups");
        assert_eq!(
            spec.args,
            vec!["--config", "config/a.yaml", "--log-level", "4", "--simulate", "publish", "ups"]
        );
    }

    #[test]
    fn test_publishers() {
        let (mut model, _, spawner, _directory) = get_test_model();

        model.start_publishers().unwrap();
        model.start_publishers().unwrap();

        {
            let spawned = spawner.spawned.lock().unwrap();
            assert_eq!(spawned.len(), 5);
            assert_eq!(spawned[4].0.args, vec!["--simulate", "publish", "pmx"]);
        }

        model.shutdown();
        assert!(model.orchestrator.names().is_empty());
    }

    #[test]
    fn test_emergency_monitor() {
        let (mut model, _, spawner, _directory) = get_test_model();

        model.start_emergency_monitor(true).unwrap();
        assert!(spawner.get_liveness(MONITOR_TASK_NAME).is_some());
        assert_eq!(
            spawner.spawned.lock().unwrap()[0].0.args,
            vec!["--simulate", "monitor", "--verbose"]
        );

        // Shutting down the shell leaves the monitor.
        model.shutdown();
        assert_eq!(model.orchestrator.names(), vec![MONITOR_TASK_NAME]);
        assert_eq!(
            model.emergency_monitor.state().unwrap(),
            SafetyState::Running
        );
    }

    #[test]
    fn test_emergency_shutdown_on_mock_plant() {
        let (mut model, plant, _, _directory) = get_test_model();
        model.rotation.spin(1.0).unwrap();
        model.rotation.set_bias(PowerStatus::On).unwrap();
        plant
            .lock()
            .unwrap()
            .set_battery_readings(&[95.0, 90.0, 85.0, 78.0]);

        let mut ups = model.create_ups();
        let mut supervisor = SafetySupervisor::new(
            SafetyStatusFile::new(&model.config.status_file),
            &model.config.safety,
        );

        assert!(supervisor
            .monitor(&mut ups, &mut model, &AtomicBool::new(false))
            .unwrap());

        let plant = plant.lock().unwrap();
        assert!(plant.frequency <= 0.15);
        assert!(!plant.drive.is_output_on);
        assert!(plant.bias.iter().all(|bias| !bias.is_output_on));
        assert!(!plant.gripper.is_motor_on);
        assert!(plant.gripper.position[0] > 1.0);

        assert_eq!(model.emergency_monitor.state().unwrap(), SafetyState::Stopped);
    }
}
