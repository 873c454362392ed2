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

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::channel::gateway::create_gateway;
use crate::config::{Config, ConfigRotation};
use crate::device::pid_controller::PidController;
use crate::device::power_supply::PowerSupply;
use crate::enums::{ChannelId, PowerStatus, RotationDirection, RotationMode, RotationState};
use crate::error::ControlError;
use crate::mock::mock_plant::MockPlant;

// Step of the interruptible wait in second.
const WAIT_GRANULARITY: f64 = 0.1;

/// Snapshot of the rotation hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationStatus {
    pub drive_voltage: f64,
    pub drive_current: f64,
    pub drive_output: PowerStatus,
    pub bias_output: [PowerStatus; 2],
    pub frequency: f64,
    pub direction: RotationDirection,
    pub mode: Option<RotationMode>,
    pub state: RotationState,
}

/// Rotation of the CHWP rotor through the PID controller and the drive and
/// bias power supplies.
///
/// The cached mode and direction always equal the last values written to the
/// hardware successfully. Any operation that aborts after touching the
/// hardware turns the drive output off before it returns.
pub struct RotationController {
    _pid: PidController,
    _drive: PowerSupply,
    _bias: [PowerSupply; 2],
    // Cached drive mode. None until the first successful mode selection.
    _mode: Option<RotationMode>,
    // Cached direction.
    _direction: RotationDirection,
    _state: RotationState,
    _config: ConfigRotation,
    // Set by the user to cancel the blocking loops.
    _interrupt: Arc<AtomicBool>,
}

impl RotationController {
    /// Create a new rotation controller.
    ///
    /// # Arguments
    /// * `pid` - PID controller.
    /// * `drive` - Drive power supply.
    /// * `bias` - Bias power supplies.
    /// * `config` - Rotation settings.
    /// * `interrupt` - User interrupt.
    ///
    /// # Returns
    /// A new rotation controller.
    pub fn new(
        pid: PidController,
        drive: PowerSupply,
        bias: [PowerSupply; 2],
        config: &ConfigRotation,
        interrupt: &Arc<AtomicBool>,
    ) -> Self {
        Self {
            _pid: pid,
            _drive: drive,
            _bias: bias,
            _mode: None,
            _direction: RotationDirection::Forward,
            _state: RotationState::Idle,
            _config: config.clone(),
            _interrupt: interrupt.clone(),
        }
    }

    /// Create a new rotation controller from the configuration.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    /// * `plant` - Mock plant in the simulation mode.
    /// * `interrupt` - User interrupt.
    ///
    /// # Returns
    /// A new rotation controller.
    pub fn from_config(
        config: &Config,
        plant: Option<&Arc<Mutex<MockPlant>>>,
        interrupt: &Arc<AtomicBool>,
    ) -> Self {
        Self::new(
            PidController::new(create_gateway(config, ChannelId::Pid, plant)),
            PowerSupply::new(create_gateway(config, ChannelId::Drive, plant)),
            [
                PowerSupply::new(create_gateway(config, ChannelId::Bias1, plant)),
                PowerSupply::new(create_gateway(config, ChannelId::Bias2, plant)),
            ],
            &config.rotation,
            interrupt,
        )
    }

    pub fn direction(&self) -> RotationDirection {
        self._direction
    }

    pub fn mode(&self) -> Option<RotationMode> {
        self._mode
    }

    pub fn state(&self) -> RotationState {
        self._state
    }

    /// Write the direction register of the PID controller.
    ///
    /// # Arguments
    /// * `direction` - Direction.
    pub fn set_direction(&mut self, direction: RotationDirection) -> Result<(), ControlError> {
        if let Err(error) = self._pid.set_direction(direction) {
            error!("Failed to set the direction to {}: {error}", direction.as_ref());
            return Err(error.into());
        }

        self._direction = direction;
        info!("Rotation direction is {}.", direction.as_ref());

        Ok(())
    }

    /// Read the direction register of the PID controller back into the
    /// cache. Another process may have changed it since this controller was
    /// created.
    ///
    /// # Returns
    /// Direction.
    pub fn read_direction(&mut self) -> Result<RotationDirection, ControlError> {
        let direction = self._pid.get_direction()?;
        if direction != self._direction {
            info!(
                "Rotation direction is {} on the PID controller.",
                direction.as_ref()
            );
        }

        self._direction = direction;

        Ok(direction)
    }

    /// Select the drive mode on the drive power supply.
    ///
    /// # Arguments
    /// * `mode` - Drive mode.
    pub fn set_mode(&mut self, mode: RotationMode) -> Result<(), ControlError> {
        let previous_state = self._state;

        if let Err(error) = self.write_mode(mode) {
            return Err(self.abort(&format!("Mode switching to {}", mode.as_ref()), error));
        }

        self._state = previous_state;

        Ok(())
    }

    fn write_mode(&mut self, mode: RotationMode) -> Result<(), ControlError> {
        self._state = RotationState::ModeSwitching;
        self._drive.select_mode(mode)?;

        self._mode = Some(mode);
        info!("Rotation mode is {}.", mode.as_ref());

        Ok(())
    }

    /// Spin the rotor up (or down) to the target frequency under the PID
    /// control and wait until the frequency converges.
    ///
    /// # Arguments
    /// * `frequency` - Target frequency in Hz.
    pub fn spin(&mut self, frequency: f64) -> Result<(), ControlError> {
        if !frequency.is_finite() || frequency < 0.0 || frequency > self._config.max_frequency {
            return Err(ControlError::InvalidArgument(format!(
                "frequency should be in [0.0, {}] Hz instead of {frequency}",
                self._config.max_frequency
            )));
        }

        self._interrupt.store(false, Ordering::Relaxed);
        info!("Spinning the rotor to {frequency} Hz.");

        match self.run_spin(frequency) {
            Ok(current) => {
                self._state = RotationState::AtSpeed;
                info!("Tuning finished at {current} Hz.");

                Ok(())
            }
            Err(error) => Err(self.abort("Spin", error)),
        }
    }

    fn run_spin(&mut self, frequency: f64) -> Result<f64, ControlError> {
        self.write_mode(RotationMode::Pid)?;
        self.set_direction(self._direction)?;

        self._state = RotationState::SpinningUp;
        self._pid.declare_frequency(frequency)?;
        self._pid.tune_frequency(&self._config.gain_tune)?;
        self._drive.set_output(PowerStatus::On)?;

        let tolerance = self._config.frequency_tolerance;
        self.wait_frequency("Spin", self._config.spin_timeout, |current| {
            (current - frequency).abs() <= tolerance
        })
    }

    /// Drive the rotor with a constant voltage.
    ///
    /// # Arguments
    /// * `voltage` - Voltage in volt.
    pub fn set_voltage(&mut self, voltage: f64) -> Result<(), ControlError> {
        if !voltage.is_finite() || voltage < 0.0 || voltage > self._config.max_voltage {
            return Err(ControlError::InvalidArgument(format!(
                "voltage should be in [0.0, {}] V instead of {voltage}",
                self._config.max_voltage
            )));
        }

        match self.run_voltage(voltage) {
            Ok(()) => {
                self._state = RotationState::AtSpeed;
                info!("Drive voltage is set to {voltage} V.");

                Ok(())
            }
            Err(error) => Err(self.abort("Voltage drive", error)),
        }
    }

    fn run_voltage(&mut self, voltage: f64) -> Result<(), ControlError> {
        self.write_mode(RotationMode::Voltage)?;
        self.set_direction(self._direction)?;

        self._drive.set_voltage(voltage)?;
        self._drive.set_output(PowerStatus::On)?;

        Ok(())
    }

    /// Brake the rotor by driving it in the opposite direction with the stop
    /// tuning until the frequency drops to the stop threshold. The drive
    /// output is off when this returns.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        self._interrupt.store(false, Ordering::Relaxed);

        if let Err(error) = self.read_direction() {
            warn!(
                "Failed to read the direction back, use the cached {}: {error}",
                self._direction.as_ref()
            );
        }

        let direction = self._direction;
        info!("Stopping the rotor.");

        match self.run_stop(direction) {
            Ok(current) => {
                if let Err(error) = self._drive.set_output(PowerStatus::Off) {
                    return Err(self.abort("Stop", error.into()));
                }

                if let Err(error) = self.set_direction(direction) {
                    self._state = RotationState::Fault;
                    return Err(error);
                }

                self._state = RotationState::Stopped;
                info!("Rotor stopped at {current} Hz.");

                Ok(())
            }
            Err(error) => {
                let error = self.abort("Stop", error);

                // Best effort. The output is already off.
                if self._direction != direction {
                    let _ = self.set_direction(direction);
                }

                Err(error)
            }
        }
    }

    fn run_stop(&mut self, direction: RotationDirection) -> Result<f64, ControlError> {
        self.write_mode(RotationMode::Pid)?;
        self._state = RotationState::Stopping;
        self.set_direction(direction.opposite())?;

        self._pid.tune_stop(&self._config.gain_stop)?;
        self._drive.set_output(PowerStatus::On)?;

        let threshold = self._config.stop_frequency;
        self.wait_frequency("Stop", self._config.stop_timeout, |current| {
            current <= threshold
        })
    }

    /// Disable the drive output unconditionally.
    pub fn power_off(&mut self) -> Result<(), ControlError> {
        match self._drive.set_output(PowerStatus::Off) {
            Ok(()) => {
                self._state = RotationState::Stopped;
                info!("Drive power turned off.");

                Ok(())
            }
            Err(error) => {
                self._state = RotationState::Fault;
                error!("Failed to turn off the drive power: {error}");

                Err(error.into())
            }
        }
    }

    /// Switch both bias power supplies. Both are tried even if the first one
    /// fails.
    ///
    /// # Arguments
    /// * `status` - Output status.
    pub fn set_bias(&mut self, status: PowerStatus) -> Result<(), ControlError> {
        let mut result = Ok(());
        for bias in self._bias.iter_mut() {
            if let Err(error) = bias.set_output(status) {
                error!("Failed to switch {} {}: {error}", bias.name(), status.as_ref());
                if result.is_ok() {
                    result = Err(error.into());
                }
            }
        }

        if result.is_ok() {
            info!("Bias power supply status changed to: {}.", status.as_ref());
        }

        result
    }

    /// Read the status of the rotation hardware.
    ///
    /// # Returns
    /// Status.
    pub fn status(&mut self) -> Result<RotationStatus, ControlError> {
        let (drive_voltage, drive_current) = self._drive.get_voltage_and_current()?;

        Ok(RotationStatus {
            drive_voltage: drive_voltage,
            drive_current: drive_current,
            drive_output: self._drive.get_output()?,
            bias_output: [self._bias[0].get_output()?, self._bias[1].get_output()?],
            frequency: self._pid.get_frequency()?,
            direction: self._direction,
            mode: self._mode,
            state: self._state,
        })
    }

    /// Poll the frequency until the condition holds.
    ///
    /// # Arguments
    /// * `operation` - Name of the operation.
    /// * `timeout` - Deadline in second.
    /// * `is_done` - Condition of the frequency.
    ///
    /// # Returns
    /// Last frequency in Hz.
    fn wait_frequency<F>(
        &mut self,
        operation: &str,
        timeout: f64,
        is_done: F,
    ) -> Result<f64, ControlError>
    where
        F: Fn(f64) -> bool,
    {
        if !self.wait(self._config.settle_time) {
            return Err(ControlError::UserCancelled {
                operation: String::from(operation),
            });
        }

        let start = Instant::now();
        let poll_interval = Duration::from_secs_f64(self._config.poll_interval.max(0.0));
        loop {
            let current = self._pid.get_frequency()?;
            debug!("Current frequency = {current} Hz.");

            if is_done(current) {
                return Ok(current);
            }

            if self._interrupt.load(Ordering::Relaxed) {
                return Err(ControlError::UserCancelled {
                    operation: String::from(operation),
                });
            }

            if start.elapsed().as_secs_f64() > timeout {
                return Err(ControlError::Timeout {
                    operation: String::from(operation),
                    seconds: timeout,
                });
            }

            if !poll_interval.is_zero() {
                sleep(poll_interval);
            }
        }
    }

    /// Wait and wake up early on the user interrupt.
    ///
    /// # Arguments
    /// * `duration` - Duration in second.
    ///
    /// # Returns
    /// False if interrupted.
    fn wait(&self, duration: f64) -> bool {
        crate::utility::sleep_interruptible(duration, WAIT_GRANULARITY, &self._interrupt)
    }

    /// Bring the drive to the safe state after an operation aborted.
    ///
    /// # Arguments
    /// * `operation` - Name of the operation.
    /// * `error` - Cause.
    ///
    /// # Returns
    /// The cause.
    fn abort(&mut self, operation: &str, error: ControlError) -> ControlError {
        error!("{operation} aborted: {error}");

        if let Err(error_off) = self._drive.set_output(PowerStatus::Off) {
            warn!("Failed to turn off the drive output after the abort: {error_off}");
        }
        self._state = RotationState::Fault;

        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread::spawn;
    use tempfile::{tempdir, TempDir};

    use crate::config::get_test_config;
    use crate::mock::mock_plant::MockTuning;

    fn create_rotation_controller(
        config: &Config,
    ) -> (RotationController, Arc<Mutex<MockPlant>>, Arc<AtomicBool>) {
        let plant = Arc::new(Mutex::new(MockPlant::new()));
        let interrupt = Arc::new(AtomicBool::new(false));

        (
            RotationController::from_config(config, Some(&plant), &interrupt),
            plant,
            interrupt,
        )
    }

    fn create_config() -> (Config, TempDir) {
        let directory = tempdir().unwrap();
        let mut config = get_test_config(directory.path());
        config.rotation.stop_timeout = 0.3;
        config.rotation.spin_timeout = 0.3;

        (config, directory)
    }

    fn spin_rotor(plant: &Arc<Mutex<MockPlant>>, frequency: f64) {
        let mut plant = plant.lock().unwrap();
        plant.frequency = frequency;
        plant.drive.is_output_on = true;
        plant.drive.mode = RotationMode::Pid;
        plant.pid_tuning = Some(MockTuning::Frequency);
        plant.pid_setpoint = frequency;
    }

    #[test]
    fn test_new() {
        let (config, _directory) = create_config();
        let (controller, _, _) = create_rotation_controller(&config);

        assert_eq!(controller.direction(), RotationDirection::Forward);
        assert_eq!(controller.mode(), None);
        assert_eq!(controller.state(), RotationState::Idle);
    }

    #[test]
    fn test_set_direction() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_direction(RotationDirection::Reverse).unwrap();

        assert_eq!(controller.direction(), RotationDirection::Reverse);
        assert_eq!(plant.lock().unwrap().pid_direction, 1);
    }

    #[test]
    fn test_set_direction_fail() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        plant.lock().unwrap().unreachable.insert(ChannelId::Pid);

        assert!(controller.set_direction(RotationDirection::Reverse).is_err());

        assert_eq!(controller.direction(), RotationDirection::Forward);
    }

    #[test]
    fn test_set_mode() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_mode(RotationMode::Pid).unwrap();

        assert_eq!(controller.mode(), Some(RotationMode::Pid));
        assert_eq!(controller.state(), RotationState::Idle);
        assert_eq!(plant.lock().unwrap().get_commands(ChannelId::Drive), vec!["U"]);
    }

    #[test]
    fn test_set_mode_fail() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_mode(RotationMode::Voltage).unwrap();

        plant.lock().unwrap().unreachable.insert(ChannelId::Drive);
        assert!(controller.set_mode(RotationMode::Pid).is_err());

        assert_eq!(controller.mode(), Some(RotationMode::Voltage));
        assert_eq!(controller.state(), RotationState::Fault);
    }

    #[test]
    fn test_spin() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.spin(2.0).unwrap();

        assert_eq!(controller.state(), RotationState::AtSpeed);
        assert_eq!(controller.mode(), Some(RotationMode::Pid));

        let plant = plant.lock().unwrap();
        assert!((plant.frequency - 2.0).abs() <= 0.005);
        assert!(plant.drive.is_output_on);
        assert_eq!(plant.get_commands(ChannelId::Drive), vec!["U", "ON"]);

        let commands = plant.get_commands(ChannelId::Pid);
        assert_eq!(
            commands[0..3],
            ["DIR 0", "SETPOINT 2.000", "TUNE FREQ 0.2 63 0"]
        );
        assert!(commands[3..].iter().all(|command| command == "FREQ?"));
    }

    #[test]
    fn test_spin_keeps_direction() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_direction(RotationDirection::Reverse).unwrap();
        plant.lock().unwrap().pid_direction = 0;

        controller.spin(0.5).unwrap();

        assert_eq!(plant.lock().unwrap().pid_direction, 1);
    }

    #[test]
    fn test_spin_invalid_argument() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        for frequency in [3.6, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                controller.spin(frequency),
                Err(ControlError::InvalidArgument(_))
            ));
        }

        assert!(plant.lock().unwrap().commands.is_empty());
        assert_eq!(controller.state(), RotationState::Idle);

        // Boundaries are fine.
        controller.spin(0.0).unwrap();
    }

    #[test]
    fn test_spin_timeout() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        plant.lock().unwrap().is_stalled = true;

        assert!(matches!(
            controller.spin(1.0),
            Err(ControlError::Timeout { .. })
        ));

        assert!(!plant.lock().unwrap().drive.is_output_on);
        assert_eq!(controller.state(), RotationState::Fault);
    }

    #[test]
    fn test_spin_user_cancelled() {
        let (mut config, _directory) = create_config();
        config.rotation.spin_timeout = 10.0;
        config.rotation.poll_interval = 0.01;

        let (mut controller, plant, interrupt) = create_rotation_controller(&config);
        plant.lock().unwrap().is_stalled = true;

        // Stale interrupt is cleared by the operation.
        interrupt.store(true, Ordering::Relaxed);

        let interrupt_user = interrupt.clone();
        let handle = spawn(move || {
            sleep(Duration::from_millis(100));
            interrupt_user.store(true, Ordering::Relaxed);
        });

        let start = Instant::now();
        assert!(matches!(
            controller.spin(1.0),
            Err(ControlError::UserCancelled { .. })
        ));
        assert!(start.elapsed() >= Duration::from_millis(100));

        handle.join().unwrap();

        assert!(!plant.lock().unwrap().drive.is_output_on);
        assert_eq!(controller.state(), RotationState::Fault);
    }

    #[test]
    fn test_spin_protocol_error() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        plant.lock().unwrap().garbled.insert(ChannelId::Pid);

        assert!(matches!(
            controller.spin(1.0),
            Err(ControlError::Channel(_))
        ));

        assert!(!plant.lock().unwrap().drive.is_output_on);
    }

    #[test]
    fn test_set_voltage() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_voltage(12.0).unwrap();

        assert_eq!(controller.mode(), Some(RotationMode::Voltage));
        assert_eq!(controller.state(), RotationState::AtSpeed);

        let plant = plant.lock().unwrap();
        assert_eq!(
            plant.get_commands(ChannelId::Drive),
            vec!["I", "V 12.000", "ON"]
        );
        assert_eq!(plant.get_commands(ChannelId::Pid), vec!["DIR 0"]);
    }

    #[test]
    fn test_set_voltage_invalid_argument() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_mode(RotationMode::Pid).unwrap();
        plant.lock().unwrap().commands.clear();

        assert!(matches!(
            controller.set_voltage(40.0),
            Err(ControlError::InvalidArgument(_))
        ));
        assert!(controller.set_voltage(-1.0).is_err());

        assert!(plant.lock().unwrap().commands.is_empty());
        assert_eq!(controller.mode(), Some(RotationMode::Pid));
    }

    #[test]
    fn test_set_voltage_fail() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        plant.lock().unwrap().unreachable.insert(ChannelId::Pid);

        assert!(controller.set_voltage(12.0).is_err());

        // Mode is confirmed by the hardware but the direction is not.
        assert_eq!(controller.mode(), Some(RotationMode::Voltage));
        assert_eq!(controller.direction(), RotationDirection::Forward);
        assert_eq!(controller.state(), RotationState::Fault);

        let plant = plant.lock().unwrap();
        assert!(!plant.drive.is_output_on);
        assert_eq!(plant.get_commands(ChannelId::Drive), vec!["I", "OFF"]);
    }

    #[test]
    fn test_stop() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        spin_rotor(&plant, 2.0);

        controller.stop().unwrap();

        assert_eq!(controller.state(), RotationState::Stopped);
        assert_eq!(controller.direction(), RotationDirection::Forward);

        let plant = plant.lock().unwrap();
        assert!(plant.frequency <= 0.15);
        assert!(!plant.drive.is_output_on);
        assert_eq!(plant.pid_direction, 0);

        let commands = plant.get_commands(ChannelId::Pid);
        assert_eq!(commands[0..3], ["DIR?", "DIR 1", "TUNE STOP 0.2 0 0"]);
        assert_eq!(commands[commands.len() - 1], "DIR 0");

        assert_eq!(plant.get_commands(ChannelId::Drive), vec!["U", "ON", "OFF"]);
    }

    #[test]
    fn test_stop_reverse() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_direction(RotationDirection::Reverse).unwrap();
        spin_rotor(&plant, 1.0);

        controller.stop().unwrap();

        assert_eq!(controller.direction(), RotationDirection::Reverse);
        assert_eq!(
            plant.lock().unwrap().get_commands(ChannelId::Pid)[1..3],
            ["DIR?", "DIR 0"]
        );
    }

    #[test]
    fn test_stop_direction_set_elsewhere() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        // Another process spins the rotor in reverse.
        spin_rotor(&plant, 1.0);
        plant.lock().unwrap().pid_direction = 1;

        controller.stop().unwrap();

        assert_eq!(controller.direction(), RotationDirection::Reverse);

        let plant = plant.lock().unwrap();
        assert_eq!(plant.pid_direction, 1);
        assert_eq!(plant.get_commands(ChannelId::Pid)[0..2], ["DIR?", "DIR 0"]);
    }

    #[test]
    fn test_read_direction() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        plant.lock().unwrap().pid_direction = 1;

        assert_eq!(
            controller.read_direction().unwrap(),
            RotationDirection::Reverse
        );
        assert_eq!(controller.direction(), RotationDirection::Reverse);

        plant.lock().unwrap().unreachable.insert(ChannelId::Pid);

        assert!(controller.read_direction().is_err());
        assert_eq!(controller.direction(), RotationDirection::Reverse);
    }

    #[test]
    fn test_stop_timeout() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        spin_rotor(&plant, 2.0);
        plant.lock().unwrap().is_stalled = true;

        let start = Instant::now();
        assert!(matches!(
            controller.stop(),
            Err(ControlError::Timeout { .. })
        ));
        assert!(start.elapsed() >= Duration::from_secs_f64(0.3));

        assert_eq!(controller.state(), RotationState::Fault);
        assert_eq!(controller.direction(), RotationDirection::Forward);

        let plant = plant.lock().unwrap();
        assert!(!plant.drive.is_output_on);
        assert_eq!(plant.pid_direction, 0);
    }

    #[test]
    fn test_power_off() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);
        spin_rotor(&plant, 1.0);

        controller.power_off().unwrap();

        assert!(!plant.lock().unwrap().drive.is_output_on);
        assert_eq!(controller.state(), RotationState::Stopped);

        plant.lock().unwrap().unreachable.insert(ChannelId::Drive);
        assert!(controller.power_off().is_err());
        assert_eq!(controller.state(), RotationState::Fault);
    }

    #[test]
    fn test_set_bias() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_bias(PowerStatus::On).unwrap();
        assert!(plant.lock().unwrap().bias.iter().all(|bias| bias.is_output_on));

        // The second one is still switched when the first one fails.
        plant.lock().unwrap().unreachable.insert(ChannelId::Bias1);
        assert!(controller.set_bias(PowerStatus::Off).is_err());

        let plant = plant.lock().unwrap();
        assert!(plant.bias[0].is_output_on);
        assert!(!plant.bias[1].is_output_on);
    }

    #[test]
    fn test_status() {
        let (config, _directory) = create_config();
        let (mut controller, plant, _) = create_rotation_controller(&config);

        controller.set_voltage(16.0).unwrap();
        plant.lock().unwrap().is_stalled = true;
        plant.lock().unwrap().frequency = 1.6;

        let status = controller.status().unwrap();

        assert_eq!(status.drive_voltage, 16.0);
        assert_eq!(status.drive_current, 2.0);
        assert_eq!(status.drive_output, PowerStatus::On);
        assert_eq!(status.bias_output, [PowerStatus::Off, PowerStatus::Off]);
        assert_eq!(status.frequency, 1.6);
        assert_eq!(status.direction, RotationDirection::Forward);
        assert_eq!(status.mode, Some(RotationMode::Voltage));
        assert_eq!(status.state, RotationState::AtSpeed);
    }
}
