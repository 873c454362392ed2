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
use std::sync::atomic::AtomicBool;
use std::thread::sleep;
use std::time::Duration;

use crate::config::ConfigSafety;
use crate::device::ups::Ups;
use crate::enums::SafetyState;
use crate::error::ControlError;
use crate::safety::safety_status::{SafetyStatus, SafetyStatusFile};
use crate::utility::sleep_interruptible;

// Step of the wait between two samples in second.
const SAMPLE_GRANULARITY: f64 = 0.5;

/// Source of the backup-power battery capacity.
pub trait BatterySource {
    /// Get the battery capacity.
    ///
    /// # Returns
    /// Capacity in percent.
    fn get_battery_capacity(&mut self) -> Result<f64, ControlError>;
}

impl BatterySource for Ups {
    fn get_battery_capacity(&mut self) -> Result<f64, ControlError> {
        Ok(Ups::get_battery_capacity(self)?)
    }
}

/// Hardware actions of the emergency shutdown.
pub trait ShutdownSequence {
    fn gripper_home(&mut self) -> Result<(), ControlError>;

    /// Power-cycle the gripper controller.
    fn gripper_reboot(&mut self) -> Result<(), ControlError>;

    /// Brake the rotor.
    fn rotation_stop(&mut self) -> Result<(), ControlError>;

    /// Disable the drive output.
    fn rotation_off(&mut self) -> Result<(), ControlError>;

    fn cold_grip(&mut self) -> Result<(), ControlError>;

    /// De-energize the bias power supplies.
    fn bias_off(&mut self) -> Result<(), ControlError>;
}

/// Watch the battery capacity of the UPS and shut the CHWP down in order
/// before the backup power is exhausted.
pub struct SafetySupervisor {
    _status: SafetyStatusFile,
    _config: ConfigSafety,
}

impl SafetySupervisor {
    /// Create a new safety supervisor.
    ///
    /// # Arguments
    /// * `status` - Safety status record.
    /// * `config` - Safety settings.
    ///
    /// # Returns
    /// A new safety supervisor.
    pub fn new(status: SafetyStatusFile, config: &ConfigSafety) -> Self {
        Self {
            _status: status,
            _config: config.clone(),
        }
    }

    /// Run the monitoring loop until the shutdown finishes, a controlling
    /// process requests to stop, or the process is signaled.
    ///
    /// # Arguments
    /// * `battery` - Battery source.
    /// * `actions` - Shutdown actions.
    /// * `stop` - Set by the signal handler.
    ///
    /// # Returns
    /// True if the emergency shutdown was executed.
    pub fn monitor(
        &mut self,
        battery: &mut dyn BatterySource,
        actions: &mut dyn ShutdownSequence,
        stop: &AtomicBool,
    ) -> Result<bool, ControlError> {
        self._status.write(&SafetyStatus::RUNNING)?;
        info!(
            "Emergency monitor is running with the threshold {}%.",
            self._config.battery_threshold
        );

        let mut is_shutdown = false;
        loop {
            match self._status.read() {
                Ok(None) => {
                    warn!("Safety status record is missing. Stop monitoring.");
                    break;
                }
                Ok(Some(status)) if status.state() != SafetyState::Running => {
                    info!("Stop of the emergency monitor is requested.");
                    break;
                }
                Ok(Some(_)) => {}
                Err(error) => error!("Failed to read the safety status record: {error}"),
            }

            match battery.get_battery_capacity() {
                Ok(capacity) if capacity > self._config.battery_threshold => {
                    debug!("Battery capacity is {capacity}%.");
                }
                Ok(capacity) => {
                    warn!("Battery capacity is {capacity}%. Begin the emergency shutdown.");

                    if let Err(error) = self._status.write(&SafetyStatus::STOP_REQUESTED) {
                        error!("Failed to record the stop request: {error}");
                    }
                    self.shutdown(actions);
                    is_shutdown = true;

                    break;
                }
                Err(error) => error!("Failed to read the battery capacity: {error}"),
            }

            if !sleep_interruptible(self._config.monitor_period, SAMPLE_GRANULARITY, stop) {
                info!("Emergency monitor is signaled to stop.");
                break;
            }
        }

        if let Err(error) = self._status.write(&SafetyStatus::STOPPED) {
            error!("Failed to record the stop of the emergency monitor: {error}");
        }
        info!("Emergency monitor is stopped.");

        Ok(is_shutdown)
    }

    /// Shut the hardware down in order. A failed step is logged and does not
    /// abort the sequence.
    ///
    /// # Arguments
    /// * `actions` - Shutdown actions.
    pub fn shutdown(&self, actions: &mut dyn ShutdownSequence) {
        // Gripper.
        if let Err(error) = actions.gripper_home() {
            error!("Failed to home the gripper: {error}. Reboot and retry.");

            Self::log_step("Gripper reboot", actions.gripper_reboot());
            Self::log_step("Gripper home", actions.gripper_home());
        } else {
            info!("Gripper is homed.");
        }

        // Rotation.
        if let Err(error) = actions.rotation_stop() {
            error!("Failed to stop the rotation: {error}. Turn off the drive and coast down.");

            Self::log_step("Rotation off", actions.rotation_off());
            self.wait("coast down", self._config.stop_failure_wait);
        } else {
            info!("Rotation is stopped.");
        }

        self.wait("quiescence", self._config.quiescence_time);

        Self::log_step("Cold grip", actions.cold_grip());
        Self::log_step("Bias off", actions.bias_off());

        warn!("Emergency shutdown is done.");
    }

    fn log_step(name: &str, result: Result<(), ControlError>) {
        match result {
            Ok(()) => info!("{name} is done."),
            Err(error) => error!("{name} failed: {error}"),
        }
    }

    fn wait(&self, name: &str, duration: f64) {
        if duration > 0.0 {
            info!("Wait {duration} s for the {name}.");
            sleep(Duration::from_secs_f64(duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{create_dir, remove_dir_all, write};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};

    use crate::config::get_test_config;

    /// Battery with the scripted readings. The state of the record at each
    /// reading is kept.
    struct FakeBattery {
        readings: Vec<f64>,
        states: Vec<Option<SafetyState>>,
        status: SafetyStatusFile,
    }

    impl BatterySource for FakeBattery {
        fn get_battery_capacity(&mut self) -> Result<f64, ControlError> {
            self.states.push(self.status.read().unwrap().map(|x| x.state()));

            let idx = (self.states.len() - 1).min(self.readings.len() - 1);
            Ok(self.readings[idx])
        }
    }

    /// Shutdown actions that record the calls.
    #[derive(Default)]
    struct FakeActions {
        calls: Arc<Mutex<Vec<&'static str>>>,
        failures: Vec<&'static str>,
        // Fail only the first call of the action.
        failures_once: Vec<&'static str>,
    }

    impl FakeActions {
        fn call(&mut self, name: &'static str) -> Result<(), ControlError> {
            self.calls.lock().unwrap().push(name);

            if let Some(idx) = self.failures_once.iter().position(|x| *x == name) {
                self.failures_once.remove(idx);
                return Err(ControlError::InvalidArgument(String::from(name)));
            }

            if self.failures.contains(&name) {
                Err(ControlError::Timeout {
                    operation: String::from(name),
                    seconds: 0.0,
                })
            } else {
                Ok(())
            }
        }
    }

    impl ShutdownSequence for FakeActions {
        fn gripper_home(&mut self) -> Result<(), ControlError> {
            self.call("gripper_home")
        }

        fn gripper_reboot(&mut self) -> Result<(), ControlError> {
            self.call("gripper_reboot")
        }

        fn rotation_stop(&mut self) -> Result<(), ControlError> {
            self.call("rotation_stop")
        }

        fn rotation_off(&mut self) -> Result<(), ControlError> {
            self.call("rotation_off")
        }

        fn cold_grip(&mut self) -> Result<(), ControlError> {
            self.call("cold_grip")
        }

        fn bias_off(&mut self) -> Result<(), ControlError> {
            self.call("bias_off")
        }
    }

    fn create_supervisor(readings: &[f64]) -> (SafetySupervisor, FakeBattery, TempDir) {
        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());

        let battery = FakeBattery {
            readings: readings.to_vec(),
            states: Vec::new(),
            status: SafetyStatusFile::new(&config.status_file),
        };

        (
            SafetySupervisor::new(SafetyStatusFile::new(&config.status_file), &config.safety),
            battery,
            directory,
        )
    }

    #[test]
    fn test_monitor_battery_low() {
        let (mut supervisor, mut battery, _directory) =
            create_supervisor(&[95.0, 90.0, 85.0, 78.0, 70.0]);
        let mut actions = FakeActions::default();

        assert!(supervisor
            .monitor(&mut battery, &mut actions, &AtomicBool::new(false))
            .unwrap());

        // Running for the first three samples and the shutdown begins at the
        // fourth one.
        assert_eq!(battery.states, vec![Some(SafetyState::Running); 4]);
        assert_eq!(
            *actions.calls.lock().unwrap(),
            vec!["gripper_home", "rotation_stop", "cold_grip", "bias_off"]
        );
        assert_eq!(
            supervisor._status.read().unwrap(),
            Some(SafetyStatus::STOPPED)
        );
    }

    #[test]
    fn test_monitor_threshold_is_exclusive() {
        let (mut supervisor, mut battery, _directory) = create_supervisor(&[81.0, 80.0]);
        let mut actions = FakeActions::default();

        supervisor
            .monitor(&mut battery, &mut actions, &AtomicBool::new(false))
            .unwrap();

        assert_eq!(battery.states.len(), 2);
    }

    #[test]
    fn test_monitor_stop_requested() {
        let (mut supervisor, mut battery, _directory) = create_supervisor(&[95.0]);
        let mut actions = FakeActions::default();

        let status = SafetyStatusFile::new(supervisor._status.path());
        let stop = AtomicBool::new(false);

        // Request to stop from another process after a few samples.
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while request_stop_when_running(&status) {
                    std::thread::yield_now();
                }
            });

            assert!(!supervisor.monitor(&mut battery, &mut actions, &stop).unwrap());
        });

        assert!(actions.calls.lock().unwrap().is_empty());
        assert_eq!(status.read().unwrap(), Some(SafetyStatus::STOPPED));
    }

    /// Write the stop request once the monitor is running.
    ///
    /// # Returns
    /// True if the monitor is not running yet.
    fn request_stop_when_running(status: &SafetyStatusFile) -> bool {
        match status.read() {
            Ok(Some(record)) if record == SafetyStatus::RUNNING => {
                status.write(&SafetyStatus::STOP_REQUESTED).unwrap();
                false
            }
            _ => true,
        }
    }

    #[test]
    fn test_monitor_signaled() {
        let (mut supervisor, mut battery, _directory) = create_supervisor(&[95.0]);
        supervisor._config.monitor_period = 10.0;

        let mut actions = FakeActions::default();
        let stop = AtomicBool::new(true);

        assert!(!supervisor.monitor(&mut battery, &mut actions, &stop).unwrap());

        assert_eq!(battery.states.len(), 1);
        assert_eq!(
            supervisor._status.read().unwrap(),
            Some(SafetyStatus::STOPPED)
        );
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn test_monitor_battery_read_fail() {
        struct BrokenBattery {
            count: usize,
        }

        impl BatterySource for BrokenBattery {
            fn get_battery_capacity(&mut self) -> Result<f64, ControlError> {
                self.count += 1;
                if self.count < 3 {
                    Err(ControlError::InvalidArgument(String::from("broken")))
                } else {
                    Ok(10.0)
                }
            }
        }

        let (mut supervisor, _, _directory) = create_supervisor(&[95.0]);
        let mut battery = BrokenBattery { count: 0 };
        let mut actions = FakeActions::default();

        assert!(supervisor
            .monitor(&mut battery, &mut actions, &AtomicBool::new(false))
            .unwrap());
        assert_eq!(battery.count, 3);
    }

    #[test]
    fn test_monitor_record_lost_during_shutdown() {
        /// Battery that removes the directory of the record before reporting
        /// the low capacity.
        struct RecordRemovingBattery {
            directory: PathBuf,
        }

        impl BatterySource for RecordRemovingBattery {
            fn get_battery_capacity(&mut self) -> Result<f64, ControlError> {
                remove_dir_all(&self.directory).unwrap();
                Ok(50.0)
            }
        }

        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());

        let record_directory = directory.path().join("record");
        create_dir(&record_directory).unwrap();

        let mut supervisor = SafetySupervisor::new(
            SafetyStatusFile::new(&record_directory.join("status.json")),
            &config.safety,
        );
        let mut battery = RecordRemovingBattery {
            directory: record_directory.clone(),
        };
        let mut actions = FakeActions::default();

        assert!(supervisor
            .monitor(&mut battery, &mut actions, &AtomicBool::new(false))
            .unwrap());
        assert_eq!(
            *actions.calls.lock().unwrap(),
            vec!["gripper_home", "rotation_stop", "cold_grip", "bias_off"]
        );
    }

    #[test]
    fn test_monitor_record_unreadable() {
        let (mut supervisor, _, _directory) = create_supervisor(&[95.0]);
        let path = supervisor._status.path().to_path_buf();

        /// Battery that corrupts the record at the first reading and reports
        /// the low capacity at the second one.
        struct CorruptingBattery {
            path: PathBuf,
            count: usize,
        }

        impl BatterySource for CorruptingBattery {
            fn get_battery_capacity(&mut self) -> Result<f64, ControlError> {
                self.count += 1;
                if self.count == 1 {
                    write(&self.path, "{broken").unwrap();
                    Ok(95.0)
                } else {
                    Ok(10.0)
                }
            }
        }

        let mut battery = CorruptingBattery { path: path, count: 0 };
        let mut actions = FakeActions::default();

        assert!(supervisor
            .monitor(&mut battery, &mut actions, &AtomicBool::new(false))
            .unwrap());
        assert_eq!(battery.count, 2);
        assert_eq!(
            supervisor._status.read().unwrap(),
            Some(SafetyStatus::STOPPED)
        );
    }

    #[test]
    fn test_shutdown_gripper_retry() {
        let (supervisor, _, _directory) = create_supervisor(&[95.0]);
        let mut actions = FakeActions {
            failures_once: vec!["gripper_home"],
            ..Default::default()
        };

        supervisor.shutdown(&mut actions);

        assert_eq!(
            *actions.calls.lock().unwrap(),
            vec![
                "gripper_home",
                "gripper_reboot",
                "gripper_home",
                "rotation_stop",
                "cold_grip",
                "bias_off"
            ]
        );
    }

    #[test]
    fn test_shutdown_rotation_stop_fail() {
        let (supervisor, _, _directory) = create_supervisor(&[95.0]);
        let mut actions = FakeActions {
            failures: vec!["gripper_home", "rotation_stop", "cold_grip"],
            ..Default::default()
        };

        supervisor.shutdown(&mut actions);

        // Every step is tried and the gripper is retried only once.
        assert_eq!(
            *actions.calls.lock().unwrap(),
            vec![
                "gripper_home",
                "gripper_reboot",
                "gripper_home",
                "rotation_stop",
                "rotation_off",
                "cold_grip",
                "bias_off"
            ]
        );
    }
}
