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

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use crate::channel::gateway::create_gateway;
use crate::config::{Config, ConfigGripper};
use crate::constants::NUM_GRIPPER_AXIS;
use crate::device::cyberswitch::Cyberswitch;
use crate::device::gripper::Gripper;
use crate::enums::{ChannelId, PowerStatus};
use crate::error::{ChannelError, ControlError};
use crate::grip::position_record::PositionRecord;
use crate::mock::mock_plant::MockPlant;
use crate::utility::sleep_interruptible;

// Names of the recorded poses.
pub const POSE_WARM_CENTERED: &str = "Warm_Centered";
pub const POSE_COOLDOWN_FINISH: &str = "Cooldown_Finish";
pub const POSE_COLD_UNGRIP: &str = "Cold_Ungrip";

/// Grip and ungrip the rotor with the three gripper axes.
pub struct GripperController {
    _gripper: Gripper,
    // Powers the gripper controller.
    _cyberswitch: Cyberswitch,
    _record: PositionRecord,
    _config: ConfigGripper,
    // Wait between the power off and on of a reboot in second.
    _reboot_wait: f64,
    // Set by the user to cancel the blocking loops.
    _interrupt: Arc<AtomicBool>,
}

impl GripperController {
    /// Create a new gripper controller.
    ///
    /// # Arguments
    /// * `gripper` - Gripper.
    /// * `cyberswitch` - Cyberswitch.
    /// * `record` - Record of the gripper poses.
    /// * `config` - Gripper settings.
    /// * `reboot_wait` - Wait of the reboot in second.
    /// * `interrupt` - User interrupt.
    ///
    /// # Returns
    /// A new gripper controller.
    pub fn new(
        gripper: Gripper,
        cyberswitch: Cyberswitch,
        record: PositionRecord,
        config: &ConfigGripper,
        reboot_wait: f64,
        interrupt: &Arc<AtomicBool>,
    ) -> Self {
        Self {
            _gripper: gripper,
            _cyberswitch: cyberswitch,
            _record: record,
            _config: config.clone(),
            _reboot_wait: reboot_wait,
            _interrupt: interrupt.clone(),
        }
    }

    /// Create a new gripper controller from the configuration.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    /// * `plant` - Mock plant in the simulation mode.
    /// * `interrupt` - User interrupt.
    ///
    /// # Returns
    /// A new gripper controller.
    pub fn from_config(
        config: &Config,
        plant: Option<&Arc<Mutex<MockPlant>>>,
        interrupt: &Arc<AtomicBool>,
    ) -> Self {
        Self::new(
            Gripper::new(create_gateway(config, ChannelId::Gripper, plant)),
            Cyberswitch::new(create_gateway(config, ChannelId::Cyberswitch, plant)),
            PositionRecord::new(&config.position_file),
            &config.gripper,
            config.safety.reboot_wait,
            interrupt,
        )
    }

    /// Center the rotor at the room temperature by squeezing it with the
    /// small increment.
    ///
    /// # Arguments
    /// * `position` - Position of each axis to record as the warm centered
    /// pose in mm.
    pub fn warm_grip(&mut self, position: &[f64; NUM_GRIPPER_AXIS]) -> Result<(), ControlError> {
        self._interrupt.store(false, Ordering::Relaxed);

        let result = self
            .squeeze(self._config.warm_increment)
            .and_then(|_| self._record.append(POSE_WARM_CENTERED, position));

        self.finish("Warm grip", result)
    }

    /// Keep the rotor gripped during the cooldown. The gripper squeezes again
    /// at every interval until the user interrupts.
    pub fn cooldown_grip(&mut self) -> Result<(), ControlError> {
        self._interrupt.store(false, Ordering::Relaxed);
        info!("Cooldown grip begins. Interrupt to finish.");

        let mut count = 0;
        let result = loop {
            match self.squeeze(self._config.warm_increment) {
                Ok(_) => {}
                Err(ControlError::UserCancelled { .. }) => break Ok(()),
                Err(error) => break Err(error),
            }

            count += 1;
            info!("Cooldown regrip {count} is done.");

            if !sleep_interruptible(
                self._config.regrip_interval,
                self._config.sleep_granularity,
                &self._interrupt,
            ) {
                break Ok(());
            }
        };

        let result = result.and_then(|_| {
            let position = self.get_position()?;
            self._record.append(POSE_COOLDOWN_FINISH, &position)
        });

        self.finish("Cooldown grip", result)
    }

    /// Grip the rotor at the cryogenic temperature. The gripper squeezes with
    /// the large increment and then backs off each axis.
    pub fn cold_grip(&mut self) -> Result<(), ControlError> {
        self._interrupt.store(false, Ordering::Relaxed);

        let result = self.squeeze(self._config.cold_increment).and_then(|_| {
            for axis in 1..=NUM_GRIPPER_AXIS {
                self._gripper.move_axis(axis, self._config.cold_backoff)?;
            }

            Ok(())
        });

        self.finish("Cold grip", result)
    }

    /// Release the rotor at the cryogenic temperature.
    ///
    /// # Arguments
    /// * `position` - Position of each axis to record as the cold ungrip pose
    /// in mm.
    pub fn cold_ungrip(&mut self, position: &[f64; NUM_GRIPPER_AXIS]) -> Result<(), ControlError> {
        let result = self
            ._record
            .append(POSE_COLD_UNGRIP, position)
            .and_then(|_| Ok(self._gripper.home()?));

        self.finish("Cold ungrip", result)
    }

    /// Move the gripper to the home position.
    pub fn home(&mut self) -> Result<(), ControlError> {
        let result = self._gripper.home().map_err(ControlError::from);

        self.finish("Gripper home", result)
    }

    /// Engage or release the brake.
    ///
    /// # Arguments
    /// * `status` - On to engage the brake.
    pub fn set_brake(&mut self, status: PowerStatus) -> Result<(), ControlError> {
        self._gripper.set_brake(status)?;
        info!("Gripper brake is {}.", status.as_ref());

        Ok(())
    }

    /// Get the alarm.
    ///
    /// # Returns
    /// True if any axis alarms.
    pub fn get_alarm(&mut self) -> Result<bool, ControlError> {
        Ok(self._gripper.get_alarm()?)
    }

    /// Reset the alarm.
    pub fn reset(&mut self) -> Result<(), ControlError> {
        Ok(self._gripper.reset()?)
    }

    /// Power-cycle the gripper controller through the cyberswitch.
    pub fn reboot(&mut self) -> Result<(), ControlError> {
        warn!("Rebooting the gripper controller.");

        self._cyberswitch.set_all(PowerStatus::Off)?;
        sleep(Duration::from_secs_f64(self._reboot_wait.max(0.0)));
        self._cyberswitch.set_all(PowerStatus::On)?;

        info!("Gripper controller is rebooted.");

        Ok(())
    }

    /// Record a pose.
    ///
    /// # Arguments
    /// * `name` - Name of the pose.
    /// * `position` - Position of each axis in mm.
    pub fn record_position(
        &mut self,
        name: &str,
        position: &[f64; NUM_GRIPPER_AXIS],
    ) -> Result<(), ControlError> {
        if name.is_empty() || name.contains(',') {
            return Err(ControlError::InvalidArgument(format!(
                "pose name should be non-empty without the comma instead of '{name}'"
            )));
        }

        self._record.append(name, position)
    }

    /// Get the recorded poses.
    ///
    /// # Returns
    /// Position of each pose by name.
    pub fn get_recorded_positions(
        &self,
    ) -> Result<BTreeMap<String, [f64; NUM_GRIPPER_AXIS]>, ControlError> {
        self._record.read()
    }

    /// Get the status of the gripper.
    ///
    /// # Returns
    /// Status values by name.
    pub fn get_status(&mut self) -> Result<BTreeMap<String, f64>, ControlError> {
        Ok(self._gripper.get_status()?)
    }

    /// Get the current position of each axis.
    ///
    /// # Returns
    /// Position in mm.
    pub fn get_position(&mut self) -> Result<[f64; NUM_GRIPPER_AXIS], ControlError> {
        let status = self._gripper.get_status()?;

        let mut position = [0.0; NUM_GRIPPER_AXIS];
        for (idx, value) in position.iter_mut().enumerate() {
            let key = format!("pos{}", idx + 1);
            *value = *status.get(&key).ok_or_else(|| {
                ChannelError::protocol(self._gripper.name(), &key, "missing axis position")
            })?;
        }

        Ok(position)
    }

    /// Push every axis with the increment until all of them touch the rotor.
    ///
    /// # Arguments
    /// * `increment` - Increment in mm.
    ///
    /// # Returns
    /// Number of the steps.
    fn squeeze(&mut self, increment: f64) -> Result<usize, ControlError> {
        let mut is_finished = [false; NUM_GRIPPER_AXIS];

        for step in 1..=self._config.max_squeeze_steps {
            if self._interrupt.load(Ordering::Relaxed) {
                return Err(ControlError::UserCancelled {
                    operation: String::from("Squeeze"),
                });
            }

            for axis in 0..NUM_GRIPPER_AXIS {
                if is_finished[axis] {
                    continue;
                }

                if self._gripper.push(axis + 1, increment)? {
                    self._gripper.reset()?;
                    is_finished[axis] = true;

                    info!("Gripper axis {} touches the rotor.", axis + 1);
                }
            }

            if is_finished.iter().all(|x| *x) {
                return Ok(step);
            }
        }

        Err(ControlError::StepLimit {
            operation: String::from("Squeeze"),
            steps: self._config.max_squeeze_steps,
        })
    }

    /// Turn the motors off whether or not the operation succeeded.
    ///
    /// # Arguments
    /// * `operation` - Name of the operation.
    /// * `result` - Result of the operation.
    ///
    /// # Returns
    /// Result of the operation, or the error of the motors off.
    fn finish(
        &mut self,
        operation: &str,
        result: Result<(), ControlError>,
    ) -> Result<(), ControlError> {
        let result_off = self._gripper.motors_off();

        match result {
            Ok(()) => {
                result_off?;
                info!("{operation} is done.");

                Ok(())
            }
            Err(error) => {
                error!("{operation} failed: {error}");
                if let Err(error_off) = result_off {
                    warn!("Failed to turn off the gripper motors: {error_off}");
                }

                Err(error)
            }
        }
    }
}
