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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use crate::enums::SafetyState;
use crate::error::ControlError;
use crate::orchestrator::process_orchestrator::ProcessOrchestrator;
use crate::orchestrator::supervised_task::TaskSpec;
use crate::safety::safety_status::{SafetyStatus, SafetyStatusFile};

pub const MONITOR_TASK_NAME: &str = "emergency_monitor";

/// Control of the emergency monitor process from the shell. The shell only
/// requests the stop through the safety status record. The monitor itself
/// confirms it.
pub struct EmergencyMonitor {
    _status: SafetyStatusFile,
    // Interval to poll the record while waiting for the stop in second.
    _stop_poll_interval: f64,
    // Set by the user to cancel the wait.
    _interrupt: Arc<AtomicBool>,
}

impl EmergencyMonitor {
    /// Create a new emergency monitor control.
    ///
    /// # Arguments
    /// * `status` - Safety status record.
    /// * `stop_poll_interval` - Poll interval of the record in second.
    /// * `interrupt` - User interrupt.
    ///
    /// # Returns
    /// A new emergency monitor control.
    pub fn new(
        status: SafetyStatusFile,
        stop_poll_interval: f64,
        interrupt: &Arc<AtomicBool>,
    ) -> Self {
        Self {
            _status: status,
            _stop_poll_interval: stop_poll_interval,
            _interrupt: interrupt.clone(),
        }
    }

    pub fn state(&self) -> Result<SafetyState, ControlError> {
        self._status.state()
    }

    /// Start the monitor process. It is refused if another monitor may be
    /// active.
    ///
    /// # Arguments
    /// * `orchestrator` - Process orchestrator.
    /// * `spec` - Monitor process.
    pub fn start(
        &mut self,
        orchestrator: &mut ProcessOrchestrator,
        spec: &TaskSpec,
    ) -> Result<(), ControlError> {
        match self.state()? {
            SafetyState::Running => {
                error!(
                    "Emergency monitor may be running already. Check it or remove {:?} if it is stale.",
                    self._status.path()
                );
                return Err(ControlError::MonitorRunning);
            }
            SafetyState::StopRequested => {
                error!("Emergency monitor is still stopping.");
                return Err(ControlError::ShutdownInProgress);
            }
            SafetyState::Stopped => {}
        }

        // New session.
        self._status.write(&SafetyStatus::RUNNING)?;

        if let Err(error) = orchestrator.start(spec) {
            if let Err(error_record) = self._status.write(&SafetyStatus::STOPPED) {
                warn!("Failed to reset the safety status record: {error_record}");
            }

            return Err(error);
        }

        info!("Emergency monitor is started.");

        Ok(())
    }

    /// Request the monitor to stop, wait until it confirms, and then
    /// terminate its process.
    ///
    /// # Arguments
    /// * `orchestrator` - Process orchestrator.
    pub fn stop(&mut self, orchestrator: &mut ProcessOrchestrator) -> Result<(), ControlError> {
        match self.state()? {
            SafetyState::Stopped => {
                info!("Emergency monitor is already stopped.");
                return Err(ControlError::MonitorStopped);
            }
            SafetyState::Running => self._status.write(&SafetyStatus::STOP_REQUESTED)?,
            SafetyState::StopRequested => info!("Stop of the emergency monitor is in progress."),
        }

        self._interrupt.store(false, Ordering::Relaxed);
        info!("Waiting for the emergency monitor to stop.");

        let poll_interval = Duration::from_secs_f64(self._stop_poll_interval.max(0.0));
        while self.state()? != SafetyState::Stopped {
            if orchestrator.is_running(MONITOR_TASK_NAME) == Some(false) {
                warn!("Emergency monitor exited without the confirmation.");
                self._status.write(&SafetyStatus::STOPPED)?;
                break;
            }

            if self._interrupt.load(Ordering::Relaxed) {
                return Err(ControlError::UserCancelled {
                    operation: String::from("Waiting for the emergency monitor"),
                });
            }

            sleep(poll_interval);
        }

        orchestrator.stop(MONITOR_TASK_NAME)?;
        info!("Emergency monitor is stopped.");

        Ok(())
    }
}
