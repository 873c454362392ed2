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

use crate::error::ControlError;
use crate::orchestrator::supervised_task::{SupervisedTask, TaskSpawner, TaskSpec};

/// Start and stop the named helper tasks such as the telemetry publishers
/// and the safety monitor. A crashed task is only noticed when the
/// orchestrator looks at it again.
pub struct ProcessOrchestrator {
    _spawner: Box<dyn TaskSpawner>,
    // Tracked tasks by name.
    _tasks: BTreeMap<String, Box<dyn SupervisedTask>>,
}

impl ProcessOrchestrator {
    pub fn new(spawner: Box<dyn TaskSpawner>) -> Self {
        Self {
            _spawner: spawner,
            _tasks: BTreeMap::new(),
        }
    }

    /// Start a task. Nothing happens if it is already running.
    ///
    /// # Arguments
    /// * `spec` - Task.
    ///
    /// # Returns
    /// True if a new task is started.
    pub fn start(&mut self, spec: &TaskSpec) -> Result<bool, ControlError> {
        if let Some(task) = self._tasks.get_mut(&spec.name) {
            if task.is_alive() {
                info!("{} is already running (id: {}).", spec.name, task.id());
                return Ok(false);
            }

            warn!("{} exited without being stopped. Start it again.", spec.name);
            self._tasks.remove(&spec.name);
        }

        let task = self._spawner.spawn(spec)?;
        info!("{} is started (id: {}).", spec.name, task.id());

        self._tasks.insert(spec.name.clone(), task);

        Ok(true)
    }

    /// Stop a task forcibly.
    ///
    /// # Arguments
    /// * `name` - Name of the task.
    ///
    /// # Returns
    /// True if the task was tracked.
    pub fn stop(&mut self, name: &str) -> Result<bool, ControlError> {
        match self._tasks.remove(name) {
            Some(mut task) => {
                task.terminate()?;
                info!("{name} is stopped.");

                Ok(true)
            }
            None => {
                info!("{name} is not running.");

                Ok(false)
            }
        }
    }

    /// Stop all the tasks forcibly. Failures are logged and the table is
    /// cleared anyway.
    pub fn stop_all(&mut self) {
        for (name, mut task) in std::mem::take(&mut self._tasks) {
            match task.terminate() {
                Ok(()) => info!("{name} is stopped."),
                Err(error) => error!("Failed to stop {name}: {error}"),
            }
        }
    }

    /// Is the task running or not.
    ///
    /// # Arguments
    /// * `name` - Name of the task.
    ///
    /// # Returns
    /// None if the task is not tracked.
    pub fn is_running(&mut self, name: &str) -> Option<bool> {
        self._tasks.get_mut(name).map(|task| task.is_alive())
    }

    /// Get the names of the tracked tasks.
    pub fn names(&self) -> Vec<String> {
        self._tasks.keys().cloned().collect()
    }

    /// Run a short task to the completion.
    ///
    /// # Arguments
    /// * `spec` - Task.
    pub fn run(&mut self, spec: &TaskSpec) -> Result<(), ControlError> {
        info!("Run {}: {} {}.", spec.name, spec.program, spec.args.join(" "));

        self._spawner.run(spec)
    }
}

/// In-memory tasks and spawner for the tests.
#[cfg(test)]
pub mod fake {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    pub struct FakeTask {
        pub id: u32,
        pub is_alive: Arc<AtomicBool>,
    }

    impl SupervisedTask for FakeTask {
        fn id(&self) -> u32 {
            self.id
        }

        fn is_alive(&mut self) -> bool {
            self.is_alive.load(Ordering::Relaxed)
        }

        fn terminate(&mut self) -> Result<(), ControlError> {
            self.is_alive.store(false, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Spawner that records the tasks and shares their liveness flags.
    #[derive(Clone, Default)]
    pub struct FakeSpawner {
        pub spawned: Arc<Mutex<Vec<(TaskSpec, Arc<AtomicBool>)>>>,
        pub ran: Arc<Mutex<Vec<TaskSpec>>>,
        pub fail: Arc<AtomicBool>,
        _count: Arc<AtomicU32>,
    }

    impl FakeSpawner {
        /// Get the liveness flag of the latest task with the name.
        pub fn get_liveness(&self, name: &str) -> Option<Arc<AtomicBool>> {
            self.spawned
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(spec, _)| spec.name == name)
                .map(|(_, is_alive)| is_alive.clone())
        }
    }

    impl TaskSpawner for FakeSpawner {
        fn spawn(&mut self, spec: &TaskSpec) -> Result<Box<dyn SupervisedTask>, ControlError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(ControlError::Process {
                    name: spec.name.clone(),
                    reason: String::from("fake failure"),
                });
            }

            let is_alive = Arc::new(AtomicBool::new(true));
            self.spawned
                .lock()
                .unwrap()
                .push((spec.clone(), is_alive.clone()));

            Ok(Box::new(FakeTask {
                id: self._count.fetch_add(1, Ordering::Relaxed) + 1,
                is_alive: is_alive,
            }))
        }

        fn run(&mut self, spec: &TaskSpec) -> Result<(), ControlError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(ControlError::Process {
                    name: spec.name.clone(),
                    reason: String::from("fake failure"),
                });
            }

            self.ran.lock().unwrap().push(spec.clone());
            Ok(())
        }
    }
}
