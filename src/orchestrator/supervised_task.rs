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

use log::debug;
use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

use crate::error::ControlError;

/// How to launch a helper task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    // Unique name used by the orchestrator to track the task.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl TaskSpec {
    pub fn new(name: &str, program: &str, args: &[String]) -> Self {
        Self {
            name: String::from(name),
            program: String::from(program),
            args: args.to_vec(),
        }
    }
}

/// Long-running helper task under the supervision of the orchestrator.
pub trait SupervisedTask: Send {
    /// Identifier of the task such as the process ID.
    fn id(&self) -> u32;

    /// Is the task still running or not.
    fn is_alive(&mut self) -> bool;

    /// Terminate the task forcibly and reap it.
    fn terminate(&mut self) -> Result<(), ControlError>;
}

/// Launcher of the helper tasks.
pub trait TaskSpawner {
    /// Start a long-running task.
    ///
    /// # Arguments
    /// * `spec` - Task.
    ///
    /// # Returns
    /// Handle of the task.
    fn spawn(&mut self, spec: &TaskSpec) -> Result<Box<dyn SupervisedTask>, ControlError>;

    /// Run a task to the completion.
    ///
    /// # Arguments
    /// * `spec` - Task.
    fn run(&mut self, spec: &TaskSpec) -> Result<(), ControlError>;
}

/// Helper task backed by an OS process.
pub struct ProcessTask {
    _name: String,
    _child: Child,
}

impl SupervisedTask for ProcessTask {
    fn id(&self) -> u32 {
        self._child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self._child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> Result<(), ControlError> {
        match self._child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(error) if error.kind() == ErrorKind::InvalidInput => {}
            Err(error) => {
                return Err(ControlError::Process {
                    name: self._name.clone(),
                    reason: error.to_string(),
                })
            }
        }

        let status = self._child.wait().map_err(|error| ControlError::Process {
            name: self._name.clone(),
            reason: error.to_string(),
        })?;
        debug!("Process {} exited with {status}.", self._name);

        Ok(())
    }
}

/// Spawner of the OS processes.
pub struct ProcessSpawner;

impl ProcessSpawner {
    fn create_command(spec: &TaskSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        command
    }
}

impl TaskSpawner for ProcessSpawner {
    fn spawn(&mut self, spec: &TaskSpec) -> Result<Box<dyn SupervisedTask>, ControlError> {
        // Own process group, so the Ctrl-C at the terminal of the shell does
        // not reach the helper.
        let child = Self::create_command(spec)
            .process_group(0)
            .spawn()
            .map_err(|error| ControlError::Process {
                name: spec.name.clone(),
                reason: format!("can not spawn {}: {error}", spec.program),
            })?;

        Ok(Box::new(ProcessTask {
            _name: spec.name.clone(),
            _child: child,
        }))
    }

    fn run(&mut self, spec: &TaskSpec) -> Result<(), ControlError> {
        let status = Self::create_command(spec)
            .status()
            .map_err(|error| ControlError::Process {
                name: spec.name.clone(),
                reason: format!("can not run {}: {error}", spec.program),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ControlError::Process {
                name: spec.name.clone(),
                reason: format!("{} exited with {status}", spec.program),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nix::unistd::{getpgid, Pid};

    #[test]
    fn test_process_task() {
        let mut spawner = ProcessSpawner;
        let mut task = spawner
            .spawn(&TaskSpec::new("sleeper", "sleep", &[String::from("30")]))
            .unwrap();

        assert!(task.id() > 0);
        assert!(task.is_alive());

        task.terminate().unwrap();
        assert!(!task.is_alive());

        // Terminating twice is fine.
        task.terminate().unwrap();
    }

    #[test]
    fn test_process_task_own_group() {
        let mut spawner = ProcessSpawner;
        let mut task = spawner
            .spawn(&TaskSpec::new("sleeper", "sleep", &[String::from("30")]))
            .unwrap();

        let pid = Pid::from_raw(task.id() as i32);
        let group = getpgid(Some(pid)).unwrap();

        assert_eq!(group, pid);
        assert_ne!(group, getpgid(None).unwrap());

        task.terminate().unwrap();
    }

    #[test]
    fn test_spawn_fail() {
        let mut spawner = ProcessSpawner;

        assert!(matches!(
            spawner.spawn(&TaskSpec::new("bad", "/no/such/program", &[])),
            Err(ControlError::Process { .. })
        ));
    }

    #[test]
    fn test_run() {
        let mut spawner = ProcessSpawner;

        spawner.run(&TaskSpec::new("true", "true", &[])).unwrap();
        assert!(matches!(
            spawner.run(&TaskSpec::new("false", "false", &[])),
            Err(ControlError::Process { .. })
        ));
    }
}
