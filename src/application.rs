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
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag::register,
};
use std::io::{stdin, stdout, BufRead, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::command::command_schema::CommandSchema;
use crate::config::Config;
use crate::enums::{CommandStatus, TelemetryDevice};
use crate::mock::mock_plant::MockPlant;
use crate::model::{Model, RoleLauncher};
use crate::orchestrator::supervised_task::ProcessSpawner;
use crate::safety::safety_status::SafetyStatusFile;
use crate::safety::safety_supervisor::SafetySupervisor;
use crate::telemetry::publisher::Publisher;
use crate::telemetry::telemetry_sink::TcpTelemetrySink;
use crate::telemetry::telemetry_source::create_telemetry_source;

const PROMPT: &str = "CHWP command ('help' for help): ";

/// Register the signals that set the flag.
///
/// # Arguments
/// * `signals` - Signals.
/// * `flag` - Flag to set.
fn register_signals(signals: &[i32], flag: &Arc<AtomicBool>) {
    for signal in signals.iter() {
        if let Err(error) = register(*signal, flag.clone()) {
            error!("Failed to register the signal {signal}: {error}");
        }
    }
}

/// Register the signals of the emergency monitor. Only SIGTERM stops it.
/// SIGINT is swallowed, so a Ctrl-C at the terminal does not end the
/// monitoring.
///
/// # Arguments
/// * `stop` - Flag set by SIGTERM.
fn register_monitor_signals(stop: &Arc<AtomicBool>) {
    register_signals(&[SIGTERM], stop);
    register_signals(&[SIGINT], &Arc::new(AtomicBool::new(false)));
}

/// Create the simulated plant in the simulation mode.
///
/// # Arguments
/// * `is_simulation_mode` - Is the simulation mode or not.
///
/// # Returns
/// Mock plant, or None to use the hardware.
fn create_plant(is_simulation_mode: bool) -> Option<Arc<Mutex<MockPlant>>> {
    if is_simulation_mode {
        info!("Run in the simulation mode.");
        Some(Arc::new(Mutex::new(MockPlant::new())))
    } else {
        info!("Run in the hardware mode.");
        None
    }
}

/// Create the model of a role that can launch the other roles.
///
/// # Arguments
/// * `config_file` - Parameter file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `log_level` - Log level passed to the helper processes.
/// * `interrupt` - User interrupt.
///
/// # Returns
/// Model, or None if this executable cannot be located.
fn create_model(
    config_file: &Path,
    is_simulation_mode: bool,
    log_level: u32,
    interrupt: &Arc<AtomicBool>,
) -> Option<Model> {
    let launcher = match RoleLauncher::from_current_exe(
        &config_file.to_string_lossy(),
        is_simulation_mode,
        log_level,
    ) {
        Ok(launcher) => launcher,
        Err(error) => {
            error!("{error}");
            return None;
        }
    };

    Some(Model::new(
        Config::new(config_file),
        create_plant(is_simulation_mode),
        interrupt,
        Box::new(ProcessSpawner),
        launcher,
    ))
}

/// Execute one line in the shell.
///
/// # Arguments
/// * `schema` - Command schema.
/// * `line` - Command line.
/// * `model` - Model.
///
/// # Returns
/// False if the user leaves the shell.
fn execute_line(schema: &CommandSchema, line: &str, model: &mut Model) -> bool {
    match line.trim() {
        "" => {}
        "exit" => return false,
        "help" => println!("{}\nhelp\nexit", schema.help()),
        line => {
            let status = schema.execute(line, model);
            println!("{}", status.as_ref());
        }
    }

    true
}

/// Run the interactive shell.
///
/// # Arguments
/// * `config_file` - Parameter file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `log_level` - Log level.
pub fn run_shell(config_file: &Path, is_simulation_mode: bool, log_level: u32) {
    // Ctrl-C cancels the running command instead of the shell.
    let interrupt = Arc::new(AtomicBool::new(false));
    register_signals(&[SIGINT, SIGTERM], &interrupt);

    let stop = Arc::new(AtomicBool::new(false));
    register_signals(&[SIGTERM], &stop);

    let Some(mut model) = create_model(config_file, is_simulation_mode, log_level, &interrupt)
    else {
        return;
    };
    let schema = Model::create_command_schema();

    info!("CHWP shell is running.");

    let mut lines = stdin().lock().lines();
    loop {
        print!("{PROMPT}");
        let _ = stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                error!("Failed to read the command: {error}");
                break;
            }
            None => break,
        };

        interrupt.store(false, Ordering::Relaxed);
        if !execute_line(&schema, &line, &mut model) || stop.load(Ordering::Relaxed) {
            break;
        }
    }

    model.shutdown();
    info!("CHWP shell is stopped.");
}

/// Run one shell command. The helper processes it starts keep running.
///
/// # Arguments
/// * `config_file` - Parameter file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `log_level` - Log level.
/// * `line` - Command line.
///
/// # Returns
/// True if the command succeeded.
pub fn run_exec(config_file: &Path, is_simulation_mode: bool, log_level: u32, line: &str) -> bool {
    let interrupt = Arc::new(AtomicBool::new(false));
    register_signals(&[SIGINT, SIGTERM], &interrupt);

    let Some(mut model) = create_model(config_file, is_simulation_mode, log_level, &interrupt)
    else {
        return false;
    };

    Model::create_command_schema().execute(line, &mut model) == CommandStatus::Success
}

/// Run the emergency monitor until the shutdown finishes or a controlling
/// process requests to stop.
///
/// # Arguments
/// * `config_file` - Parameter file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `log_level` - Log level.
///
/// # Returns
/// True if the monitor exited cleanly.
pub fn run_monitor(config_file: &Path, is_simulation_mode: bool, log_level: u32) -> bool {
    let stop = Arc::new(AtomicBool::new(false));
    register_monitor_signals(&stop);

    // The shutdown actions are never cancelled.
    let interrupt = Arc::new(AtomicBool::new(false));
    let Some(mut model) = create_model(config_file, is_simulation_mode, log_level, &interrupt)
    else {
        return false;
    };

    let mut ups = model.create_ups();
    let mut supervisor = SafetySupervisor::new(
        SafetyStatusFile::new(&model.config.status_file),
        &model.config.safety,
    );

    match supervisor.monitor(&mut ups, &mut model, &stop) {
        Ok(is_shutdown) => {
            if is_shutdown {
                info!("Emergency shutdown was executed.");
            }

            true
        }
        Err(error) => {
            error!("Emergency monitor failed: {error}");
            false
        }
    }
}

/// Run the telemetry publisher of a device group.
///
/// # Arguments
/// * `config_file` - Parameter file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `device` - Device group.
pub fn run_publisher(config_file: &Path, is_simulation_mode: bool, device: TelemetryDevice) {
    let stop = Arc::new(AtomicBool::new(false));
    register_signals(&[SIGINT, SIGTERM], &stop);

    let config = Config::new(config_file);
    let plant = create_plant(is_simulation_mode);

    let mut publisher = Publisher::new(
        create_telemetry_source(device, &config, plant.as_ref()),
        Box::new(TcpTelemetrySink::new(&config.telemetry)),
        &config.telemetry,
    );

    publisher.run(&stop);
}
