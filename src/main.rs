use clap::{value_parser, Arg, ArgAction, Command};
use log::info;
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;

use run_chwp_controller::application;
use run_chwp_controller::enums::TelemetryDevice;

fn main() -> ExitCode {
    // Parse the command line arguments
    let matches = Command::new("chwp controller")
        .about("CHWP rotor control system.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Parameter file")
                .default_value("config/parameters_chwp.yaml"),
        )
        .arg(
            Arg::new("simulate")
                .short('s')
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Run the simulation mode"),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("log-level")
                .help("Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4 (Debug), 5 (Trace)")
                .default_value("3")
                .value_parser(value_parser!(u32)),
        )
        .subcommand(
            Command::new("exec")
                .about("Run one shell command and exit.")
                .arg(
                    Arg::new("command")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .help("Command and its arguments"),
                ),
        )
        .subcommand(
            Command::new("monitor")
                .about("Run the emergency monitor of the UPS battery.")
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Log each battery sample"),
                ),
        )
        .subcommand(
            Command::new("publish")
                .about("Run the telemetry publisher of a device group.")
                .arg(
                    Arg::new("device")
                        .required(true)
                        .help("ups, cyberswitch, gripper, pid, or pmx"),
                ),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(Path::new)
        .expect("There should be a parameter file.");

    // Check the simulation mode
    let is_simulation_mode = matches.get_flag("simulate");

    // Check the log filter
    let log_level = matches.get_one::<u32>("level").copied().unwrap_or(3);
    let mut log_filter = get_log_filter(Some(&log_level));

    match matches.subcommand() {
        Some(("exec", sub_matches)) => {
            initiate_logger(log_filter, "chwp_shell.log");

            let line = sub_matches
                .get_many::<String>("command")
                .expect("There should be a command.")
                .map(String::as_str)
                .collect::<Vec<&str>>()
                .join(" ");

            if application::run_exec(config_file, is_simulation_mode, log_level, &line) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Some(("monitor", sub_matches)) => {
            if sub_matches.get_flag("verbose") {
                log_filter = log_filter.max(LevelFilter::Debug);
            }

            initiate_logger(log_filter, "chwp_monitor.log");
            info!("Log level: {log_filter}.");

            if application::run_monitor(config_file, is_simulation_mode, log_level) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Some(("publish", sub_matches)) => {
            let name = sub_matches
                .get_one::<String>("device")
                .expect("There should be a device.");
            let Ok(device) = TelemetryDevice::from_str(name) else {
                eprintln!("Unknown device group: {name}.");
                return ExitCode::FAILURE;
            };

            initiate_logger(log_filter, &format!("chwp_publisher_{name}.log"));
            info!("Log level: {log_filter}.");

            application::run_publisher(config_file, is_simulation_mode, device);

            ExitCode::SUCCESS
        }
        _ => {
            initiate_logger(log_filter, "chwp_shell.log");
            info!("Log level: {log_filter}.");

            application::run_shell(config_file, is_simulation_mode, log_level);

            ExitCode::SUCCESS
        }
    }
}

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level.
///
/// # Returns
/// Log filter.
fn get_log_filter(log_level: Option<&u32>) -> LevelFilter {
    match log_level {
        Some(level) => match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5 => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        None => LevelFilter::Info,
    }
}

/// Initiate the logger.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path.
fn initiate_logger(level: LevelFilter, filepath: &str) {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    // Log to the terminal
    let logger_terminal = TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    // Log to the file
    let logger_file = match File::create(filepath) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(error) => {
            eprintln!("Failed to create the log file: {error}.");
            None
        }
    };

    let _ = match logger_file {
        Some(logger_file) => CombinedLogger::init(vec![logger_terminal, logger_file]),
        None => CombinedLogger::init(vec![logger_terminal]),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_filter() {
        assert_eq!(get_log_filter(Some(&0)), LevelFilter::Off);
        assert_eq!(get_log_filter(Some(&1)), LevelFilter::Error);
        assert_eq!(get_log_filter(Some(&2)), LevelFilter::Warn);
        assert_eq!(get_log_filter(Some(&3)), LevelFilter::Info);
        assert_eq!(get_log_filter(Some(&4)), LevelFilter::Debug);
        assert_eq!(get_log_filter(Some(&5)), LevelFilter::Trace);

        assert_eq!(get_log_filter(Some(&6)), LevelFilter::Info);

        assert_eq!(get_log_filter(None), LevelFilter::Info);
    }
}
