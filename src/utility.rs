use config::Config;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait for parsing the configuration value.
///
/// # Parameters
/// * `Self` - Type of the configuration value.
pub trait ConfigValue: Sized {
    /// Parse the configuration value.
    ///
    /// # Parameters
    /// * `s` - String to parse.
    ///
    /// # Returns
    /// The parsed configuration value.
    fn parse_value(s: &str) -> Self;
}

impl ConfigValue for String {
    fn parse_value(s: &str) -> Self {
        s.to_string()
    }
}

impl ConfigValue for f64 {
    fn parse_value(s: &str) -> Self {
        s.parse::<f64>().expect(&format!("{s} should parse as f64"))
    }
}

impl ConfigValue for usize {
    fn parse_value(s: &str) -> Self {
        s.parse::<usize>()
            .expect(&format!("{s} should parse as usize"))
    }
}

impl ConfigValue for u32 {
    fn parse_value(s: &str) -> Self {
        s.parse::<u32>().expect(&format!("{s} should parse as u32"))
    }
}

impl ConfigValue for u16 {
    fn parse_value(s: &str) -> Self {
        s.parse::<u16>().expect(&format!("{s} should parse as u16"))
    }
}

impl ConfigValue for i32 {
    fn parse_value(s: &str) -> Self {
        s.parse::<i32>().expect(&format!("{s} should parse as i32"))
    }
}

impl ConfigValue for bool {
    fn parse_value(s: &str) -> Self {
        s.parse::<bool>()
            .expect(&format!("{s} should parse as bool"))
    }
}

/// Get the configuation from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
///
/// # Returns
/// The configuration.
///
/// # Panics
/// If the file can not be read.
pub fn get_config(filepath: &Path) -> Config {
    let name = filepath
        .to_str()
        .expect(&format!("Should have the file name in the {:?}", filepath));

    Config::builder()
        .add_source(config::File::with_name(name))
        .build()
        .expect(&format!("Should be able to read the {name}"))
}

/// Get the parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file. Use the dot to
/// access a nested key such as "rotation.max_frequency".
///
/// # Returns
/// The parameter.
///
/// # Panics
/// If the key is not in the file.
pub fn get_parameter<T: ConfigValue>(filepath: &Path, key: &str) -> T {
    let config = get_config(filepath);

    config
        .get_string(key)
        .map(|v| T::parse_value(&v))
        .expect(&format!("Should find the {key} in the {:?}", filepath))
}

/// Get the parameter from the file or use the default value if the key is
/// missing.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
/// * `default` - Default value.
///
/// # Returns
/// The parameter.
pub fn get_parameter_or<T: ConfigValue>(filepath: &Path, key: &str, default: T) -> T {
    let config = get_config(filepath);

    match config.get_string(key) {
        Ok(value) => T::parse_value(&value),
        Err(_) => default,
    }
}

/// Get the array parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The array parameter.
pub fn get_parameter_array<T: ConfigValue>(filepath: &Path, key: &str) -> Vec<T> {
    let config = get_config(filepath);
    let config_array = config
        .get_array(key)
        .expect(&format!("Should find the {key} in the {:?}", filepath));

    config_array
        .iter()
        .map(|x| T::parse_value(&x.clone().into_string().expect("Should be a string")))
        .collect()
}

/// Sleep in small steps and wake up early if the interrupt is set.
///
/// # Arguments
/// * `duration` - Total time to sleep in second.
/// * `granularity` - Time of each step in second.
/// * `interrupt` - Interrupt flag.
///
/// # Returns
/// True if the whole duration passed. False if interrupted.
pub fn sleep_interruptible(duration: f64, granularity: f64, interrupt: &AtomicBool) -> bool {
    if duration <= 0.0 {
        return !interrupt.load(Ordering::Relaxed);
    }

    let step = if granularity > 0.0 {
        granularity.min(duration)
    } else {
        duration
    };

    let mut elapsed = 0.0;
    while elapsed < duration {
        if interrupt.load(Ordering::Relaxed) {
            return false;
        }

        let remaining = (duration - elapsed).min(step);
        sleep(Duration::from_secs_f64(remaining));
        elapsed += remaining;
    }

    !interrupt.load(Ordering::Relaxed)
}

/// Round a value to a specific digit.
///
/// # Arguments
/// * `value` - The value to be rounded.
/// * `digit` - The number of digits after the decimal point.
///
/// # Returns
/// The rounded value.
pub fn round(value: f64, digit: i32) -> f64 {
    let normalized = 10.0_f64.powi(digit);
    (value * normalized).round() / normalized
}

/// Get the system time in second since the UNIX epoch.
///
/// # Returns
/// System time. Return 0.0 if fail.
pub fn get_system_time() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use std::f64::EPSILON;
    use std::time::Instant;

    use super::*;
    use approx::assert_relative_eq;

    const FILEPATH: &str = "config/parameters_chwp.yaml";

    #[test]
    fn test_get_parameter() {
        let max_frequency: f64 = get_parameter(Path::new(FILEPATH), "rotation.max_frequency");

        assert_relative_eq!(max_frequency, 3.5, epsilon = EPSILON);

        let transport: String = get_parameter(Path::new(FILEPATH), "channels.drive.transport");

        assert_eq!(transport, "tcp");
    }

    #[test]
    fn test_get_parameter_or() {
        let threshold: f64 = get_parameter_or(Path::new(FILEPATH), "safety.battery_threshold", 0.0);

        assert_relative_eq!(threshold, 80.0, epsilon = EPSILON);

        let missing: u32 = get_parameter_or(Path::new(FILEPATH), "safety.not_a_key", 7);

        assert_eq!(missing, 7);
    }

    #[test]
    fn test_get_parameter_array() {
        let gains: Vec<f64> = get_parameter_array(Path::new(FILEPATH), "rotation.gain_tune");

        assert_eq!(gains, vec![0.2, 63.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "Should be able to read the wrong.yaml")]
    fn test_get_config_panic() {
        get_config(Path::new("wrong.yaml"));
    }

    #[test]
    fn test_sleep_interruptible() {
        let interrupt = AtomicBool::new(false);

        let start = Instant::now();
        assert!(sleep_interruptible(0.05, 0.01, &interrupt));
        assert!(start.elapsed() >= Duration::from_millis(50));

        interrupt.store(true, Ordering::Relaxed);

        let start = Instant::now();
        assert!(!sleep_interruptible(10.0, 0.01, &interrupt));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_round() {
        assert_eq!(round(1.23456, 0), 1.0);
        assert_eq!(round(1.23456, 2), 1.23);
        assert_eq!(round(1.23456, 3), 1.235);
    }

    #[test]
    fn test_get_system_time() {
        assert!(get_system_time() > 0.0);
    }
}
