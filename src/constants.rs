// Number of gripper axes around the rotor.
pub const NUM_GRIPPER_AXIS: usize = 3;

// Number of switched ports on the cyberswitch.
pub const NUM_CYBERSWITCH_PORT: usize = 5;

// Number of encoder read-out boards.
pub const NUM_ENCODER_BOARD: usize = 2;

// Rotation limits.
pub const MAX_ROTATION_FREQUENCY: f64 = 3.5;
pub const MAX_DRIVE_VOLTAGE: f64 = 32.0;

// The following thresholds and waits were tuned on the PB2b hardware. They are
// the defaults when the parameter file does not override them.

// Spin-up is finished when |current - target| is within this value in Hz.
pub const DEFAULT_FREQUENCY_TOLERANCE: f64 = 0.005;
// Rotor is regarded as stopped below this frequency in Hz.
pub const DEFAULT_STOP_FREQUENCY: f64 = 0.15;
// Deadline of the braking in second.
pub const DEFAULT_STOP_TIMEOUT: f64 = 100.0;
// Deadline of the spin-up in second.
pub const DEFAULT_SPIN_TIMEOUT: f64 = 900.0;
// Time to wait after enabling the drive output before the first read-back in
// second.
pub const DEFAULT_SETTLE_TIME: f64 = 1.0;

// Battery capacity in percent below which the emergency shutdown begins.
pub const DEFAULT_BATTERY_THRESHOLD: f64 = 80.0;
// Period to poll the UPS in second.
pub const DEFAULT_MONITOR_PERIOD: f64 = 10.0;
// Time for the residual rotation to cease in second.
pub const DEFAULT_QUIESCENCE_TIME: f64 = 90.0;
// Time to coast down after the braking failed in second.
pub const DEFAULT_STOP_FAILURE_WAIT: f64 = 1500.0;

// Back-off between two attempts to take a busy channel lock in second.
pub const DEFAULT_LOCK_BACKOFF: f64 = 1.0;

pub const LOCAL_HOST: &str = "127.0.0.1";
pub const TERMINATOR: &[u8; 2] = b"\r\n";

// Prefix and suffix of the lock file of each channel.
pub const LOCK_FILE_PREFIX: &str = ".";
pub const LOCK_FILE_SUFFIX: &str = "_port_busy";
