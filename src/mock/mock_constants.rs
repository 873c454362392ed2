// Rotor dynamics per frequency read-back in Hz. The simulation advances on
// every read instead of the wall clock so the tests are deterministic.
pub const PLANT_ACCELERATION: f64 = 0.05;
pub const PLANT_DECELERATION: f64 = 0.1;
pub const PLANT_FRICTION: f64 = 0.002;

// Rotation frequency in Hz per drive volt in the voltage mode.
pub const PLANT_HZ_PER_VOLT: f64 = 0.1;

// Load resistance of the power supplies in ohm.
pub const PLANT_RESISTANCE_DRIVE: f64 = 8.0;
pub const PLANT_RESISTANCE_BIAS: f64 = 20.0;

// Voltage of the bias power supplies in volt.
pub const PLANT_VOLTAGE_BIAS: f64 = 12.0;

// Gripper position in mm where each axis touches the rotor.
pub const PLANT_CONTACT_POSITION: [f64; 3] = [3.0, 3.2, 2.9];

// UPS readings.
pub const PLANT_BATTERY_CAPACITY: f64 = 100.0;
pub const PLANT_UPS_VOLTAGE: f64 = 120.0;
pub const PLANT_UPS_FREQUENCY: f64 = 60.0;
pub const PLANT_UPS_LOAD: f64 = 23.0;

// Reply of the device that does not understand the command.
pub const PLANT_UNKNOWN_REPLY: &str = "ERR";
