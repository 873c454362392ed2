pub mod cyberswitch;
pub mod gripper;
pub mod pid_controller;
pub mod power_supply;
pub mod reply;
pub mod ups;
