pub mod emergency_monitor;
pub mod safety_status;
pub mod safety_supervisor;
