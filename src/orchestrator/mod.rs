pub mod encoder_boards;
pub mod process_orchestrator;
pub mod supervised_task;
