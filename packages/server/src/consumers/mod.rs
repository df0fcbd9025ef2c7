pub mod result_sweep;
pub mod task_events;

pub use result_sweep::run_result_sweeper;
pub use task_events::consume_task_events;
