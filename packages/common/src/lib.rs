pub mod activity;
pub mod config;
pub mod source_type;
pub mod task;
pub mod task_state;

pub use activity::{ActivityPayload, ActivityUser, PayloadError, payload_digest};
pub use source_type::SourceType;
pub use task::{Task, TaskEvent, TaskName};
pub use task_state::TaskState;
