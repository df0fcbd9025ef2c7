pub mod data;
pub mod job;
pub mod model;
pub mod model_source;
pub mod prediction;
pub mod role;
pub mod source;
pub mod tag;
pub mod tagging;
pub mod tagset;
pub mod tagset_tag;
pub mod task_result;
pub mod user;
pub mod user_role;
