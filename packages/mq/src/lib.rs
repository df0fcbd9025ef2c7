pub mod config;
pub mod error;
pub mod models;
pub mod queue;

pub use config::MqConfig;
pub use error::MqError;
pub use models::{BrokerMessage, BroccoliError, MqQueue, init_mq};
pub use queue::{BroccoliTaskQueue, DisabledTaskQueue, SubmittedTask, TaskQueue};

pub type Mq = MqQueue;
