use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to publish task {task}: {detail}")]
    Publish { task: String, detail: String },

    #[error("Failed to cancel message {receipt}: {detail}")]
    Cancel { receipt: String, detail: String },

    #[error("{0}")]
    Internal(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Internal(e.to_string())
    }
}
