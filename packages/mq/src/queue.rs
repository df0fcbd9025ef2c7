use std::sync::Arc;

use async_trait::async_trait;
use common::Task;
use tracing::{debug, info, warn};

use crate::error::MqError;
use crate::models::MqQueue;

/// Handle returned for an accepted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTask {
    /// Our task id; the worker reports progress under it.
    pub task_id: String,
    /// Broker-side message id, needed to cancel the message later.
    pub receipt: String,
}

/// Submission side of the worker protocol.
///
/// Results do not flow back through this trait: the worker publishes
/// [`common::TaskEvent`]s on a separate queue which the server records.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn send_task(&self, task: &Task) -> Result<SubmittedTask, MqError>;

    /// Asks the broker to drop a queued message.
    ///
    /// Best effort only. A message that a worker already picked up keeps running.
    async fn revoke(&self, receipt: &str) -> Result<(), MqError>;
}

/// [`TaskQueue`] backed by a broccoli (Redis) queue.
pub struct BroccoliTaskQueue {
    mq: Arc<MqQueue>,
    queue_name: String,
}

impl BroccoliTaskQueue {
    pub fn new(mq: Arc<MqQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl TaskQueue for BroccoliTaskQueue {
    async fn send_task(&self, task: &Task) -> Result<SubmittedTask, MqError> {
        let message = self
            .mq
            .publish(&self.queue_name, None, task, None)
            .await
            .map_err(|e| MqError::Publish {
                task: task.name.to_string(),
                detail: e.to_string(),
            })?;

        info!(
            task_id = %task.id,
            task = %task.name,
            queue = %self.queue_name,
            "Task published"
        );

        Ok(SubmittedTask {
            task_id: task.id.clone(),
            receipt: message.task_id.to_string(),
        })
    }

    async fn revoke(&self, receipt: &str) -> Result<(), MqError> {
        self.mq
            .cancel(&self.queue_name, receipt.to_string())
            .await
            .map_err(|e| MqError::Cancel {
                receipt: receipt.to_string(),
                detail: e.to_string(),
            })?;
        debug!(receipt, queue = %self.queue_name, "Message cancelled");
        Ok(())
    }
}

/// Stand-in used when the broker is disabled in configuration.
/// Every call fails, so callers surface a generic error instead of hanging.
pub struct DisabledTaskQueue;

#[async_trait]
impl TaskQueue for DisabledTaskQueue {
    async fn send_task(&self, task: &Task) -> Result<SubmittedTask, MqError> {
        warn!(task = %task.name, "MQ disabled, refusing task");
        Err(MqError::Unavailable("MQ is disabled".into()))
    }

    async fn revoke(&self, _receipt: &str) -> Result<(), MqError> {
        Err(MqError::Unavailable("MQ is disabled".into()))
    }
}
