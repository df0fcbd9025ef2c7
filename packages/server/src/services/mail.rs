use std::sync::Arc;

use common::{Task, TaskName};
use mq::{MqError, SubmittedTask, TaskQueue};
use serde_json::json;
use tracing::info;

/// Delivers mail through the worker's `send_mail` task.
#[derive(Clone)]
pub struct Mailer {
    tasks: Arc<dyn TaskQueue>,
    recipient: String,
}

impl Mailer {
    pub fn new(tasks: Arc<dyn TaskQueue>, recipient: impl Into<String>) -> Self {
        Self {
            tasks,
            recipient: recipient.into(),
        }
    }

    pub async fn send_contact_message(
        &self,
        sender: &str,
        message: &str,
    ) -> Result<SubmittedTask, MqError> {
        let task = contact_task(sender, message, &self.recipient);
        let submitted = self.tasks.send_task(&task).await?;
        info!(task_id = %submitted.task_id, "Contact message queued");
        Ok(submitted)
    }
}

fn contact_task(sender: &str, message: &str, recipient: &str) -> Task {
    Task::new(TaskName::SendMail)
        .arg(json!(format!("Message From: {sender}")))
        .arg(json!(format!("{sender}\n{message}")))
        .kwarg("sender", json!(sender))
        .kwarg("recipients", json!([recipient]))
}
