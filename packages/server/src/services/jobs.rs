use std::collections::BTreeMap;
use std::time::Duration;

use common::{Task, TaskState};
use sea_orm::*;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::entity::task_result;
use crate::error::AppError;
use crate::state::AppState;

pub fn job_url(job_id: &str) -> String {
    format!("/v3/model/jobs/{job_id}")
}

pub fn model_url(model_id: &str) -> String {
    format!("/v3/model/{model_id}")
}

/// What a poller can tell about a job from the result store.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Nothing recorded yet. Indistinguishable from a job that never existed.
    Pending,
    Running,
    Succeeded { model_id: String },
    Failed { error: String },
}

impl JobStatus {
    pub fn from_result(result: Option<&task_result::Model>) -> Self {
        match result {
            None => Self::Pending,
            Some(r) => Self::from_parts(r.state, r.output.as_ref(), r.error.as_deref()),
        }
    }

    fn from_parts(state: TaskState, output: Option<&Value>, error: Option<&str>) -> Self {
        match state {
            TaskState::Started => Self::Running,
            TaskState::Failed => Self::Failed {
                error: error.unwrap_or("unknown error").to_string(),
            },
            TaskState::Succeeded => match output {
                Some(Value::String(id)) => Self::Succeeded {
                    model_id: id.clone(),
                },
                Some(other) if !other.is_null() => Self::Succeeded {
                    model_id: other.to_string(),
                },
                _ => Self::Failed {
                    error: "task succeeded without producing a model".into(),
                },
            },
        }
    }
}

/// Poll the result store until `task_id` reaches a final state or `timeout`
/// elapses. The result row is consumed on success and on failure.
pub async fn wait_for_result(
    db: &DatabaseConnection,
    task_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Value, AppError> {
    let deadline = Instant::now() + timeout;

    loop {
        let result = task_result::Entity::find_by_id(task_id.to_string())
            .one(db)
            .await?;

        if let Some(result) = result
            && result.state.is_final()
        {
            task_result::Entity::delete_by_id(task_id.to_string())
                .exec(db)
                .await?;
            return match result.state {
                TaskState::Succeeded => Ok(result.output.unwrap_or(Value::Null)),
                _ => Err(AppError::Internal(format!(
                    "task {task_id} failed: {}",
                    result.error.unwrap_or_default()
                ))),
            };
        }

        if Instant::now() >= deadline {
            warn!(task_id, "Timed out waiting for task result");
            return Err(AppError::Internal(format!(
                "timed out waiting for task {task_id}"
            )));
        }
        sleep(poll_interval).await;
    }
}

/// Decode a `[[score, tag], ...]` prediction into tag -> score.
pub fn parse_suggestion(output: &Value) -> Result<BTreeMap<String, f64>, AppError> {
    let invalid = || AppError::Internal(format!("unexpected prediction output: {output}"));

    output
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|pair| {
            let score = pair.get(0).and_then(Value::as_f64).ok_or_else(invalid)?;
            let tag = match pair.get(1) {
                Some(Value::String(s)) => s.clone(),
                Some(v) if !v.is_null() => v.to_string(),
                _ => return Err(invalid()),
            };
            Ok((tag, score))
        })
        .collect()
}

/// Submit a prediction task and wait, bounded by `jobs.predict_timeout_ms`.
pub async fn predict(state: &AppState, task: Task) -> Result<BTreeMap<String, f64>, AppError> {
    let submitted = state.tasks.send_task(&task).await?;
    debug!(task_id = %submitted.task_id, task = %task.name, "Waiting for prediction");

    let jobs = &state.config.jobs;
    let output = wait_for_result(
        &state.db,
        &submitted.task_id,
        Duration::from_millis(jobs.predict_timeout_ms),
        Duration::from_millis(jobs.poll_interval_ms),
    )
    .await?;
    parse_suggestion(&output)
}

/// Model for a prediction: the requested one, else the configured default.
/// `None` leaves the choice to the worker.
pub fn resolve_model_id(state: &AppState, requested: Option<String>) -> Option<String> {
    requested
        .filter(|id| !id.trim().is_empty())
        .or_else(|| state.config.jobs.default_model_id.clone())
}
