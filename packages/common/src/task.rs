use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::TaskState;

/// Remote procedures the brain worker exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    /// `train_model(tagset_id, source_ids, n_estimators=, params=)` -> model id
    TrainModel,
    /// `predict_text(text, model_id=)` -> `[[score, tag], ...]`
    PredictText,
    /// `predict(activity, model_id=)` -> `[[score, tag], ...]`
    Predict,
    /// `send_mail(subject, body, sender=, recipients=)`
    SendMail,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrainModel => "train_model",
            Self::PredictText => "predict_text",
            Self::Predict => "predict",
            Self::SendMail => "send_mail",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named remote call published to the worker queue.
///
/// `id` is generated here and is the key under which the worker reports progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: TaskName,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Task {
    pub fn new(name: TaskName) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    pub fn kwarg(mut self, key: &str, value: Value) -> Self {
        self.kwargs.insert(key.to_string(), value);
        self
    }
}

/// Progress report published by the worker on the result queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Started { task_id: String },
    Succeeded { task_id: String, output: Value },
    Failed { task_id: String, error: String },
}

impl TaskEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Started { task_id }
            | Self::Succeeded { task_id, .. }
            | Self::Failed { task_id, .. } => task_id,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            Self::Started { .. } => TaskState::Started,
            Self::Succeeded { .. } => TaskState::Succeeded,
            Self::Failed { .. } => TaskState::Failed,
        }
    }
}
