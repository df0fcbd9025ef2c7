use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::TaskState;
use serde::{Deserialize, Serialize};

use crate::entity::model;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ModelResponse {
    #[schema(example = "32797cd2-4203-11e6-9215-f45c89bc662f")]
    pub id: String,
    pub trained_ts: DateTime<Utc>,
    /// Admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub params: Option<serde_json::Value>,
}

impl ModelResponse {
    pub fn new(model: model::Model, include_details: bool) -> Self {
        let (score, params) = if include_details {
            (Some(model.score), model.params)
        } else {
            (None, None)
        };
        Self {
            id: model.id,
            trained_ts: model.trained_at,
            score,
            params,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ModelSearchRequest {
    #[serde(alias = "tagsetId")]
    pub tagset_id: Option<i32>,
    /// Exact set of sources the model was trained on.
    pub sources: Option<Vec<i32>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TrainRequest {
    pub tagset_id: i32,
    pub source_ids: Vec<i32>,
}

/// Reference to a training job and the URL to poll it at.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub job: String,
    #[schema(example = "/v3/model/jobs/0b6a7c4e-3f7b-4f5e-9b8a-1c2d3e4f5a6b")]
    pub url: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JobSummary {
    pub id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Last reported state; `null` while the worker has not picked it up.
    pub state: Option<TaskState>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

/// Returned once a job has produced its model.
#[derive(Serialize, utoipa::ToSchema)]
pub struct JobDoneResponse {
    pub job: String,
    pub model: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeletedJobResponse {
    pub job: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SuggestionRequest {
    pub text: Option<String>,
    pub model_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SuggestionResponse {
    pub text: String,
    /// Tag name -> score.
    pub suggestion: BTreeMap<String, f64>,
}
