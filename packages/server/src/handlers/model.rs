use std::collections::{BTreeSet, HashMap};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::{Task, TaskName};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::entity::{job, model, model_source, role, task_result, tagset, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppJson;
use crate::models::model::*;
use crate::services::jobs::{self, JobStatus};
use crate::services::sources;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/model/{model_id}",
    tag = "Models",
    operation_id = "getModel",
    summary = "Get a trained model",
    description = "Score and parameters are only included for admins.",
    params(("model_id" = String, Path, description = "Model id")),
    responses(
        (status = 200, description = "Model", body = ModelResponse),
        (status = 403, description = "Model not associated with user (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_model(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelResponse>, AppError> {
    let model = model::Entity::find_by_id(model_id)
        .filter(model::Column::UserId.eq(auth_user.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Forbidden("Model not associated with user".into()))?;

    Ok(Json(ModelResponse::new(model, auth_user.is_admin())))
}

#[utoipa::path(
    post,
    path = "/model/search",
    tag = "Models",
    operation_id = "searchModel",
    summary = "Find the best model",
    description = "Returns the highest scoring model (newest on ties) trained on the given tagset \
                   and/or exactly the given set of sources.",
    request_body = ModelSearchRequest,
    responses(
        (status = 200, description = "Best model", body = ModelResponse),
        (status = 400, description = "Neither tagset_id nor sources given (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No matching model (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn search_model(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ModelSearchRequest>,
) -> Result<Json<ModelResponse>, AppError> {
    if payload.tagset_id.is_none() && payload.sources.is_none() {
        return Err(AppError::Validation(
            "Either tagset_id or sources is required".into(),
        ));
    }

    let mut select = model::Entity::find().filter(model::Column::UserId.eq(auth_user.user_id));
    if let Some(tagset_id) = payload.tagset_id {
        select = select.filter(model::Column::TagsetId.eq(tagset_id));
    }
    let candidates = select
        .order_by_desc(model::Column::Score)
        .order_by_desc(model::Column::TrainedAt)
        .all(&state.db)
        .await?;

    let best = match &payload.sources {
        None => candidates.into_iter().next(),
        Some(wanted) => {
            let wanted: BTreeSet<i32> = wanted.iter().copied().collect();
            let trained_on = sources_by_model(&state.db, &candidates).await?;
            candidates
                .into_iter()
                .find(|m| trained_on.get(&m.id).is_some_and(|s| *s == wanted))
        }
    };

    let model = best.ok_or_else(|| AppError::NotFound("No matching model".into()))?;
    Ok(Json(ModelResponse::new(model, auth_user.is_admin())))
}

async fn sources_by_model<C: ConnectionTrait>(
    conn: &C,
    models: &[model::Model],
) -> Result<HashMap<String, BTreeSet<i32>>, DbErr> {
    if models.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = model_source::Entity::find()
        .filter(model_source::Column::ModelId.is_in(models.iter().map(|m| m.id.clone())))
        .all(conn)
        .await?;

    let mut out: HashMap<String, BTreeSet<i32>> = HashMap::new();
    for row in rows {
        out.entry(row.model_id).or_default().insert(row.source_id);
    }
    Ok(out)
}

#[utoipa::path(
    post,
    path = "/model/train",
    tag = "Models",
    operation_id = "trainModel",
    summary = "Start training a model",
    description = "Admin only. A user has at most one outstanding job; a second submission returns 409 \
                   with the existing job.",
    request_body = TrainRequest,
    responses(
        (status = 202, description = "Job accepted", body = JobResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not an admin, or tagset/sources not owned (FORBIDDEN)", body = ErrorBody),
        (status = 409, description = "A job is already outstanding", body = JobResponse),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn train_model(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TrainRequest>,
) -> Result<Response, AppError> {
    auth_user.require_role(role::ADMIN)?;
    if payload.source_ids.is_empty() {
        return Err(AppError::Validation("source_ids must not be empty".into()));
    }

    let txn = state.db.begin().await?;

    // Serializes concurrent submissions of the same user.
    user::Entity::find_by_id(auth_user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if let Some(existing) = job::Entity::find()
        .filter(job::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(job::Column::CreatedAt)
        .one(&txn)
        .await?
    {
        return Ok((
            StatusCode::CONFLICT,
            Json(JobResponse {
                url: jobs::job_url(&existing.id),
                job: existing.id,
            }),
        )
            .into_response());
    }

    tagset::Entity::find_by_id(payload.tagset_id)
        .filter(tagset::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Forbidden("Tagset not associated with user".into()))?;
    sources::check_owned(&txn, auth_user.user_id, &payload.source_ids).await?;

    let task = Task::new(TaskName::TrainModel)
        .arg(json!(payload.tagset_id))
        .arg(json!(payload.source_ids))
        .kwarg("n_estimators", json!(1))
        .kwarg("params", Value::Null);
    let submitted = state.tasks.send_task(&task).await?;

    let recorded: Result<(), DbErr> = async {
        job::ActiveModel {
            id: Set(submitted.task_id.clone()),
            receipt: Set(submitted.receipt.clone()),
            user_id: Set(auth_user.user_id),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await
    }
    .await;
    // The message is already on the broker; without a job row nobody could cancel it.
    if let Err(e) = recorded {
        if let Err(revoke_err) = state.tasks.revoke(&submitted.receipt).await {
            warn!(job_id = %submitted.task_id, error = %revoke_err, "Failed to revoke unrecorded job");
        }
        return Err(e.into());
    }

    info!(job_id = %submitted.task_id, tagset_id = payload.tagset_id, "Training job submitted");

    let url = jobs::job_url(&submitted.task_id);
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, url.clone())],
        Json(JobResponse {
            job: submitted.task_id,
            url,
        }),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/model/jobs",
    tag = "Models",
    operation_id = "listJobs",
    summary = "List outstanding training jobs",
    responses(
        (status = 200, description = "Jobs", body = JobListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_jobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    let rows = job::Entity::find()
        .filter(job::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(job::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let states: HashMap<String, common::TaskState> = if rows.is_empty() {
        HashMap::new()
    } else {
        task_result::Entity::find()
            .filter(task_result::Column::TaskId.is_in(rows.iter().map(|j| j.id.clone())))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|r| (r.task_id, r.state))
            .collect()
    };

    let jobs = rows
        .into_iter()
        .map(|j| JobSummary {
            url: jobs::job_url(&j.id),
            state: states.get(&j.id).copied(),
            created_at: j.created_at,
            id: j.id,
        })
        .collect();

    Ok(Json(JobListResponse { jobs }))
}

/// Load one of the caller's job rows. Another user's job is indistinguishable
/// from a missing one.
async fn find_job<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    job_id: &str,
) -> Result<job::Model, AppError> {
    job::Entity::find_by_id(job_id.to_string())
        .filter(job::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}

#[utoipa::path(
    get,
    path = "/model/jobs/{job_id}",
    tag = "Models",
    operation_id = "getJob",
    summary = "Poll a training job",
    description = "404 while the worker has not picked the job up, 304 with `Retry-After` while it runs, \
                   201 with the model `Location` once done (the job is then forgotten), 410 when it failed.",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 201, description = "Model created", body = JobDoneResponse),
        (status = 304, description = "Still running"),
        (status = 404, description = "Pending or unknown job (NOT_FOUND)", body = ErrorBody),
        (status = 410, description = "Job failed (GONE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    let job = find_job(&state.db, auth_user.user_id, &job_id).await?;
    let result = task_result::Entity::find_by_id(job.id.clone())
        .one(&state.db)
        .await?;

    match JobStatus::from_result(result.as_ref()) {
        JobStatus::Pending => Err(AppError::NotFound("Job is pending or does not exist".into())),
        JobStatus::Running => Ok((
            StatusCode::NOT_MODIFIED,
            [
                (
                    header::RETRY_AFTER,
                    state.config.jobs.retry_after_secs.to_string(),
                ),
                (header::LOCATION, jobs::job_url(&job.id)),
            ],
        )
            .into_response()),
        JobStatus::Succeeded { model_id } => {
            let txn = state.db.begin().await?;
            job::Entity::delete_by_id(job.id.clone()).exec(&txn).await?;
            task_result::Entity::delete_by_id(job.id.clone())
                .exec(&txn)
                .await?;
            txn.commit().await?;

            info!(job_id = %job.id, model_id = %model_id, "Training job completed");
            Ok((
                StatusCode::CREATED,
                [(header::LOCATION, jobs::model_url(&model_id))],
                Json(JobDoneResponse {
                    job: job.id,
                    model: model_id,
                }),
            )
                .into_response())
        }
        JobStatus::Failed { error } => {
            warn!(job_id = %job.id, error = %error, "Training job failed");
            Err(AppError::Gone(format!("Model could not be created: {error}")))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/model/jobs/{job_id}",
    tag = "Models",
    operation_id = "deleteJob",
    summary = "Cancel or dismiss a training job",
    description = "Cancellation is best effort: a training that already started keeps running. \
                   The job is forgotten either way.",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job removed", body = DeletedJobResponse),
        (status = 404, description = "Unknown job (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<DeletedJobResponse>, AppError> {
    let job = find_job(&state.db, auth_user.user_id, &job_id).await?;

    if let Err(e) = state.tasks.revoke(&job.receipt).await {
        warn!(job_id = %job.id, error = %e, "Failed to revoke job message");
    }

    let txn = state.db.begin().await?;
    job::Entity::delete_by_id(job.id.clone()).exec(&txn).await?;
    task_result::Entity::delete_by_id(job.id.clone())
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(job_id = %job.id, "Training job removed");
    Ok(Json(DeletedJobResponse { job: job.id }))
}

#[utoipa::path(
    post,
    path = "/model/suggestion",
    tag = "Models",
    operation_id = "suggestForText",
    summary = "Predict tags for free text",
    request_body = SuggestionRequest,
    responses(
        (status = 200, description = "Suggestion", body = SuggestionResponse),
        (status = 400, description = "Missing text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Prediction failed or timed out (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn suggest_for_text(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let text = payload
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("text is required".into()))?;

    let mut task = Task::new(TaskName::PredictText).arg(json!(text));
    if let Some(model_id) = jobs::resolve_model_id(&state, payload.model_id) {
        task = task.kwarg("model_id", json!(model_id));
    }
    let suggestion = jobs::predict(&state, task).await?;

    Ok(Json(SuggestionResponse { text, suggestion }))
}
