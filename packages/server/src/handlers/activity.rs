use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{Task, TaskName, payload_digest};
use sea_orm::*;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use crate::entity::{data, prediction, tagging};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::{AppJson, AppQuery};
use crate::models::activity::*;
use crate::models::shared::{clamp_count, normalize_tag_names};
use crate::services::activities::{self, ActivityFilter};
use crate::services::{jobs, sources};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/activities",
    tag = "Activities",
    operation_id = "listActivities",
    summary = "List activities",
    description = "Newest first unless `random` is set. Without `sources`, all of the caller's sources are searched.",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Activities", body = ActivityListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    let source_ids =
        sources::resolve_filter(&state.db, auth_user.user_id, query.sources.as_deref()).await?;

    let filter = ActivityFilter {
        source_ids,
        max_id: query.max_id,
        since: query.since,
        until: query.until,
        tagset_ids: query.tagsets,
        random: query.random,
        count: clamp_count(query.count, 100, 1000),
    };
    let rows = activities::list(&state.db, auth_user.user_id, &filter).await?;
    let activities = activities::render(&state.db, auth_user.user_id, rows).await?;

    Ok(Json(ActivityListResponse { activities }))
}

#[utoipa::path(
    post,
    path = "/activities",
    tag = "Activities",
    operation_id = "importActivities",
    summary = "Bulk import activities",
    description = "All activities are imported in one transaction. Activities that already exist are left untouched. \
                   An activity without `id` is keyed by the SHA-256 of its payload.",
    request_body = BulkImportRequest,
    responses(
        (status = 201, description = "Imported", body = BulkImportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, count = payload.activities.len()))]
pub async fn import_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkImportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut source_ids = Vec::with_capacity(payload.activities.len());
    for (index, activity) in payload.activities.iter().enumerate() {
        let source_id = activity.source_id.ok_or_else(|| {
            AppError::Validation(format!("activities[{index}]: source_id is required"))
        })?;
        source_ids.push(source_id);
    }

    let txn = state.db.begin().await?;
    let owned = sources::check_owned(&txn, auth_user.user_id, &source_ids).await?;

    let mut imported = BTreeSet::new();
    let mut inserted = 0usize;
    for (activity, source_id) in payload.activities.into_iter().zip(source_ids) {
        let source = owned
            .iter()
            .find(|s| s.id == source_id)
            .ok_or_else(|| AppError::Forbidden(format!("Source not associated with user: {source_id}")))?;
        let object_id = activity
            .id
            .unwrap_or_else(|| payload_digest(&activity.data));

        if activities::import(&txn, source, &object_id, activity.data, activity.language).await? {
            inserted += 1;
        }
        imported.insert(ImportedActivity {
            id: object_id,
            source_id,
        });
    }
    txn.commit().await?;

    info!(inserted, total = imported.len(), "Activities imported");

    Ok((
        StatusCode::CREATED,
        Json(BulkImportResponse {
            activities: imported.into_iter().collect(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/activities/{source_id}/{activity_id}",
    tag = "Activities",
    operation_id = "getActivity",
    summary = "Get one activity",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
    ),
    responses(
        (status = 200, description = "Activity", body = ActivityView),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
) -> Result<Json<ActivityView>, AppError> {
    Ok(Json(
        load_view(&state, auth_user.user_id, source_id, &activity_id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/activities/{source_id}/{activity_id}",
    tag = "Activities",
    operation_id = "putActivity",
    summary = "Import one activity",
    description = "Insert-or-ignore: an existing activity is not modified. Ids in the body must match the path.",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
    ),
    request_body = ImportActivity,
    responses(
        (status = 204, description = "Stored"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn put_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
    AppJson(payload): AppJson<ImportActivity>,
) -> Result<StatusCode, AppError> {
    if payload.source_id.is_some_and(|id| id != source_id) {
        return Err(AppError::Validation(
            "source_id in body does not match path".into(),
        ));
    }
    if payload.id.as_deref().is_some_and(|id| id != activity_id) {
        return Err(AppError::Validation("id in body does not match path".into()));
    }

    let source = sources::check_owned(&state.db, auth_user.user_id, &[source_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Forbidden(format!("Source not associated with user: {source_id}")))?;

    let inserted =
        activities::import(&state.db, &source, &activity_id, payload.data, payload.language)
            .await?;
    if inserted {
        info!(source_id, activity_id = %activity_id, "Activity stored");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/activities/{source_id}/{activity_id}",
    tag = "Activities",
    operation_id = "deleteActivity",
    summary = "Delete one activity",
    description = "Removes the activity with its taggings and predictions. Idempotent.",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    sources::check_owned(&txn, auth_user.user_id, &[source_id]).await?;

    let existing = data::Entity::find()
        .filter(data::Column::SourceId.eq(source_id))
        .filter(data::Column::ObjectId.eq(activity_id.as_str()))
        .one(&txn)
        .await?;

    if let Some(row) = existing {
        tagging::Entity::delete_many()
            .filter(tagging::Column::DataId.eq(row.id))
            .exec(&txn)
            .await?;
        prediction::Entity::delete_many()
            .filter(prediction::Column::DataId.eq(row.id))
            .exec(&txn)
            .await?;
        data::Entity::delete_by_id(row.id).exec(&txn).await?;
        info!(source_id, activity_id = %activity_id, "Activity deleted");
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/activities/{source_id}/{activity_id}/fields/{field}",
    tag = "Activities",
    operation_id = "getActivityField",
    summary = "Get a single field of an activity view",
    description = "Returns `{id, <field>: value}`; unknown fields are `null`.",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
        ("field" = String, Path, description = "Field of the activity view, e.g. `text`"),
    ),
    responses(
        (status = 200, description = "Field value", body = Object),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_activity_field(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id, field)): Path<(i32, String, String)>,
) -> Result<Json<Value>, AppError> {
    let view = load_view(&state, auth_user.user_id, source_id, &activity_id).await?;
    let value = serde_json::to_value(&view).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut body = Map::new();
    body.insert("id".into(), json!(view.id));
    body.insert(
        field.clone(),
        value.get(&field).cloned().unwrap_or(Value::Null),
    );
    Ok(Json(Value::Object(body)))
}

#[utoipa::path(
    get,
    path = "/activities/{source_id}/{activity_id}/tags",
    tag = "Activities",
    operation_id = "getActivityTags",
    summary = "Tags of an activity",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
    ),
    responses(
        (status = 200, description = "Tags", body = ActivityTagsResponse),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_activity_tags(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
) -> Result<Json<ActivityTagsResponse>, AppError> {
    let (_, row) =
        activities::find_owned(&state.db, auth_user.user_id, source_id, &activity_id).await?;
    let tags = activities::tags_of(&state.db, row.id).await?;

    Ok(Json(ActivityTagsResponse {
        id: row.object_id,
        tags,
    }))
}

#[utoipa::path(
    patch,
    path = "/activities/{source_id}/{activity_id}/tags",
    tag = "Activities",
    operation_id = "patchActivityTags",
    summary = "Add and remove tags of an activity",
    description = "Applied atomically. Tag names the caller does not own are ignored. Idempotent.",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
    ),
    request_body = PatchTagsRequest,
    responses(
        (status = 200, description = "Tags after the change", body = ActivityTagsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn patch_activity_tags(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
    AppJson(payload): AppJson<PatchTagsRequest>,
) -> Result<Json<ActivityTagsResponse>, AppError> {
    let add = normalize_tag_names(&payload.add)?;
    let remove = normalize_tag_names(&payload.remove)?;

    let txn = state.db.begin().await?;
    let (_, row) =
        activities::find_owned(&txn, auth_user.user_id, source_id, &activity_id).await?;
    activities::patch_tags(&txn, auth_user.user_id, row.id, &add, &remove).await?;
    let tags = activities::tags_of(&txn, row.id).await?;
    txn.commit().await?;

    Ok(Json(ActivityTagsResponse {
        id: row.object_id,
        tags,
    }))
}

#[utoipa::path(
    get,
    path = "/activities/{source_id}/{activity_id}/suggestion",
    tag = "Activities",
    operation_id = "suggestActivityTags",
    summary = "Predict tags for an activity",
    description = "Runs a prediction on the worker and waits for it, bounded by the configured timeout.",
    params(
        ("source_id" = i32, Path, description = "Source id"),
        ("activity_id" = String, Path, description = "Platform-side activity id"),
        SuggestionQuery,
    ),
    responses(
        (status = 200, description = "Suggestion", body = ActivitySuggestionResponse),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Prediction failed or timed out (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn suggest_activity_tags(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((source_id, activity_id)): Path<(i32, String)>,
    AppQuery(query): AppQuery<SuggestionQuery>,
) -> Result<Json<ActivitySuggestionResponse>, AppError> {
    let (_, row) =
        activities::find_owned(&state.db, auth_user.user_id, source_id, &activity_id).await?;

    let mut task = Task::new(TaskName::Predict).arg(row.payload);
    if let Some(model_id) = jobs::resolve_model_id(&state, query.model_id) {
        task = task.kwarg("model_id", json!(model_id));
    }
    let suggestion = jobs::predict(&state, task).await?;

    Ok(Json(ActivitySuggestionResponse {
        id: row.object_id,
        suggestion,
    }))
}

async fn load_view(
    state: &AppState,
    user_id: i32,
    source_id: i32,
    activity_id: &str,
) -> Result<ActivityView, AppError> {
    let (_, row) = activities::find_owned(&state.db, user_id, source_id, activity_id).await?;
    activities::render_one(&state.db, user_id, row)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No activity found for user and {source_id} -> {activity_id}"
            ))
        })
}
