use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{tagset, tagset_tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::{AppJson, AppQuery};
use crate::models::activity::{ActivityListResponse, TaggedActivitiesQuery};
use crate::models::shared::{clamp_count, normalize_tag_names, validate_tag_name};
use crate::models::tagset::*;
use crate::services::{activities, sources, tags, tagsets};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/tagsets",
    tag = "Tagsets",
    operation_id = "listTagsets",
    summary = "List the caller's tagsets",
    responses(
        (status = 200, description = "Tagsets", body = TagSetListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_tagsets(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TagSetListResponse>, AppError> {
    let rows = tagset::Entity::find()
        .filter(tagset::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(tagset::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(TagSetListResponse {
        tag_sets: tagsets::render(&state.db, rows).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/tagsets",
    tag = "Tagsets",
    operation_id = "createTagset",
    summary = "Create a tagset",
    description = "Tags that do not exist yet are created for the caller.",
    request_body = CreateTagSetRequest,
    responses(
        (status = 201, description = "Tagset created", body = TagSetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_tagset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTagSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_title(&payload.title)?;
    let names = normalize_tag_names(&payload.tags)?;

    let txn = state.db.begin().await?;
    let model = tagset::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        user_id: Set(auth_user.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let tag_ids: Vec<i32> = tags::ensure_tags(&txn, auth_user.user_id, &names)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    tagsets::link_tags(&txn, model.id, &tag_ids).await?;

    let body = tagsets::render(&txn, vec![model]).await?.pop().ok_or_else(|| {
        AppError::Internal("created tagset vanished before render".into())
    })?;
    txn.commit().await?;

    info!(tagset_id = body.id, tags = body.tags.len(), "Tagset created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/v3/tagsets/{}", body.id))],
        Json(body),
    ))
}

#[utoipa::path(
    get,
    path = "/tagsets/{id}",
    tag = "Tagsets",
    operation_id = "getTagset",
    summary = "Get a tagset",
    params(("id" = i32, Path, description = "Tagset id")),
    responses(
        (status = 200, description = "Tagset", body = TagSetResponse),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_tagset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TagSetResponse>, AppError> {
    let model = tagsets::find_owned(&state.db, auth_user.user_id, id).await?;
    let body = tagsets::render(&state.db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Tagset not found".into()))?;
    Ok(Json(body))
}

#[utoipa::path(
    patch,
    path = "/tagsets/{id}",
    tag = "Tagsets",
    operation_id = "updateTagset",
    summary = "Update a tagset",
    description = "Renames the tagset and/or adds tags to it. Tags are never removed here.",
    params(("id" = i32, Path, description = "Tagset id")),
    request_body = UpdateTagSetRequest,
    responses(
        (status = 200, description = "Updated tagset", body = TagSetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Tagset id cannot be changed (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_tagset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTagSetRequest>,
) -> Result<Json<TagSetResponse>, AppError> {
    let txn = state.db.begin().await?;
    let existing = tagsets::find_owned(&txn, auth_user.user_id, id).await?;

    if payload.id.is_some() {
        return Err(AppError::Forbidden("Tagset id cannot be changed".into()));
    }

    let model = match &payload.title {
        Some(title) => {
            validate_title(title)?;
            let mut active: tagset::ActiveModel = existing.into();
            active.title = Set(title.trim().to_string());
            active.update(&txn).await?
        }
        None => existing,
    };

    if let Some(names) = &payload.tags {
        let names = normalize_tag_names(names)?;
        let tag_ids: Vec<i32> = tags::ensure_tags(&txn, auth_user.user_id, &names)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        tagsets::link_tags(&txn, model.id, &tag_ids).await?;
    }

    let body = tagsets::render(&txn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Tagset not found".into()))?;
    txn.commit().await?;

    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/tagsets/{id}",
    tag = "Tagsets",
    operation_id = "deleteTagset",
    summary = "Delete a tagset",
    description = "Models trained on the tagset are deleted with it.",
    params(("id" = i32, Path, description = "Tagset id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_tagset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    tagsets::find_owned(&txn, auth_user.user_id, id).await?;
    tagsets::delete_cascade(&txn, id).await?;
    txn.commit().await?;

    info!(tagset_id = id, "Tagset deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/tagsets/{id}/tags/{tag}",
    tag = "Tagsets",
    operation_id = "addTagsetTag",
    summary = "Add a tag to a tagset",
    description = "Creates the tag if needed. Idempotent.",
    params(
        ("id" = i32, Path, description = "Tagset id"),
        ("tag" = String, Path, description = "Tag name"),
    ),
    responses(
        (status = 200, description = "Updated tagset", body = TagSetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn add_tagset_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, name)): Path<(i32, String)>,
) -> Result<Json<TagSetResponse>, AppError> {
    validate_tag_name(&name)?;

    let txn = state.db.begin().await?;
    let model = tagsets::find_owned(&txn, auth_user.user_id, id).await?;
    let (tag, _) = tags::ensure_tag(&txn, auth_user.user_id, name.trim()).await?;
    tagsets::link_tags(&txn, model.id, &[tag.id]).await?;

    let body = tagsets::render(&txn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Tagset not found".into()))?;
    txn.commit().await?;

    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/tagsets/{id}/tags/{tag}",
    tag = "Tagsets",
    operation_id = "removeTagsetTag",
    summary = "Remove a tag from a tagset",
    description = "The tag itself is kept. Idempotent.",
    params(
        ("id" = i32, Path, description = "Tagset id"),
        ("tag" = String, Path, description = "Tag name"),
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn remove_tagset_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, name)): Path<(i32, String)>,
) -> Result<StatusCode, AppError> {
    let model = tagsets::find_owned(&state.db, auth_user.user_id, id).await?;

    if let Some(tag) = tags::find_by_name(&state.db, auth_user.user_id, &name).await? {
        tagset_tag::Entity::delete_many()
            .filter(tagset_tag::Column::TagsetId.eq(model.id))
            .filter(tagset_tag::Column::TagId.eq(tag.id))
            .exec(&state.db)
            .await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/tagsets/{id}/activities",
    tag = "Tagsets",
    operation_id = "listTagsetActivities",
    summary = "Activities tagged with any tag of a tagset",
    params(("id" = i32, Path, description = "Tagset id"), TaggedActivitiesQuery),
    responses(
        (status = 200, description = "Activities", body = ActivityListResponse),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Tagset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_tagset_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<TaggedActivitiesQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    let model = tagsets::find_owned(&state.db, auth_user.user_id, id).await?;
    let source_ids =
        sources::resolve_filter(&state.db, auth_user.user_id, query.sources.as_deref()).await?;

    let tag_ids = tagset_tag::Entity::find()
        .select_only()
        .column(tagset_tag::Column::TagId)
        .filter(tagset_tag::Column::TagsetId.eq(model.id))
        .into_tuple::<i32>()
        .all(&state.db)
        .await?;

    let rows = activities::list_tagged(
        &state.db,
        &source_ids,
        &tag_ids,
        query.random,
        clamp_count(query.count, 10, 1000),
    )
    .await?;
    let activities = activities::render(&state.db, auth_user.user_id, rows).await?;

    Ok(Json(ActivityListResponse { activities }))
}
