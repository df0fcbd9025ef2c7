use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::source;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppJson;
use crate::models::source::*;
use crate::services::sources;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/sources",
    tag = "Sources",
    operation_id = "listSources",
    summary = "List the caller's sources",
    responses(
        (status = 200, description = "Sources", body = SourceListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_sources(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SourceListResponse>, AppError> {
    let rows = source::Entity::find()
        .filter(source::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(source::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(SourceListResponse {
        sources: rows.into_iter().map(SourceResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/sources",
    tag = "Sources",
    operation_id = "createSource",
    summary = "Register a new source",
    description = "Ids are assigned by the server; a request carrying `id` is rejected. The `Location` header points at the new source.",
    request_body = CreateSourceRequest,
    responses(
        (status = 201, description = "Source created", body = SourceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_source(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_source(&payload)?;

    let model = source::ActiveModel {
        source_type: Set(payload.source_type),
        uri: Set(payload.uri.trim().to_string()),
        slug: Set(payload.slug.trim().to_string()),
        user_id: Set(auth_user.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(source_id = model.id, source_type = %model.source_type, "Source created");

    let location = format!("/v3/sources/{}", model.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(SourceResponse::from(model)),
    ))
}

#[utoipa::path(
    get,
    path = "/sources/{id}",
    tag = "Sources",
    operation_id = "getSource",
    summary = "Get a source",
    params(("id" = i32, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Source", body = SourceResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_source(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SourceResponse>, AppError> {
    let model = sources::find_owned(&state.db, auth_user.user_id, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/sources/{id}",
    tag = "Sources",
    operation_id = "updateSource",
    summary = "Update a source",
    description = "Only `uri` and `slug` can change. Sending `id` or `type` is refused with 403.",
    params(("id" = i32, Path, description = "Source ID")),
    request_body = UpdateSourceRequest,
    responses(
        (status = 200, description = "Source updated", body = SourceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Immutable field (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found or not owned (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_source(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateSourceRequest>,
) -> Result<Json<SourceResponse>, AppError> {
    let existing = sources::find_owned(&state.db, auth_user.user_id, id).await?;
    validate_update_source(&payload)?;

    if payload.uri.is_none() && payload.slug.is_none() {
        return Ok(Json(existing.into()));
    }

    let mut active: source::ActiveModel = existing.into();
    if let Some(uri) = payload.uri {
        active.uri = Set(uri.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug.trim().to_string());
    }
    let model = active.update(&state.db).await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/sources/{id}",
    tag = "Sources",
    operation_id = "deleteSource",
    summary = "Delete a source and its activities",
    description = "Removes the source together with its activities, their taggings and predictions. Deleting a source the caller does not own is a no-op.",
    params(("id" = i32, Path, description = "Source ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_source(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;

    let owned = source::Entity::find_by_id(id)
        .filter(source::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?;

    if let Some(owned) = owned {
        sources::delete_cascade(&txn, owned.id).await?;
        info!(source_id = id, "Source deleted");
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
