use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{tag, tagging, tagset_tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppQuery;
use crate::models::activity::{ActivityListResponse, TaggedActivitiesQuery};
use crate::models::shared::{clamp_count, validate_tag_name};
use crate::models::tag::*;
use crate::services::{activities, sources, tags};
use crate::state::AppState;

const TAG_COUNTS_SQL: &str = r#"
SELECT tag.name AS name, COUNT(tagging.data_id) AS count
FROM tag
LEFT JOIN tagging ON tagging.tag_id = tag.id
WHERE tag.user_id = $1
GROUP BY tag.name
ORDER BY tag.name
"#;

const TAG_COUNTS_IN_SOURCES_SQL: &str = r#"
SELECT tag.name AS name, COUNT(tagging.data_id) AS count
FROM tag
JOIN tagging ON tagging.tag_id = tag.id
JOIN data ON data.id = tagging.data_id
WHERE tag.user_id = $1 AND data.source_id = ANY($2)
GROUP BY tag.name
HAVING COUNT(tagging.data_id) > 0
ORDER BY tag.name
"#;

#[derive(Debug, FromQueryResult)]
struct TagCount {
    name: String,
    count: i64,
}

#[utoipa::path(
    get,
    path = "/tags",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List the caller's tags",
    description = "With `sources`, counts are restricted to activities of those sources and tags without any are omitted.",
    params(TagListQuery),
    responses(
        (status = 200, description = "Tags", body = TagListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_tags(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TagListQuery>,
) -> Result<Json<TagListResponse>, AppError> {
    let counts = match &query.sources {
        Some(source_ids) => {
            sources::check_owned(&state.db, auth_user.user_id, source_ids).await?;
            TagCount::find_by_statement(Statement::from_sql_and_values(
                DbBackend::Postgres,
                TAG_COUNTS_IN_SOURCES_SQL,
                [auth_user.user_id.into(), source_ids.clone().into()],
            ))
            .all(&state.db)
            .await?
        }
        None => {
            TagCount::find_by_statement(Statement::from_sql_and_values(
                DbBackend::Postgres,
                TAG_COUNTS_SQL,
                [auth_user.user_id.into()],
            ))
            .all(&state.db)
            .await?
        }
    };

    let tags = counts.iter().map(|c| c.name.clone()).collect();
    let counts = query.with_count.then(|| {
        counts
            .into_iter()
            .map(|c| (c.name, std::cmp::Ord::max(c.count, 0) as u64))
            .collect::<BTreeMap<_, _>>()
    });

    Ok(Json(TagListResponse { tags, counts }))
}

#[utoipa::path(
    get,
    path = "/tags/{tag}",
    tag = "Tags",
    operation_id = "getTag",
    summary = "Get a tag",
    params(("tag" = String, Path, description = "Tag name"), TagQuery),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn get_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppQuery(query): AppQuery<TagQuery>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = tags::find_by_name(&state.db, auth_user.user_id, &name)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    let count = if query.with_count {
        Some(
            tagging::Entity::find()
                .filter(tagging::Column::TagId.eq(tag.id))
                .count(&state.db)
                .await?,
        )
    } else {
        None
    };

    Ok(Json(TagResponse {
        tag: tag.name,
        count,
    }))
}

#[utoipa::path(
    put,
    path = "/tags/{tag}",
    tag = "Tags",
    operation_id = "putTag",
    summary = "Create a tag if it does not exist",
    params(("tag" = String, Path, description = "Tag name")),
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 200, description = "Tag already existed", body = TagResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn put_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_tag_name(&name)?;

    let (tag, created) = tags::ensure_tag(&state.db, auth_user.user_id, &name).await?;
    let status = if created {
        info!(tag_id = tag.id, "Tag created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(TagResponse {
            tag: tag.name,
            count: None,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/tags/{tag}",
    tag = "Tags",
    operation_id = "deleteTag",
    summary = "Delete a tag",
    description = "Removes the tag, its taggings and its tagset memberships. Idempotent.",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 204, description = "Deleted")),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;

    if let Some(tag) = tags::find_by_name(&txn, auth_user.user_id, &name).await? {
        tagging::Entity::delete_many()
            .filter(tagging::Column::TagId.eq(tag.id))
            .exec(&txn)
            .await?;
        tagset_tag::Entity::delete_many()
            .filter(tagset_tag::Column::TagId.eq(tag.id))
            .exec(&txn)
            .await?;
        tag::Entity::delete_by_id(tag.id).exec(&txn).await?;
        info!(tag_id = tag.id, "Tag deleted");
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/tags/{tag}/activities",
    tag = "Tags",
    operation_id = "listTagActivities",
    summary = "Activities tagged with a tag",
    params(("tag" = String, Path, description = "Tag name"), TaggedActivitiesQuery),
    responses(
        (status = 200, description = "Activities", body = ActivityListResponse),
        (status = 403, description = "Source not owned (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_tag_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppQuery(query): AppQuery<TaggedActivitiesQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    let tag = tags::find_by_name(&state.db, auth_user.user_id, &name)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;
    let source_ids =
        sources::resolve_filter(&state.db, auth_user.user_id, query.sources.as_deref()).await?;

    let rows = activities::list_tagged(
        &state.db,
        &source_ids,
        &[tag.id],
        query.random,
        clamp_count(query.count, 10, 1000),
    )
    .await?;
    let activities = activities::render(&state.db, auth_user.user_id, rows).await?;

    Ok(Json(ActivityListResponse { activities }))
}
