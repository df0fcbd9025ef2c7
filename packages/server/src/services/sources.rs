use std::collections::BTreeSet;

use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;

use crate::entity::{data, model_source, prediction, source, tagging};
use crate::error::AppError;

/// Fetch a source owned by `user_id`, or `NotFound`.
pub async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    source_id: i32,
) -> Result<source::Model, AppError> {
    source::Entity::find_by_id(source_id)
        .filter(source::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("source does not exist".into()))
}

/// Ensure every id in `source_ids` belongs to `user_id`, otherwise `Forbidden`
/// naming the foreign ids.
pub async fn check_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    source_ids: &[i32],
) -> Result<Vec<source::Model>, AppError> {
    let wanted: BTreeSet<i32> = source_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let owned = source::Entity::find()
        .filter(source::Column::UserId.eq(user_id))
        .filter(source::Column::Id.is_in(wanted.iter().copied()))
        .all(conn)
        .await?;

    let found: BTreeSet<i32> = owned.iter().map(|s| s.id).collect();
    let missing: Vec<String> = wanted.difference(&found).map(|id| id.to_string()).collect();
    if !missing.is_empty() {
        return Err(AppError::Forbidden(format!(
            "Sources not associated with user: {}",
            missing.join(", ")
        )));
    }
    Ok(owned)
}

/// Ids of all sources owned by `user_id`.
pub async fn owned_ids<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Vec<i32>, DbErr> {
    source::Entity::find()
        .select_only()
        .column(source::Column::Id)
        .filter(source::Column::UserId.eq(user_id))
        .into_tuple::<i32>()
        .all(conn)
        .await
}

/// Resolve an optional source filter: explicit ids are checked for ownership,
/// absent means all of the caller's sources.
pub async fn resolve_filter<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    requested: Option<&[i32]>,
) -> Result<Vec<i32>, AppError> {
    match requested {
        Some(ids) => {
            check_owned(conn, user_id, ids).await?;
            Ok(ids.to_vec())
        }
        None => Ok(owned_ids(conn, user_id).await?),
    }
}

/// Delete a source with everything hanging off its activities.
pub async fn delete_cascade<C: ConnectionTrait>(conn: &C, source_id: i32) -> Result<(), DbErr> {
    let data_ids = || {
        SeaQuery::select()
            .column(data::Column::Id)
            .from(data::Entity)
            .and_where(data::Column::SourceId.eq(source_id))
            .to_owned()
    };

    tagging::Entity::delete_many()
        .filter(tagging::Column::DataId.in_subquery(data_ids()))
        .exec(conn)
        .await?;
    prediction::Entity::delete_many()
        .filter(prediction::Column::DataId.in_subquery(data_ids()))
        .exec(conn)
        .await?;
    data::Entity::delete_many()
        .filter(data::Column::SourceId.eq(source_id))
        .exec(conn)
        .await?;
    model_source::Entity::delete_many()
        .filter(model_source::Column::SourceId.eq(source_id))
        .exec(conn)
        .await?;
    source::Entity::delete_by_id(source_id).exec(conn).await?;
    Ok(())
}
