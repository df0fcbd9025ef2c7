use std::collections::HashMap;

use sea_orm::sea_query::{OnConflict, Query as SeaQuery};
use sea_orm::*;

use crate::entity::{model, model_source, prediction, tagset, tagset_tag};
use crate::error::AppError;
use crate::models::tagset::TagSetResponse;

const TAGSET_TAG_NAMES_SQL: &str = r#"
SELECT tt.tagset_id AS tagset_id, tag.name AS name
FROM tagset_tag AS tt
JOIN tag ON tag.id = tt.tag_id
WHERE tt.tagset_id = ANY($1)
ORDER BY tag.name
"#;

#[derive(Debug, FromQueryResult)]
struct TagsetTagName {
    tagset_id: i32,
    name: String,
}

/// Fetch a tagset owned by `user_id`, or `NotFound`.
pub async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    tagset_id: i32,
) -> Result<tagset::Model, AppError> {
    tagset::Entity::find_by_id(tagset_id)
        .filter(tagset::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Tagset not found".into()))
}

/// Tag names per tagset, sorted by name. Tagsets without tags are absent.
pub async fn tag_names<C: ConnectionTrait>(
    conn: &C,
    tagset_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, DbErr> {
    if tagset_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = TagsetTagName::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        TAGSET_TAG_NAMES_SQL,
        [tagset_ids.to_vec().into()],
    ))
    .all(conn)
    .await?;

    let mut names: HashMap<i32, Vec<String>> = HashMap::new();
    for row in rows {
        names.entry(row.tagset_id).or_default().push(row.name);
    }
    Ok(names)
}

pub async fn render<C: ConnectionTrait>(
    conn: &C,
    tagsets: Vec<tagset::Model>,
) -> Result<Vec<TagSetResponse>, DbErr> {
    let ids: Vec<i32> = tagsets.iter().map(|t| t.id).collect();
    let mut names = tag_names(conn, &ids).await?;

    Ok(tagsets
        .into_iter()
        .map(|t| TagSetResponse {
            tags: names.remove(&t.id).unwrap_or_default(),
            id: t.id,
            title: t.title,
        })
        .collect())
}

/// Add tags to a tagset; existing links are kept.
pub async fn link_tags<C: ConnectionTrait>(
    conn: &C,
    tagset_id: i32,
    tag_ids: &[i32],
) -> Result<(), DbErr> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let links = tag_ids.iter().map(|&tag_id| tagset_tag::ActiveModel {
        tagset_id: Set(tagset_id),
        tag_id: Set(tag_id),
    });

    match tagset_tag::Entity::insert_many(links)
        .on_conflict(
            OnConflict::columns([tagset_tag::Column::TagsetId, tagset_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete a tagset, its tag links and every model trained on it.
pub async fn delete_cascade<C: ConnectionTrait>(conn: &C, tagset_id: i32) -> Result<(), DbErr> {
    let model_ids = || {
        SeaQuery::select()
            .column(model::Column::Id)
            .from(model::Entity)
            .and_where(model::Column::TagsetId.eq(tagset_id))
            .to_owned()
    };

    prediction::Entity::delete_many()
        .filter(prediction::Column::ModelId.in_subquery(model_ids()))
        .exec(conn)
        .await?;
    model_source::Entity::delete_many()
        .filter(model_source::Column::ModelId.in_subquery(model_ids()))
        .exec(conn)
        .await?;
    model::Entity::delete_many()
        .filter(model::Column::TagsetId.eq(tagset_id))
        .exec(conn)
        .await?;
    tagset_tag::Entity::delete_many()
        .filter(tagset_tag::Column::TagsetId.eq(tagset_id))
        .exec(conn)
        .await?;
    tagset::Entity::delete_by_id(tagset_id).exec(conn).await?;
    Ok(())
}
