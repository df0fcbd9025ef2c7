use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::tag;

/// Insert `name` for `user_id` unless it exists. Returns the tag and whether it
/// was created by this call.
///
/// Every code path that needs a tag to exist goes through here.
pub async fn ensure_tag<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
) -> Result<(tag::Model, bool), DbErr> {
    let name = name.trim();
    let model = tag::ActiveModel {
        name: Set(name.to_string()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = match tag::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([tag::Column::UserId, tag::Column::Name])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
    {
        Ok(rows) => rows > 0,
        Err(DbErr::RecordNotInserted) => false,
        Err(e) => return Err(e),
    };

    let tag = find_by_name(conn, user_id, name)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("tag '{name}' after insert")))?;
    Ok((tag, created))
}

/// [`ensure_tag`] for several names. Returned tags follow the input order.
pub async fn ensure_tags<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    names: &[String],
) -> Result<Vec<tag::Model>, DbErr> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let (tag, _) = ensure_tag(conn, user_id, name).await?;
        tags.push(tag);
    }
    Ok(tags)
}

/// Names are compared after trimming, the same way [`ensure_tag`] stores them.
pub async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Name.eq(name.trim()))
        .one(conn)
        .await
}
