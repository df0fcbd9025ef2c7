use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use common::ActivityPayload;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{NullOrdering, OnConflict, Query as SeaQuery, SelectStatement};
use sea_orm::*;
use serde_json::Value;

use crate::entity::{data, prediction, source, tag, tagging, tagset, tagset_tag};
use crate::error::AppError;
use crate::models::activity::{ActivityView, EPOCH_TIME, UNKNOWN_LANGUAGE};
use crate::models::source::SourceResponse;
use crate::services::sources;

/// Per (tagset, trained sources) group, the user's best model: highest score,
/// then most recently trained.
const BEST_MODELS_SQL: &str = r#"
SELECT DISTINCT ON (m.tagset_id, COALESCE(ms.sources, '[]'::jsonb)) m.id AS id
FROM model AS m
LEFT JOIN (
    SELECT model_id, jsonb_agg(source_id ORDER BY source_id) AS sources
    FROM model_source
    GROUP BY model_id
) AS ms ON ms.model_id = m.id
WHERE m.user_id = $1
ORDER BY m.tagset_id, COALESCE(ms.sources, '[]'::jsonb), m.score DESC, m.trained_at DESC
"#;

const ADD_TAGGINGS_SQL: &str = r#"
INSERT INTO tagging (tag_id, data_id, tagged_at)
SELECT tag.id, $1, now()
FROM tag
WHERE tag.user_id = $2 AND tag.name = ANY($3)
ON CONFLICT DO NOTHING
"#;

const REMOVE_TAGGINGS_SQL: &str = r#"
DELETE FROM tagging
USING tag
WHERE tagging.tag_id = tag.id
  AND tagging.data_id = $1
  AND tag.user_id = $2
  AND tag.name = ANY($3)
"#;

#[derive(Debug, FromQueryResult)]
struct BestModel {
    id: String,
}

/// Listing filter; `source_ids` must already be ownership-checked.
#[derive(Debug, Default)]
pub struct ActivityFilter {
    pub source_ids: Vec<i32>,
    pub max_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub tagset_ids: Option<Vec<i32>>,
    pub random: bool,
    pub count: u64,
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    filter: &ActivityFilter,
) -> Result<Vec<data::Model>, DbErr> {
    if filter.source_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut select =
        data::Entity::find().filter(data::Column::SourceId.is_in(filter.source_ids.clone()));

    if let Some(max_id) = &filter.max_id {
        select = select.filter(data::Column::ObjectId.lt(max_id.as_str()));
    }
    if let Some(since) = filter.since {
        select = select.filter(data::Column::CreatedTime.gte(since));
    }
    if let Some(until) = filter.until {
        select = select.filter(data::Column::CreatedTime.lte(until));
    }
    if let Some(tagset_ids) = &filter.tagset_ids {
        let owned_tagsets = SeaQuery::select()
            .column(tagset::Column::Id)
            .from(tagset::Entity)
            .and_where(tagset::Column::Id.is_in(tagset_ids.clone()))
            .and_where(tagset::Column::UserId.eq(user_id))
            .to_owned();
        let tag_ids = SeaQuery::select()
            .column(tagset_tag::Column::TagId)
            .from(tagset_tag::Entity)
            .and_where(tagset_tag::Column::TagsetId.in_subquery(owned_tagsets))
            .to_owned();
        select = select.filter(
            data::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(tagging::Column::DataId)
                    .from(tagging::Entity)
                    .and_where(tagging::Column::TagId.in_subquery(tag_ids))
                    .to_owned(),
            ),
        );
    }

    order_and_limit(select, filter.random, filter.count)
        .all(conn)
        .await
}

/// Activities in `source_ids` tagged with at least one of `tag_ids`.
pub async fn list_tagged<C: ConnectionTrait>(
    conn: &C,
    source_ids: &[i32],
    tag_ids: &[i32],
    random: bool,
    count: u64,
) -> Result<Vec<data::Model>, DbErr> {
    if source_ids.is_empty() || tag_ids.is_empty() {
        return Ok(Vec::new());
    }

    let select = data::Entity::find()
        .filter(data::Column::SourceId.is_in(source_ids.to_vec()))
        .filter(data::Column::Id.in_subquery(data_ids_tagged_with(tag_ids)));

    order_and_limit(select, random, count).all(conn).await
}

fn data_ids_tagged_with(tag_ids: &[i32]) -> SelectStatement {
    SeaQuery::select()
        .column(tagging::Column::DataId)
        .from(tagging::Entity)
        .and_where(tagging::Column::TagId.is_in(tag_ids.to_vec()))
        .to_owned()
}

fn order_and_limit(select: Select<data::Entity>, random: bool, count: u64) -> Select<data::Entity> {
    let select = if random {
        select.order_by(Expr::cust("RANDOM()"), Order::Asc)
    } else {
        select
            .order_by_with_nulls(data::Column::CreatedTime, Order::Desc, NullOrdering::Last)
            .order_by_desc(data::Column::Id)
    };
    select.limit(Some(count))
}

/// Look up one activity through a source owned by `user_id`.
pub async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    source_id: i32,
    object_id: &str,
) -> Result<(source::Model, data::Model), AppError> {
    let not_found = || {
        AppError::NotFound(format!(
            "No activity found for user and {source_id} -> {object_id}"
        ))
    };

    let source = match sources::find_owned(conn, user_id, source_id).await {
        Ok(source) => source,
        Err(AppError::NotFound(_)) => return Err(not_found()),
        Err(e) => return Err(e),
    };

    let data = data::Entity::find()
        .filter(data::Column::SourceId.eq(source.id))
        .filter(data::Column::ObjectId.eq(object_id))
        .one(conn)
        .await?
        .ok_or_else(not_found)?;

    Ok((source, data))
}

/// Validate `payload` against the source's layout and store it unless
/// `(source, object_id)` already exists. Returns whether a row was inserted.
pub async fn import<C: ConnectionTrait>(
    conn: &C,
    source: &source::Model,
    object_id: &str,
    payload: Value,
    language: Option<String>,
) -> Result<bool, AppError> {
    let parsed = ActivityPayload::parse(source.source_type, &payload)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let created_time = parsed
        .created_time()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let model = data::ActiveModel {
        source_id: Set(source.id),
        object_id: Set(object_id.to_string()),
        text: Set(parsed.text()),
        created_time: Set(created_time),
        language: Set(language),
        payload: Set(payload),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = data::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([data::Column::SourceId, data::Column::ObjectId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Apply a tag diff to one activity. Unknown tag names are ignored; adding an
/// existing tagging or removing a missing one is a no-op.
pub async fn patch_tags<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    data_id: i32,
    add: &[String],
    remove: &[String],
) -> Result<(), DbErr> {
    if !add.is_empty() {
        conn.execute_raw(Statement::from_sql_and_values(
            DbBackend::Postgres,
            ADD_TAGGINGS_SQL,
            [data_id.into(), user_id.into(), add.to_vec().into()],
        ))
        .await?;
    }
    if !remove.is_empty() {
        conn.execute_raw(Statement::from_sql_and_values(
            DbBackend::Postgres,
            REMOVE_TAGGINGS_SQL,
            [data_id.into(), user_id.into(), remove.to_vec().into()],
        ))
        .await?;
    }
    Ok(())
}

/// Tag names per activity id, sorted.
async fn tags_by_data<C: ConnectionTrait>(
    conn: &C,
    data_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, DbErr> {
    let taggings = tagging::Entity::find()
        .filter(tagging::Column::DataId.is_in(data_ids.to_vec()))
        .all(conn)
        .await?;
    if taggings.is_empty() {
        return Ok(HashMap::new());
    }

    let tag_ids: BTreeSet<i32> = taggings.iter().map(|t| t.tag_id).collect();
    let names: HashMap<i32, String> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut out: HashMap<i32, Vec<String>> = HashMap::new();
    for t in taggings {
        if let Some(name) = names.get(&t.tag_id) {
            out.entry(t.data_id).or_default().push(name.clone());
        }
    }
    for tags in out.values_mut() {
        tags.sort();
    }
    Ok(out)
}

pub async fn tags_of<C: ConnectionTrait>(conn: &C, data_id: i32) -> Result<Vec<String>, DbErr> {
    Ok(tags_by_data(conn, &[data_id])
        .await?
        .remove(&data_id)
        .unwrap_or_default())
}

async fn best_model_ids<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Vec<String>, DbErr> {
    let rows = BestModel::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        BEST_MODELS_SQL,
        [user_id.into()],
    ))
    .all(conn)
    .await?;
    Ok(rows.into_iter().map(|m| m.id).collect())
}

/// Tag name -> score per activity id, using the user's best models only.
async fn predictions_by_data<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    data_ids: &[i32],
) -> Result<HashMap<i32, BTreeMap<String, f64>>, DbErr> {
    let best = best_model_ids(conn, user_id).await?;
    if best.is_empty() {
        return Ok(HashMap::new());
    }

    let predictions = prediction::Entity::find()
        .filter(prediction::Column::DataId.is_in(data_ids.to_vec()))
        .filter(prediction::Column::ModelId.is_in(best))
        .all(conn)
        .await?;

    let scored: Vec<(i32, Vec<(i32, f64)>)> = predictions
        .iter()
        .map(|p| (p.data_id, prediction_pairs(&p.prediction)))
        .collect();
    let tag_ids: BTreeSet<i32> = scored
        .iter()
        .flat_map(|(_, pairs)| pairs.iter().map(|(id, _)| *id))
        .collect();
    if tag_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let names: HashMap<i32, String> = tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut out: HashMap<i32, BTreeMap<String, f64>> = HashMap::new();
    for (data_id, pairs) in scored {
        let entry = out.entry(data_id).or_default();
        for (tag_id, score) in pairs {
            if let Some(name) = names.get(&tag_id) {
                entry.insert(name.clone(), score);
            }
        }
    }
    Ok(out)
}

/// Decode a stored `[[tag_id, score], ...]` prediction. Malformed entries are skipped.
fn prediction_pairs(value: &Value) -> Vec<(i32, f64)> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            let tag_id = i32::try_from(pair.first()?.as_i64()?).ok()?;
            let score = pair.get(1)?.as_f64()?;
            Some((tag_id, score))
        })
        .collect()
}

/// Build client views for `rows`, preserving their order.
pub async fn render<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    rows: Vec<data::Model>,
) -> Result<Vec<ActivityView>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let data_ids: Vec<i32> = rows.iter().map(|d| d.id).collect();
    let source_ids: BTreeSet<i32> = rows.iter().map(|d| d.source_id).collect();

    let sources: HashMap<i32, source::Model> = source::Entity::find()
        .filter(source::Column::Id.is_in(source_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let mut tags = tags_by_data(conn, &data_ids).await?;
    let mut predictions = predictions_by_data(conn, user_id, &data_ids).await?;

    let views = rows
        .into_iter()
        .filter_map(|data| {
            let source = SourceResponse::from(sources.get(&data.source_id)?.clone());
            let tags = tags.remove(&data.id).unwrap_or_default();
            let prediction = predictions.remove(&data.id).unwrap_or_default();
            Some(view(data.into(), source, tags, prediction))
        })
        .collect();
    Ok(views)
}

pub async fn render_one<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    data: data::Model,
) -> Result<Option<ActivityView>, DbErr> {
    Ok(render(conn, user_id, vec![data]).await?.into_iter().next())
}

/// Stored columns a view is built from.
struct StoredActivity {
    object_id: String,
    payload: Value,
    text: Option<String>,
    created_time: Option<DateTime<Utc>>,
    language: Option<String>,
}

impl From<data::Model> for StoredActivity {
    fn from(d: data::Model) -> Self {
        Self {
            object_id: d.object_id,
            payload: d.payload,
            text: d.text,
            created_time: d.created_time,
            language: d.language,
        }
    }
}

fn view(
    stored: StoredActivity,
    source: SourceResponse,
    tags: Vec<String>,
    prediction: BTreeMap<String, f64>,
) -> ActivityView {
    let parsed = ActivityPayload::parse(source.source_type, &stored.payload).ok();
    let id = parsed
        .as_ref()
        .and_then(ActivityPayload::id)
        .unwrap_or(stored.object_id);
    let user = parsed.as_ref().and_then(ActivityPayload::user);

    ActivityView {
        id,
        user,
        text: stored.text.unwrap_or_default(),
        source,
        tags,
        created_time: stored
            .created_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| EPOCH_TIME.to_string()),
        language: stored
            .language
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        prediction,
    }
}
