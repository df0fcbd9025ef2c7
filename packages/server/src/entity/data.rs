use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single imported activity (post, comment, message).
///
/// `(source_id, object_id)` is unique; see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub source_id: i32,
    #[sea_orm(belongs_to, from = "source_id", to = "id")]
    pub source: HasOne<super::source::Entity>,

    /// Platform-side id of the activity.
    pub object_id: String,

    /// Raw platform object, layout depends on the source type.
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: serde_json::Value,

    #[sea_orm(column_type = "Text", nullable)]
    pub text: Option<String>,
    #[sea_orm(indexed)]
    pub created_time: Option<DateTimeUtc>,
    pub language: Option<String>,

    #[sea_orm(has_many)]
    pub taggings: HasMany<super::tagging::Entity>,

    #[sea_orm(has_many)]
    pub predictions: HasMany<super::prediction::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
