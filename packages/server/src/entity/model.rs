use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A trained classifier. Rows are written by the brain worker, never by the API.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub score: f64,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub params: Option<serde_json::Value>,
    pub trained_at: DateTimeUtc,

    #[sea_orm(indexed)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub tagset_id: i32,
    #[sea_orm(belongs_to, from = "tagset_id", to = "id")]
    pub tagset: HasOne<super::tagset::Entity>,

    #[sea_orm(has_many)]
    pub sources: HasMany<super::model_source::Entity>,

    #[sea_orm(has_many)]
    pub predictions: HasMany<super::prediction::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
