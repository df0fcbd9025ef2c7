use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prediction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub data_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub model_id: String,
    #[sea_orm(belongs_to, from = "data_id", to = "id")]
    pub data: Option<super::data::Entity>,
    #[sea_orm(belongs_to, from = "model_id", to = "id")]
    pub model: Option<super::model::Entity>,

    /// `[[tag_id, score], ...]`
    #[sea_orm(column_type = "JsonBinary")]
    pub prediction: serde_json::Value,
}

impl ActiveModelBehavior for ActiveModel {}
