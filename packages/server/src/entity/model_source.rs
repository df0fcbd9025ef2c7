use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sources whose activities a model was trained on.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model_source")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub model_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_id: i32,
    #[sea_orm(belongs_to, from = "model_id", to = "id")]
    pub model: Option<super::model::Entity>,
    #[sea_orm(belongs_to, from = "source_id", to = "id")]
    pub source: Option<super::source::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
