use common::TaskState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Result store: the last event the worker reported for a task.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_result")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,

    pub state: TaskState,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub output: Option<serde_json::Value>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
