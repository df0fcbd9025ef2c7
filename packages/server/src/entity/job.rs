use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An outstanding training task owned by a user.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job")]
pub struct Model {
    /// Task id, as reported back by the worker.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Broker message id used for cancellation.
    pub receipt: String,

    #[sea_orm(indexed)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
