use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `(user_id, name)` is unique; see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub taggings: HasMany<super::tagging::Entity>,

    #[sea_orm(has_many, via = "tagset_tag")]
    pub tagsets: HasMany<super::tagset::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
