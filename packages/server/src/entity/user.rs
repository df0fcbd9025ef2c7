use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(has_many, via = "user_role")]
    pub roles: HasMany<super::role::Entity>,

    #[sea_orm(has_many)]
    pub sources: HasMany<super::source::Entity>,

    #[sea_orm(has_many)]
    pub tags: HasMany<super::tag::Entity>,

    #[sea_orm(has_many)]
    pub tagsets: HasMany<super::tagset::Entity>,

    #[sea_orm(has_many)]
    pub models: HasMany<super::model::Entity>,

    #[sea_orm(has_many)]
    pub jobs: HasMany<super::job::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
