use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// May train models and sees model scores and parameters.
pub const ADMIN: &str = "admin";
/// May use the tagging UI with their own token and the chatbot bridge.
pub const TAGGER: &str = "tagger";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    #[sea_orm(has_many, via = "user_role")]
    pub users: HasMany<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
