use chrono::Utc;
use sea_orm::*;

use crate::entity::{user, user_role};
use crate::utils::hash;

/// The account anonymous visitors act as.
#[derive(Debug, Clone)]
pub struct DemoUser {
    pub id: i32,
    pub email: String,
    pub roles: Vec<String>,
}

pub async fn roles_of<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Vec<String>, DbErr> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .order_by_asc(user_role::Column::Role)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|r| r.role).collect())
}

pub async fn load_demo_user(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<DemoUser>, DbErr> {
    let Some(user) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let roles = roles_of(db, user.id).await?;
    Ok(Some(DemoUser {
        id: user.id,
        email: user.email,
        roles,
    }))
}

/// Create an account with the given roles. Accounts are provisioned by
/// operators; there is no public sign-up.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    roles: &[&str],
) -> anyhow::Result<user::Model> {
    let password = hash::hash_password(password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {e}"))?;

    let txn = db.begin().await?;
    let user = user::ActiveModel {
        email: Set(email.trim().to_string()),
        password: Set(password),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for &role in roles {
        user_role::ActiveModel {
            user_id: Set(user.id),
            role: Set(role.to_string()),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    Ok(user)
}
