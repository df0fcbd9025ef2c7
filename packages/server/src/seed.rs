use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{data, model_source, prediction, role, tag, tagging};

/// Roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &[role::ADMIN, role::TAGGER];

/// Seed the `role` table with defaults.
pub async fn seed_roles(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new roles", inserted);
    }
    Ok(())
}

/// Ensure composite indexes exist.
///
/// Schema sync only handles single-column constraints, so the uniqueness of
/// `(source_id, object_id)` and `(user_id, name)` is created here. The
/// insert-or-ignore paths for activities and tags rely on them.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "uq_data_source_object",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_data_source_object")
                .table(data::Entity)
                .col(data::Column::SourceId)
                .col(data::Column::ObjectId)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "uq_tag_user_name",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_tag_user_name")
                .table(tag::Entity)
                .col(tag::Column::UserId)
                .col(tag::Column::Name)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_tagging_data",
            Index::create()
                .if_not_exists()
                .name("idx_tagging_data")
                .table(tagging::Entity)
                .col(tagging::Column::DataId)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_prediction_model",
            Index::create()
                .if_not_exists()
                .name("idx_prediction_model")
                .table(prediction::Entity)
                .col(prediction::Column::ModelId)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_model_source_source",
            Index::create()
                .if_not_exists()
                .name("idx_model_source_source")
                .table(model_source::Entity)
                .col(model_source::Column::SourceId)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        // Unique indexes are load-bearing, so their failure aborts startup.
        let unique = name.starts_with("uq_");
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) if unique => return Err(e),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
