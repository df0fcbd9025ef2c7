use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::{error, info};

use crate::config::JobsConfig;
use crate::entity::{job, task_result};

/// Periodically drop results of tasks no job row refers to.
///
/// Predictions and mails never get a job row, and a deleted job can receive a
/// late event after its result was removed.
pub async fn run_result_sweeper(db: DatabaseConnection, config: JobsConfig) {
    let ttl = chrono::Duration::seconds(config.result_ttl_secs as i64);

    info!(
        ttl_secs = config.result_ttl_secs,
        sweep_interval_secs = config.result_sweep_interval_secs,
        "Starting task result sweeper"
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(std::cmp::Ord::max(config.result_sweep_interval_secs, 1)));

    loop {
        interval.tick().await;

        if let Err(e) = sweep_results(&db, ttl).await {
            error!(error = %e, "Task result sweep failed");
        }
    }
}

/// Delete untracked results last updated more than `ttl` ago. Returns the
/// number of rows removed.
pub async fn sweep_results(db: &DatabaseConnection, ttl: chrono::Duration) -> Result<u64, DbErr> {
    let threshold = Utc::now() - ttl;

    let removed = task_result::Entity::delete_many()
        .filter(task_result::Column::UpdatedAt.lt(threshold))
        .filter(
            task_result::Column::TaskId.not_in_subquery(
                SeaQuery::select()
                    .column(job::Column::Id)
                    .from(job::Entity)
                    .to_owned(),
            ),
        )
        .exec(db)
        .await?
        .rows_affected;

    if removed > 0 {
        info!(count = removed, "Swept stale task results");
    }
    Ok(removed)
}
