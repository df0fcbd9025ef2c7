use std::sync::Arc;

use chrono::Utc;
use common::TaskEvent;
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde_json::Value;
use tracing::{error, info};

use crate::entity::task_result;

/// Consume worker task events from the result queue into the result store.
pub async fn consume_task_events(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting task event consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded so events for one task apply in order
            None,
            move |message: BrokerMessage<TaskEvent>| {
                let db = db.clone();
                async move {
                    let event = message.payload;
                    let task_id = event.task_id().to_string();

                    if let Err(e) = record_event(&db, event).await {
                        error!(task_id = %task_id, error = %e, "Failed to record task event");
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Task event consumer stopped unexpectedly");
    }
}

/// Upsert the event into `task_result`.
///
/// A final state is never overwritten by a late `started` event.
pub async fn record_event<C: ConnectionTrait>(conn: &C, event: TaskEvent) -> Result<(), DbErr> {
    let state = event.state();
    let task_id = event.task_id().to_string();

    if !state.is_final()
        && let Some(existing) = task_result::Entity::find_by_id(task_id.clone())
            .one(conn)
            .await?
        && existing.state.is_final()
    {
        info!(task_id = %task_id, "Ignoring stale start event");
        return Ok(());
    }

    let (output, error): (Option<Value>, Option<String>) = match event {
        TaskEvent::Started { .. } => (None, None),
        TaskEvent::Succeeded { output, .. } => (Some(output), None),
        TaskEvent::Failed { error, .. } => (None, Some(error)),
    };

    let model = task_result::ActiveModel {
        task_id: Set(task_id.clone()),
        state: Set(state),
        output: Set(output),
        error: Set(error),
        updated_at: Set(Utc::now()),
    };

    task_result::Entity::insert(model)
        .on_conflict(
            OnConflict::column(task_result::Column::TaskId)
                .update_columns([
                    task_result::Column::State,
                    task_result::Column::Output,
                    task_result::Column::Error,
                    task_result::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    info!(task_id = %task_id, state = %state, "Recorded task event");
    Ok(())
}
