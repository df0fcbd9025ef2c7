use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use mq::{BroccoliTaskQueue, DisabledTaskQueue, MqConfig, TaskQueue, init_mq};
use tracing::{Level, info, warn};

use fanlens_server::config::AppConfig;
use fanlens_server::consumers::{consume_task_events, run_result_sweeper};
use fanlens_server::services::bot::BotFrameworkClient;
use fanlens_server::services::mail::Mailer;
use fanlens_server::services::users;
use fanlens_server::state::AppState;
use fanlens_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    let level = config.log.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::seed_roles(&db).await.context("Failed to seed roles")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    let demo_user = users::load_demo_user(&db, &config.auth.demo_email).await?;
    if demo_user.is_none() {
        warn!(email = %config.auth.demo_email, "Demo user not found, anonymous UI visitors get no api key");
    }

    let tasks: Arc<dyn TaskQueue> = if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig::from(&config.mq))
                .await
                .context("Failed to initialize MQ")?,
        );
        info!(
            queue_name = %config.mq.queue_name,
            result_queue_name = %config.mq.result_queue_name,
            "MQ connected"
        );

        tokio::spawn(consume_task_events(
            db.clone(),
            Arc::clone(&mq),
            config.mq.result_queue_name.clone(),
        ));
        Arc::new(BroccoliTaskQueue::new(mq, config.mq.queue_name.clone()))
    } else {
        warn!("MQ disabled, training and predictions are unavailable");
        Arc::new(DisabledTaskQueue)
    };

    tokio::spawn(run_result_sweeper(db.clone(), config.jobs.clone()));

    let state = AppState {
        db,
        mailer: Mailer::new(Arc::clone(&tasks), config.mail.recipient.clone()),
        bot: BotFrameworkClient::new(config.eev.clone()),
        tasks,
        demo_user,
        config: config.clone(),
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
