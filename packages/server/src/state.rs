use std::sync::Arc;

use mq::TaskQueue;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::bot::BotFrameworkClient;
use crate::services::mail::Mailer;
use crate::services::users::DemoUser;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub tasks: Arc<dyn TaskQueue>,
    pub mailer: Mailer,
    pub bot: BotFrameworkClient,
    /// Account whose credentials anonymous UI visitors borrow. `None` when the
    /// configured demo account does not exist.
    pub demo_user: Option<DemoUser>,
}
