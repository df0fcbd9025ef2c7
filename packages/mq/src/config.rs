/// Connection settings for the broker pool.
pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

impl From<&common::config::MqAppConfig> for MqConfig {
    fn from(app: &common::config::MqAppConfig) -> Self {
        Self {
            url: app.url.clone(),
            pool_size: app.pool_size,
        }
    }
}
