use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::EevConfig;

const TOKEN_SCOPE: &str = "https://api.botframework.com/.default";

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Client for the bot framework's token and user state endpoints.
#[derive(Clone)]
pub struct BotFrameworkClient {
    http: Client,
    config: EevConfig,
}

impl BotFrameworkClient {
    pub fn new(config: EevConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Store `{jwt, name}` as the bot's per-user state so the chatbot can call
    /// the API on the user's behalf. Returns whether the state service accepted it.
    pub async fn store_session(
        &self,
        channel_id: &str,
        user_id: &str,
        jwt: &str,
        name: &str,
    ) -> Result<bool, reqwest::Error> {
        let access_token = self.fetch_access_token().await?;

        let url = format!(
            "{}/botstate/{}/users/{}",
            self.config.state_base_url.trim_end_matches('/'),
            channel_id,
            user_id
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "data": {"jwt": jwt, "name": name},
                "etag": "*",
            }))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() != 200 {
            warn!(%status, channel_id, user_id, "Bot state update rejected");
        }
        Ok(status.as_u16() == 200)
    }

    async fn fetch_access_token(&self) -> Result<String, reqwest::Error> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await?;
        let token: TokenResponse = resp.json().await?;
        debug!(empty = token.access_token.is_empty(), "Fetched bot framework token");
        Ok(token.access_token)
    }
}
