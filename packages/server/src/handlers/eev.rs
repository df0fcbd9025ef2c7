use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{info, instrument, warn};

use crate::entity::role;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    get,
    path = "/eev/login/{channel_id}/{user_id}",
    tag = "Eev",
    operation_id = "eevLogin",
    summary = "Hand an API session to the chatbot",
    description = "Stores a token in the bot framework's per-user state. A tagger logging in as \
                   themselves gets their own token, everybody else the demo user's.",
    params(
        ("channel_id" = String, Path, description = "Bot framework channel"),
        ("user_id" = String, Path, description = "Bot framework user id"),
    ),
    responses(
        (status = 200, description = "Session stored", body = String, example = "ok"),
        (status = 403, description = "Missing role or the bot framework refused (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn eev_login(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((channel_id, bot_user_id)): Path<(String, String)>,
) -> Result<(StatusCode, &'static str), AppError> {
    auth_user.require_any_role(&[role::ADMIN, role::TAGGER])?;

    let as_self =
        bot_user_id == auth_user.user_id.to_string() && auth_user.has_role(role::TAGGER);
    let (uid, email, roles) = if as_self {
        (auth_user.user_id, auth_user.email.clone(), auth_user.roles.clone())
    } else {
        let demo = state
            .demo_user
            .as_ref()
            .ok_or_else(|| AppError::Internal("demo user is not configured".into()))?;
        (demo.id, demo.email.clone(), demo.roles.clone())
    };

    let auth = &state.config.auth;
    let token = jwt::sign(uid, &email, roles, &auth.jwt_secret, auth.token_ttl_days)
        .map_err(|e| AppError::Internal(format!("JWT error: {e}")))?;

    match state
        .bot
        .store_session(&channel_id, &bot_user_id, &token, &email)
        .await
    {
        Ok(true) => {
            info!(channel_id = %channel_id, as_self, "Bot session stored");
            Ok((StatusCode::OK, "ok"))
        }
        Ok(false) => Ok((StatusCode::FORBIDDEN, "failed")),
        Err(e) => {
            warn!(error = %e, "Bot framework request failed");
            Ok((StatusCode::FORBIDDEN, "failed"))
        }
    }
}
