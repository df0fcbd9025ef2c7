use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::entity::role;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Cookie carrying the same JWT that `/v3/auth/login` returns.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user, taken from `Authorization: Bearer <token>` or, failing
/// that, from the `session` cookie.
///
/// Add this as a handler parameter to require authentication. Use
/// `Option<AuthUser>` where anonymous visitors are allowed.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(role::ADMIN)
    }

    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Requires role '{role}'")))
        }
    }

    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AppError> {
        if roles.iter().any(|r| self.has_role(r)) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Requires one of the roles: {}",
                roles.join(", ")
            )))
        }
    }
}

/// Bearer token wins over the cookie when both are present.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(header) = parts.headers.get("Authorization") {
        let value = header.to_str().map_err(|_| AppError::TokenInvalid)?;
        return value
            .strip_prefix("Bearer ")
            .map(str::to_owned)
            .ok_or(AppError::TokenInvalid);
    }

    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AppError::TokenMissing)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = jwt::verify(&token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            email: claims.sub,
            roles: claims.roles,
        })
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}
