//! Server-rendered shell pages. The single page app itself is served from
//! `ui.static_dir`; these pages only bootstrap it with an API key.

use axum::extract::State;
use axum::response::Html;
use tracing::{info, instrument, warn};

use crate::entity::role;
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppForm;
use crate::models::ui::ContactForm;
use crate::state::AppState;
use crate::utils::jwt;

const MAIL_SENT: &str = "Thank you for your message, we will get back to you shortly.";
const MAIL_FAILED: &str = "Sorry, your message could not be sent. Please try again later.";

/// Token embedded in the page: the caller's own when they are a tagger,
/// otherwise the demo user's. Empty when neither is available.
fn api_key(state: &AppState, caller: Option<&AuthUser>) -> String {
    let auth = &state.config.auth;
    let signed = match caller {
        Some(user) if user.has_role(role::TAGGER) => jwt::sign(
            user.user_id,
            &user.email,
            user.roles.clone(),
            &auth.jwt_secret,
            auth.token_ttl_days,
        ),
        _ => match &state.demo_user {
            Some(demo) => jwt::sign(
                demo.id,
                &demo.email,
                demo.roles.clone(),
                &auth.jwt_secret,
                auth.token_ttl_days,
            ),
            None => return String::new(),
        },
    };

    signed.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to sign UI api key");
        String::new()
    })
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_index(title: &str, api_key: &str, flash: Option<&str>) -> String {
    let flash = flash
        .map(|msg| format!(r#"<div class="flash">{}</div>"#, escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/app.css">
</head>
<body>
{flash}
<div id="app" data-api-key="{api_key}"></div>
<script>window.FANLENS_API_KEY = "{api_key}";</script>
<script src="/static/app.js"></script>
</body>
</html>
"#,
        title = escape(title),
        api_key = escape(api_key),
    )
}

#[instrument(skip(state, caller))]
pub async fn index(caller: Option<AuthUser>, State(state): State<AppState>) -> Html<String> {
    let key = api_key(&state, caller.as_ref());
    Html(render_index(&state.config.ui.title, &key, None))
}

/// Contact form target. Always answers with the landing page; the outcome is
/// shown as a flash message.
#[instrument(skip(state, caller, form))]
pub async fn send_mail(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    AppForm(form): AppForm<ContactForm>,
) -> Html<String> {
    let flash = match form.problem() {
        Some(problem) => problem,
        None => match state
            .mailer
            .send_contact_message(form.email.trim(), form.message.trim())
            .await
        {
            Ok(_) => {
                info!("Contact form accepted");
                MAIL_SENT
            }
            Err(e) => {
                warn!(error = %e, "Contact form delivery failed");
                MAIL_FAILED
            }
        },
    };

    let key = api_key(&state, caller.as_ref());
    Html(render_index(&state.config.ui.title, &key, Some(flash)))
}

pub async fn health() -> &'static str {
    "ok"
}
