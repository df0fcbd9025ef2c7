use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_token_email_and_roles() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", &["tagger"]).await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["email"], "alice@example.com");
        assert_eq!(res.body["roles"], json!(["tagger"]));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", &[]).await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "nope"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_rejected_like_a_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ghost@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn empty_email_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::LOGIN, &json!({"email": " ", "password": "x"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod session {
    use super::*;

    #[tokio::test]
    async fn me_accepts_a_bearer_token() {
        let app = TestApp::spawn().await;
        let (id, token) = app.create_user("alice@example.com", &["admin"]).await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["email"], "alice@example.com");
        assert_eq!(res.body["roles"], json!(["admin"]));
    }

    #[tokio::test]
    async fn me_accepts_the_session_cookie() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", &[]).await;

        let login = app
            .client
            .post(app.url(routes::LOGIN))
            .json(&json!({"email": "alice@example.com", "password": PASSWORD}))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status().as_u16(), 200);
        let set_cookie = login
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let session = set_cookie.split(';').next().unwrap().to_string();
        assert!(session.starts_with("session="));

        let me = app
            .client
            .get(app.url(routes::ME))
            .header("Cookie", session)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::LOGOUT))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 204);
        let cookie = res
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(cookie.starts_with("session="));
    }
}
