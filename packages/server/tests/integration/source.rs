use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn created_source_is_listed_and_located() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::SOURCES,
                &json!({"type": "twitter", "uri": "https://twitter.com/fanlens", "slug": "fanlens"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(res.location.as_deref(), Some(routes::source(id).as_str()));
        assert_eq!(res.body["type"], "twitter");

        let list = app.get_with_token(routes::SOURCES, &token).await;
        assert_eq!(list.status, 200);
        assert_eq!(list.body["sources"].as_array().unwrap().len(), 1);
        assert_eq!(list.body["sources"][0]["slug"], "fanlens");
    }

    #[tokio::test]
    async fn client_supplied_id_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::SOURCES,
                &json!({"id": 7, "type": "facebook", "uri": "https://fb.com/x", "slug": "x"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::SOURCES,
                &json!({"type": "myspace", "uri": "https://myspace.com/x", "slug": "x"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn other_users_source_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_source(&alice, "facebook").await;

        let res = app.get_with_token(&routes::source(id), &bob).await;
        assert_eq!(res.status, 404);

        let list = app.get_with_token(routes::SOURCES, &bob).await;
        assert_eq!(list.body["sources"], json!([]));
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn uri_and_slug_can_be_changed() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_source(&token, "facebook").await;

        let res = app
            .patch_with_token(
                &routes::source(id),
                &json!({"uri": "https://fb.com/other", "slug": "other"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["uri"], "https://fb.com/other");
        assert_eq!(res.body["slug"], "other");
    }

    #[tokio::test]
    async fn id_and_type_are_immutable() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_source(&token, "facebook").await;

        let res = app
            .patch_with_token(&routes::source(id), &json!({"id": 99}), &token)
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .patch_with_token(&routes::source(id), &json!({"type": "twitter"}), &token)
            .await;
        assert_eq!(res.status, 403);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_a_source_removes_its_activities() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_source(&token, "generic").await;
        app.import_comment(&token, id, "c1", "hello", "2017-04-06T15:24:15+00:00")
            .await;
        app.put_with_token(&routes::tag("spam"), &json!({}), &token)
            .await;
        app.patch_with_token(
            &routes::activity_tags(id, "c1"),
            &json!({"add": ["spam"]}),
            &token,
        )
        .await;

        let res = app.delete_with_token(&routes::source(id), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(app.get_with_token(&routes::source(id), &token).await.status, 404);
        let activities = app.get_with_token(routes::ACTIVITIES, &token).await;
        assert_eq!(activities.body["activities"], json!([]));
        let tags = app
            .get_with_token(&format!("{}?with_count=true", routes::TAGS), &token)
            .await;
        assert_eq!(tags.body["counts"]["spam"], 0);
    }
}
