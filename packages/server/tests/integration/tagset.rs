use serde_json::json;

use crate::common::{TestApp, routes};

mod crud {
    use super::*;

    #[tokio::test]
    async fn created_tagset_ensures_its_tags() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::TAGSETS,
                &json!({"title": "Sentiment", "tags": ["positive", "negative", "positive"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(res.location.as_deref(), Some(routes::tagset(id).as_str()));
        assert_eq!(res.body["tags"], json!(["negative", "positive"]));

        let tags = app.get_with_token(routes::TAGS, &token).await;
        assert_eq!(tags.body["tags"], json!(["negative", "positive"]));

        let list = app.get_with_token(routes::TAGSETS, &token).await;
        assert_eq!(list.status, 200);
        assert_eq!(list.body["tagSets"][0]["title"], "Sentiment");
    }

    #[tokio::test]
    async fn patch_adds_tags_and_renames() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_tagset(&token, "Sentiment", &["positive"]).await;

        let res = app
            .patch_with_token(
                &routes::tagset(id),
                &json!({"title": "Mood", "tags": ["negative"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Mood");
        assert_eq!(res.body["tags"], json!(["negative", "positive"]));
    }

    #[tokio::test]
    async fn patch_cannot_change_the_id() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_tagset(&token, "Sentiment", &[]).await;

        let res = app
            .patch_with_token(&routes::tagset(id), &json!({"id": id + 1}), &token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn other_users_tagset_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_tagset(&alice, "Sentiment", &["positive"]).await;

        assert_eq!(app.get_with_token(&routes::tagset(id), &bob).await.status, 404);
        assert_eq!(app.delete_with_token(&routes::tagset(id), &bob).await.status, 404);
        assert_eq!(app.get_with_token(&routes::tagset(id), &alice).await.status, 200);
    }

    #[tokio::test]
    async fn delete_removes_models_trained_on_it() {
        let app = TestApp::spawn().await;
        let (user_id, token) = app.create_user("alice@example.com", &[]).await;
        let source = app.create_source(&token, "generic").await;
        let id = app.create_tagset(&token, "Sentiment", &["positive"]).await;
        app.insert_model("m-1", user_id, id, 0.9, &[source]).await;

        let res = app.delete_with_token(&routes::tagset(id), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(app.get_with_token(&routes::tagset(id), &token).await.status, 404);
        assert_eq!(app.get_with_token(&routes::model("m-1"), &token).await.status, 403);
    }
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn put_and_delete_tag_are_idempotent() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_tagset(&token, "Sentiment", &[]).await;

        for _ in 0..2 {
            let res = app
                .put_with_token(&routes::tagset_tag(id, "positive"), &json!({}), &token)
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.body["tags"], json!(["positive"]));
        }

        for _ in 0..2 {
            let res = app
                .delete_with_token(&routes::tagset_tag(id, "positive"), &token)
                .await;
            assert_eq!(res.status, 204);
        }

        let set = app.get_with_token(&routes::tagset(id), &token).await;
        assert_eq!(set.body["tags"], json!([]));
        let tags = app.get_with_token(routes::TAGS, &token).await;
        assert_eq!(tags.body["tags"], json!(["positive"]), "tag itself survives");
    }

    #[tokio::test]
    async fn activities_tagged_with_any_member_are_listed() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let source = app.create_source(&token, "generic").await;
        for (id, day) in [("c1", "06"), ("c2", "07"), ("c3", "08")] {
            app.import_comment(&token, source, id, "text", &format!("2017-04-{day}T10:00:00+00:00"))
                .await;
        }
        let tagset = app.create_tagset(&token, "Sentiment", &["positive", "negative"]).await;
        app.put_with_token(&routes::tag("other"), &json!({}), &token).await;
        app.patch_with_token(&routes::activity_tags(source, "c1"), &json!({"add": ["positive"]}), &token)
            .await;
        app.patch_with_token(&routes::activity_tags(source, "c2"), &json!({"add": ["negative"]}), &token)
            .await;
        app.patch_with_token(&routes::activity_tags(source, "c3"), &json!({"add": ["other"]}), &token)
            .await;

        let res = app
            .get_with_token(&routes::tagset_activities(tagset), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let ids: Vec<&str> = res.body["activities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }
}
