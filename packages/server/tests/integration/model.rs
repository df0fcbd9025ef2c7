use ::common::{TaskEvent, TaskName};
use serde_json::json;

use crate::common::{TestApp, routes};

/// An admin with one source and one tagset, ready to train.
async fn trainer(app: &TestApp) -> (i32, String, i32, i32) {
    let (user_id, token) = app.create_user("admin@example.com", &["admin"]).await;
    let source = app.create_source(&token, "generic").await;
    let tagset = app.create_tagset(&token, "Sentiment", &["positive", "negative"]).await;
    (user_id, token, source, tagset)
}

mod train {
    use super::*;

    #[tokio::test]
    async fn requires_admin() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let source = app.create_source(&token, "generic").await;
        let tagset = app.create_tagset(&token, "Sentiment", &["positive"]).await;

        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": tagset, "source_ids": [source]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert!(app.tasks.sent().is_empty());
    }

    #[tokio::test]
    async fn accepts_then_conflicts() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let body = json!({"tagset_id": tagset, "source_ids": [source]});

        let first = app.post_with_token(routes::MODEL_TRAIN, &body, &token).await;
        assert_eq!(first.status, 202, "{}", first.text);
        let job = first.body["job"].as_str().unwrap().to_string();
        assert_eq!(first.body["url"], routes::job(&job));
        assert_eq!(first.location.as_deref(), Some(routes::job(&job).as_str()));

        let task = app.tasks.wait_for(TaskName::TrainModel).await;
        assert_eq!(task.id, job);
        assert_eq!(task.args, vec![json!(tagset), json!([source])]);
        assert_eq!(task.kwargs["n_estimators"], 1);

        let second = app.post_with_token(routes::MODEL_TRAIN, &body, &token).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["job"], job.as_str());
        assert_eq!(app.tasks.sent().len(), 1);
    }

    #[tokio::test]
    async fn foreign_tagset_or_source_is_forbidden() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let other = app.create_authenticated_user("bob@example.com").await;
        let other_source = app.create_source(&other, "generic").await;
        let other_tagset = app.create_tagset(&other, "Other", &["x"]).await;

        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": other_tagset, "source_ids": [source]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": tagset, "source_ids": [source, other_source]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 403);
        assert!(app.tasks.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_source_list_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token, _, tagset) = trainer(&app).await;

        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": tagset, "source_ids": []}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod jobs {
    use super::*;

    pub(super) async fn submit(app: &TestApp, token: &str, source: i32, tagset: i32) -> String {
        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": tagset, "source_ids": [source]}),
                token,
            )
            .await;
        assert_eq!(res.status, 202, "{}", res.text);
        res.body["job"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn polling_follows_the_worker() {
        let app = TestApp::spawn().await;
        let (user_id, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;

        let pending = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(pending.status, 404);

        app.record_event(TaskEvent::Started {
            task_id: job.clone(),
        })
        .await;
        let running = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(running.status, 304);
        assert_eq!(running.retry_after.as_deref(), Some("30"));
        assert_eq!(running.location.as_deref(), Some(routes::job(&job).as_str()));

        app.insert_model("m-new", user_id, tagset, 0.8, &[source]).await;
        app.record_event(TaskEvent::Succeeded {
            task_id: job.clone(),
            output: json!("m-new"),
        })
        .await;
        let done = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(done.status, 201, "{}", done.text);
        assert_eq!(done.location.as_deref(), Some("/v3/model/m-new"));
        assert_eq!(done.body, json!({"job": job, "model": "m-new"}));

        let forgotten = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(forgotten.status, 404);

        // The slot is free again.
        submit(&app, &token, source, tagset).await;
    }

    #[tokio::test]
    async fn failed_job_is_gone() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;

        app.record_event(TaskEvent::Failed {
            task_id: job.clone(),
            error: "not enough samples".into(),
        })
        .await;

        let res = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(res.status, 410);
        assert_eq!(res.body["code"], "GONE");
        assert!(res.body["error"].as_str().unwrap().contains("not enough samples"));
    }

    #[tokio::test]
    async fn late_started_event_does_not_reopen_a_finished_job() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;

        app.record_event(TaskEvent::Failed {
            task_id: job.clone(),
            error: "boom".into(),
        })
        .await;
        app.record_event(TaskEvent::Started {
            task_id: job.clone(),
        })
        .await;

        let res = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(res.status, 410);
    }

    #[tokio::test]
    async fn jobs_are_private() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let other = app.create_authenticated_user("bob@example.com").await;
        let job = submit(&app, &token, source, tagset).await;

        let peek = app.get_with_token(&routes::job(&job), &other).await;
        assert_eq!(peek.status, 404);
        assert_eq!(peek.body["code"], "NOT_FOUND");
        assert_eq!(app.delete_with_token(&routes::job(&job), &other).await.status, 404);
        assert_eq!(app.get_with_token(&routes::job("nope"), &token).await.status, 404);

        // Untouched for its owner.
        assert_eq!(app.get_with_token(routes::JOBS, &token).await.body["jobs"][0]["id"], job.as_str());
        assert!(app.tasks.revoked().is_empty());
    }

    #[tokio::test]
    async fn listing_reports_last_state() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;

        let before = app.get_with_token(routes::JOBS, &token).await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body["jobs"][0]["id"], job.as_str());
        assert!(before.body["jobs"][0]["state"].is_null());

        app.record_event(TaskEvent::Started {
            task_id: job.clone(),
        })
        .await;
        let after = app.get_with_token(routes::JOBS, &token).await;
        assert_eq!(after.body["jobs"][0]["state"], "Started");
    }

    #[tokio::test]
    async fn delete_survives_a_failed_revoke() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;
        app.tasks.fail_revokes();

        let res = app.delete_with_token(&routes::job(&job), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, json!({"job": job}));
        assert_eq!(app.tasks.revoked(), vec![format!("receipt-{job}")]);
        assert_eq!(app.get_with_token(&routes::job(&job), &token).await.status, 404);
        assert_eq!(app.get_with_token(routes::JOBS, &token).await.body["jobs"], json!([]));
    }

    #[tokio::test]
    async fn unrecorded_job_is_revoked() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let taken = submit(&app, &token, source, tagset).await;

        let (_, other) = app.create_user("second-admin@example.com", &["admin"]).await;
        let other_source = app.create_source(&other, "generic").await;
        let other_tagset = app.create_tagset(&other, "Mine", &["a"]).await;
        app.tasks.report_task_id(&taken);

        let res = app
            .post_with_token(
                routes::MODEL_TRAIN,
                &json!({"tagset_id": other_tagset, "source_ids": [other_source]}),
                &other,
            )
            .await;

        assert_eq!(res.status, 500, "{}", res.text);
        let sent = app.tasks.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(app.tasks.revoked(), vec![format!("receipt-{}", sent[1].id)]);
        assert_eq!(app.get_with_token(routes::JOBS, &other).await.body["jobs"], json!([]));
        assert_eq!(app.get_with_token(routes::JOBS, &token).await.body["jobs"][0]["id"], taken.as_str());
    }
}

mod results {
    use fanlens_server::consumers::result_sweep::sweep_results;

    use super::jobs::submit;
    use super::*;

    #[tokio::test]
    async fn sweep_drops_only_stale_untracked_results() {
        let app = TestApp::spawn().await;
        let (_, token, source, tagset) = trainer(&app).await;
        let job = submit(&app, &token, source, tagset).await;

        app.record_event(TaskEvent::Started {
            task_id: job.clone(),
        })
        .await;
        for task_id in ["stale-prediction", "fresh-prediction"] {
            app.record_event(TaskEvent::Succeeded {
                task_id: task_id.to_string(),
                output: json!({"positive": 0.9}),
            })
            .await;
        }
        app.age_result(&job, chrono::Duration::hours(2)).await;
        app.age_result("stale-prediction", chrono::Duration::hours(2)).await;

        let removed = sweep_results(&app.db, chrono::Duration::hours(1)).await.unwrap();

        assert_eq!(removed, 1);
        let res = app.get_with_token(&routes::job(&job), &token).await;
        assert_eq!(res.status, 304, "tracked results survive: {}", res.text);
        assert_eq!(
            sweep_results(&app.db, chrono::Duration::zero()).await.unwrap(),
            1,
            "only the fresh prediction is left untracked"
        );
    }
}

mod models {
    use super::*;

    #[tokio::test]
    async fn details_are_for_admins() {
        let app = TestApp::spawn().await;
        let (admin_id, admin, source, tagset) = trainer(&app).await;
        let (user_id, user) = app.create_user("alice@example.com", &[]).await;
        let user_tagset = app.create_tagset(&user, "Mine", &["a"]).await;
        app.insert_model("m-admin", admin_id, tagset, 0.7, &[source]).await;
        app.insert_model("m-user", user_id, user_tagset, 0.6, &[]).await;

        let as_admin = app.get_with_token(&routes::model("m-admin"), &admin).await;
        assert_eq!(as_admin.status, 200);
        assert_eq!(as_admin.body["score"], 0.7);
        assert_eq!(as_admin.body["params"], json!({"n_estimators": 1}));

        let as_user = app.get_with_token(&routes::model("m-user"), &user).await;
        assert_eq!(as_user.status, 200);
        assert!(as_user.body.get("score").is_none());
        assert!(as_user.body.get("params").is_none());

        assert_eq!(app.get_with_token(&routes::model("m-admin"), &user).await.status, 403);
        assert_eq!(app.get_with_token(&routes::model("missing"), &user).await.status, 403);
    }

    #[tokio::test]
    async fn search_picks_the_best_match() {
        let app = TestApp::spawn().await;
        let (user_id, token, source, tagset) = trainer(&app).await;
        let second_source = app.create_source(&token, "twitter").await;
        app.insert_model("low", user_id, tagset, 0.4, &[source]).await;
        app.insert_model("high", user_id, tagset, 0.9, &[source, second_source]).await;

        let res = app
            .post_with_token(routes::MODEL_SEARCH, &json!({"tagset_id": tagset}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], "high");

        let res = app
            .post_with_token(
                routes::MODEL_SEARCH,
                &json!({"tagset_id": tagset, "sources": [source]}),
                &token,
            )
            .await;
        assert_eq!(res.body["id"], "low");

        let res = app
            .post_with_token(routes::MODEL_SEARCH, &json!({"sources": [second_source]}), &token)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn search_needs_a_criterion() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.post_with_token(routes::MODEL_SEARCH, &json!({}), &token).await;

        assert_eq!(res.status, 400);
    }
}

mod suggestion {
    use super::*;

    #[tokio::test]
    async fn text_is_required() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(routes::MODEL_SUGGESTION, &json!({"text": "  "}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert!(app.tasks.sent().is_empty());
    }

    #[tokio::test]
    async fn predicts_free_text() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let request = app.post_with_token(
            routes::MODEL_SUGGESTION,
            &json!({"text": "love it", "model_id": "m-1"}),
            &token,
        );
        let worker = async {
            let task = app.tasks.wait_for(TaskName::PredictText).await;
            assert_eq!(task.args, vec![json!("love it")]);
            app.record_event(TaskEvent::Succeeded {
                task_id: task.id,
                output: json!([[0.9, "positive"]]),
            })
            .await;
        };
        let (res, ()) = tokio::join!(request, worker);

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, json!({"text": "love it", "suggestion": {"positive": 0.9}}));
    }

    #[tokio::test]
    async fn times_out_without_a_worker() {
        let app = TestApp::spawn_with(|config| config.jobs.predict_timeout_ms = 100).await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(routes::MODEL_SUGGESTION, &json!({"text": "hello"}), &token)
            .await;

        assert_eq!(res.status, 500);
    }
}
