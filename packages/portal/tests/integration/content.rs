use std::sync::atomic::Ordering;

use sea_orm::ConnectionTrait;
use serde_json::json;

use crate::common::{TestApp, routes};

mod images {
    use super::*;

    #[tokio::test]
    async fn designer_generates_a_stored_and_logged_image() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"prompt": "A lighthouse at dawn", "style": "watercolor"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["provider"], "stub-image");
        assert_eq!(res.body["attempts"], 1);
        let filename = res.body["filename"].as_str().unwrap();
        assert!(filename.starts_with("img_") && filename.ends_with(".png"));
        assert_eq!(res.body["image_url"], format!("/images/{filename}"));
        assert!(app.images_dir.join(filename).exists());

        let entry = app
            .get_with_token(
                &routes::history_entry(res.body["history_id"].as_i64().unwrap() as i32),
                &token,
            )
            .await;
        assert_eq!(entry.body["action_type"], "image_gen");
        assert_eq!(entry.body["input"], "A lighthouse at dawn");
        assert_eq!(entry.body["style"], "watercolor");
        assert_eq!(entry.body["result"], filename);
        assert_eq!(entry.body["username"], "dana_design");
    }

    #[tokio::test]
    async fn stored_image_is_served_publicly() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;
        let body = app.generate_image(&token, "A red umbrella").await;

        let res = app
            .client
            .get(app.url(body["image_url"].as_str().unwrap()))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn unknown_image_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/images/img_missing.png").await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn identical_output_reuses_the_same_file() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let first = app.generate_image(&token, "A calm sea").await;
        let second = app.generate_image(&token, "A calm sea").await;

        assert_eq!(first["filename"], second["filename"]);
        assert_ne!(first["history_id"], second["history_id"]);
        assert_eq!(app.history_rows().await, 2);
    }

    #[tokio::test]
    async fn failed_logging_never_removes_a_logged_image() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let failing_id = app.create_user(&admin, "fay_fails", "designer").await;
        app.create_user(&admin, "sam_succeeds", "designer").await;
        let failing = app.login("fay_fails", "password123").await;
        let succeeding = app.login("sam_succeeds", "password123").await;
        app.db
            .execute_unprepared(&format!(
                "CREATE TRIGGER reject_history BEFORE INSERT ON content_history \
                 WHEN NEW.user_id = {failing_id} \
                 BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;"
            ))
            .await
            .unwrap();

        let res = app
            .post_with_token(routes::IMAGES, &json!({"prompt": "A lone pier"}), &failing)
            .await;
        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert_eq!(std::fs::read_dir(&app.images_dir).unwrap().count(), 0);

        for round in 0..5 {
            let prompt = json!({"prompt": format!("A harbour, take {round}")});
            let (failed, logged) = tokio::join!(
                app.post_with_token(routes::IMAGES, &prompt, &failing),
                app.post_with_token(routes::IMAGES, &prompt, &succeeding),
            );
            assert_eq!(failed.status, 500, "{}", failed.text);
            assert_eq!(logged.status, 201, "{}", logged.text);
            let filename = logged.body["filename"].as_str().unwrap();
            assert!(app.images_dir.join(filename).exists(), "round {round}");
        }
        assert_eq!(app.history_rows().await, 5);
    }

    #[tokio::test]
    async fn admin_may_generate_images() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        app.generate_image(&admin, "A mountain cabin").await;
    }

    #[tokio::test]
    async fn writer_is_forbidden_and_nothing_is_logged() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("walt_writer", "writer").await;

        let res = app
            .post_with_token(routes::IMAGES, &json!({"prompt": "A lighthouse"}), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert_eq!(app.image_provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.history_rows().await, 0);
    }

    #[tokio::test]
    async fn banned_prompt_is_blocked_before_the_provider() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"prompt": "A battlefield covered in BLOOD"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CONTENT_BLOCKED");
        assert_eq!(
            res.body["message"],
            "Content blocked by ethics policy: contains banned term 'blood'"
        );
        assert_eq!(app.image_provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.history_rows().await, 0);
    }

    #[tokio::test]
    async fn exhausted_quota_is_not_retried() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(routes::IMAGES, &json!({"prompt": "quota test"}), &token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "PROVIDER_QUOTA_EXCEEDED");
        assert_eq!(app.image_provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.history_rows().await, 0);
    }

    #[tokio::test]
    async fn persistent_throttling_reports_busy_after_all_attempts() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(routes::IMAGES, &json!({"prompt": "busy harbour"}), &token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "PROVIDER_BUSY");
        assert_eq!(app.image_provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(app.history_rows().await, 0);
    }

    #[tokio::test]
    async fn out_of_range_cfg_scale_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"prompt": "A lighthouse", "cfg_scale": 90.0}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::IMAGES, &json!({"prompt": "A lighthouse"}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod text_edits {
    use super::*;

    #[tokio::test]
    async fn writer_gets_trimmed_edited_text() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("walt_writer", "writer").await;

        let res = app
            .post_with_token(
                routes::TEXT_EDITS,
                &json!({"text": "Buy our product today", "instruction": "translate to French"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["result"], "[translate to French] Buy our product today");
        assert_eq!(res.body["provider"], "stub-text");

        let entry = app
            .get_with_token(
                &routes::history_entry(res.body["history_id"].as_i64().unwrap() as i32),
                &token,
            )
            .await;
        assert_eq!(entry.body["action_type"], "text_edit");
        assert_eq!(entry.body["input"], "Buy our product today");
        assert_eq!(entry.body["instruction"], "translate to French");
        assert!(entry.body["image_url"].is_null());
    }

    #[tokio::test]
    async fn designer_is_forbidden() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("dana_design", "designer").await;

        let res = app
            .post_with_token(
                routes::TEXT_EDITS,
                &json!({"text": "Buy now", "instruction": "make it shorter"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert_eq!(app.text_provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.history_rows().await, 0);
    }

    #[tokio::test]
    async fn banned_term_in_instruction_is_blocked() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("walt_writer", "writer").await;

        let res = app
            .post_with_token(
                routes::TEXT_EDITS,
                &json!({"text": "Buy now", "instruction": "mention drogas"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CONTENT_BLOCKED");
        assert!(res.body["message"].as_str().unwrap().contains("drogas"));
        assert_eq!(app.text_provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_quota_is_reported() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("walt_writer", "writer").await;

        let res = app
            .post_with_token(
                routes::TEXT_EDITS,
                &json!({"text": "Buy now", "instruction": "quota please"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "PROVIDER_QUOTA_EXCEEDED");
        assert_eq!(app.history_rows().await, 0);
    }
}
