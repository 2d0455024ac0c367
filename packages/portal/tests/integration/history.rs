use serde_json::json;

use crate::common::{TestApp, routes};

mod listing {
    use super::*;

    #[tokio::test]
    async fn newest_entries_come_first() {
        let app = TestApp::spawn().await;
        let writer = app.create_user_with_role("walt_writer", "writer").await;
        let first = app.edit_text(&writer, "One", "shorter").await;
        let second = app.edit_text(&writer, "Two", "shorter").await;

        let res = app.get_with_token(routes::HISTORY, &writer).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["data"][0]["id"], second);
        assert_eq!(res.body["data"][1]["id"], first);
    }

    #[tokio::test]
    async fn mine_filters_to_the_caller() {
        let app = TestApp::spawn().await;
        let writer = app.create_user_with_role("walt_writer", "writer").await;
        let designer = app.create_user_with_role("dana_design", "designer").await;
        app.edit_text(&writer, "Buy now", "shorter").await;
        app.generate_image(&designer, "A lighthouse").await;

        let all = app.get_with_token(routes::HISTORY, &designer).await;
        assert_eq!(all.body["pagination"]["total"], 2);

        let mine = app
            .get_with_token(&format!("{}?mine=true", routes::HISTORY), &designer)
            .await;
        assert_eq!(mine.body["pagination"]["total"], 1);
        assert_eq!(mine.body["data"][0]["username"], "dana_design");
        assert_eq!(mine.body["data"][0]["action_type"], "image_gen");
    }

    #[tokio::test]
    async fn filters_by_action_type() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.edit_text(&admin, "Buy now", "shorter").await;
        app.generate_image(&admin, "A lighthouse").await;

        let res = app
            .get_with_token(&format!("{}?action_type=text_edit", routes::HISTORY), &admin)
            .await;

        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["action_type"], "text_edit");
    }

    #[tokio::test]
    async fn unknown_action_type_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .get_with_token(&format!("{}?action_type=video", routes::HISTORY), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app.get_with_token(&routes::history_entry(4242), &admin).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn any_role_can_comment_and_comments_list_oldest_first() {
        let app = TestApp::spawn().await;
        let writer = app.create_user_with_role("walt_writer", "writer").await;
        let designer = app.create_user_with_role("dana_design", "designer").await;
        let entry = app.edit_text(&writer, "Buy now", "shorter").await;

        let first = app
            .post_with_token(
                &routes::comments(entry),
                &json!({"text": "  Love it  "}),
                &designer,
            )
            .await;
        assert_eq!(first.status, 201, "{}", first.text);
        assert_eq!(first.body["text"], "Love it");
        assert_eq!(first.body["username"], "dana_design");
        assert_eq!(first.body["content_id"], entry);

        let second = app
            .post_with_token(&routes::comments(entry), &json!({"text": "Thanks"}), &writer)
            .await;
        assert_eq!(second.status, 201);

        let res = app.get_with_token(&routes::comments(entry), &writer).await;
        assert_eq!(res.status, 200);
        let texts: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, ["Love it", "Thanks"]);
    }

    #[tokio::test]
    async fn blank_comment_is_rejected() {
        let app = TestApp::spawn().await;
        let writer = app.create_user_with_role("walt_writer", "writer").await;
        let entry = app.edit_text(&writer, "Buy now", "shorter").await;

        let res = app
            .post_with_token(&routes::comments(entry), &json!({"text": "   "}), &writer)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn commenting_on_a_missing_entry_is_not_found() {
        let app = TestApp::spawn().await;
        let writer = app.create_user_with_role("walt_writer", "writer").await;

        let post = app
            .post_with_token(&routes::comments(777), &json!({"text": "Hello"}), &writer)
            .await;
        assert_eq!(post.status, 404);

        let list = app.get_with_token(&routes::comments(777), &writer).await;
        assert_eq!(list.status, 404);
    }
}
