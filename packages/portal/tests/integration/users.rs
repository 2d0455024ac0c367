use serde_json::json;

use crate::common::{JWT_SECRET, TestApp, routes};

#[tokio::test]
async fn admin_creates_a_user_who_can_log_in() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "walt_writer", "password": "password123", "role": "writer"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["username"], "walt_writer");
    assert_eq!(res.body["role"], "writer");
    assert!(res.body.get("password").is_none());

    let token = app.login("walt_writer", "password123").await;
    let me = app.get_with_token(routes::ME, &token).await;
    assert_eq!(me.body["role"], "writer");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_user(&admin, "walt_writer", "writer").await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "walt_writer", "password": "password123", "role": "designer"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "USERNAME_TAKEN");
}

#[tokio::test]
async fn unknown_role_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "eve", "password": "password123", "role": "editor"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn non_admins_cannot_manage_users() {
    let app = TestApp::spawn().await;
    let designer = app.create_user_with_role("dana_design", "designer").await;

    let create = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "mallory", "password": "password123", "role": "admin"}),
            &designer,
        )
        .await;
    assert_eq!(create.status, 403);
    assert_eq!(create.body["code"], "PERMISSION_DENIED");

    let list = app.get_with_token(routes::USERS, &designer).await;
    assert_eq!(list.status, 403);
}

#[tokio::test]
async fn list_is_paginated_and_sorted_by_username() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_user(&admin, "zoe", "writer").await;
    app.create_user(&admin, "bob", "designer").await;

    let res = app
        .get_with_token(&format!("{}?per_page=2", routes::USERS), &admin)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["pagination"]["total"], 3);
    assert_eq!(res.body["pagination"]["total_pages"], 2);
    let names: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["admin", "bob"]);
}

#[tokio::test]
async fn role_change_applies_to_issued_tokens() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let id = app.create_user(&admin, "second_admin", "admin").await;
    let old_token = app.login("second_admin", "password123").await;

    let res = app
        .patch_with_token(&routes::user_role(id), &json!({"role": "writer"}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["role"], "writer");

    let me = app.get_with_token(routes::ME, &old_token).await;
    assert_eq!(me.body["role"], "writer");

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "sneaky", "password": "password123", "role": "admin"}),
            &old_token,
        )
        .await;
    assert_eq!(res.status, 403, "{}", res.text);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn role_claim_in_token_is_not_trusted() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let id = app.create_user(&admin, "wanda_writer", "writer").await;
    let forged = portal::utils::jwt::sign(id, "wanda_writer", "admin", JWT_SECRET).unwrap();

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "sneaky", "password": "password123", "role": "admin"}),
            &forged,
        )
        .await;

    assert_eq!(res.status, 403, "{}", res.text);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn admin_cannot_change_own_role() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let me = app.get_with_token(routes::ME, &admin).await;
    let admin_id = me.id();

    let res = app
        .patch_with_token(&routes::user_role(admin_id), &json!({"role": "writer"}), &admin)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn role_change_for_missing_user_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .patch_with_token(&routes::user_role(9999), &json!({"role": "writer"}), &admin)
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}
