//! End-to-end tests for the HTTP surface, run against an in-memory store.

use actix_web::{
    http::StatusCode,
    test,
    web::{self, Data},
    App,
};
use serde_json::{json, Value};

use codestash::{db, middleware::jwt_middleware::ExtractIdentity, routes, AppState};

async fn test_state() -> Data<AppState> {
    // A single shared connection keeps every handle on the same in-memory
    // database.
    let pool = db::connection_pool("sqlite::memory:", 1)
        .await
        .expect("in-memory pool");
    db::init_schema(&pool, "sqlite::memory:").await.expect("schema");
    Data::new(AppState::new(
        pool,
        "test-access-secret".into(),
        "test-refresh-secret".into(),
    ))
}

macro_rules! test_app {
    ($state:expr) => {{
        let identity = ExtractIdentity::new($state.clone());
        test::init_service(
            App::new().app_data($state.clone()).service(
                web::scope("/api")
                    .configure(routes::auth_routes::config)
                    .configure(|cfg| routes::snippet_routes::config(cfg, identity.clone())),
            ),
        )
        .await
    }};
}

/// Register a user and log in, yielding `(access_token, user_id)`.
macro_rules! auth_user {
    ($app:expr, $name:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": format!("{}@example.com", $name),
                "username": $name,
                "full_name": "Test User",
                "password": "Sup3rSecret",
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let user_id = body["id"].as_str().expect("user id").to_string();

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({
                "email": format!("{}@example.com", $name),
                "password": "Sup3rSecret",
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let token = body["accessToken"].as_str().expect("access token").to_string();

        (token, user_id)
    }};
}

macro_rules! create_snippet {
    ($app:expr, $token:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/snippets")
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .set_json($body)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_i64().expect("snippet id")
    }};
}

#[actix_web::test]
async fn snippet_crud_round_trip() {
    let state = test_state().await;
    let app = test_app!(state);

    let (token, user_id) = auth_user!(&app, "alice");

    let snippet_id = create_snippet!(
        &app,
        token,
        json!({
            "title": "hello world",
            "code": "fn main() { println!(\"hi\"); }",
            "language": "rust",
            "tags": ["demo"],
        })
    );

    // The public feed lists it, newest first.
    let req = test::TestRequest::get().uri("/api/snippets").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_records"], json!(1));
    assert_eq!(body["records"][0]["title"], json!("hello world"));
    assert_eq!(body["records"][0]["owner_id"].as_str(), Some(user_id.as_str()));

    // Partial update by the owner.
    let req = test::TestRequest::patch()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "title": "hello, renamed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], json!("hello, renamed"));
    assert_eq!(body["code"], json!("fn main() { println!(\"hi\"); }"));

    // Soft delete hides it from subsequent reads.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn anonymous_mutations_are_rejected() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/snippets")
        .set_json(json!({ "title": "t", "code": "c", "language": "rust" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post().uri("/api/snippets/1000/like").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/snippets/1000/comment")
        .set_json(json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn garbage_bearer_tokens_are_rejected() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/snippets")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn like_flow_over_http() {
    let state = test_state().await;
    let app = test_app!(state);

    let (owner_token, _) = auth_user!(&app, "owner");
    let (fan_token, fan_id) = auth_user!(&app, "fan");

    let snippet_id = create_snippet!(
        &app,
        owner_token,
        json!({ "title": "likable", "code": "print(1)", "language": "python" })
    );

    // First like lands, second is an idempotent no-op.
    for expected in [1, 1] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/snippets/{snippet_id}/like"))
            .insert_header(("Authorization", format!("Bearer {fan_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["likes_count"], json!(expected));
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/snippets/{snippet_id}/like/check?userId={fan_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["liked"], json!(true));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/snippets/{snippet_id}/like"))
        .insert_header(("Authorization", format!("Bearer {fan_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["likes_count"], json!(0));

    // The counter on the snippet itself agrees.
    let req = test::TestRequest::get()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["snippet"]["likes_count"], json!(0));
}

#[actix_web::test]
async fn comment_flow_over_http() {
    let state = test_state().await;
    let app = test_app!(state);

    let (owner_token, _) = auth_user!(&app, "owner");
    let (fan_token, _) = auth_user!(&app, "fan");
    let (stranger_token, _) = auth_user!(&app, "stranger");

    let snippet_id = create_snippet!(
        &app,
        owner_token,
        json!({ "title": "discussed", "code": "SELECT 1", "language": "sql" })
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/snippets/{snippet_id}/comment"))
        .insert_header(("Authorization", format!("Bearer {fan_token}")))
        .set_json(json!({ "content": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let comments: Value = test::read_body_json(resp).await;
    assert_eq!(comments.as_array().unwrap().len(), 1);
    let comment_id = comments[0]["id"].as_i64().unwrap();

    // Newest first once a second comment arrives.
    let req = test::TestRequest::post()
        .uri(&format!("/api/snippets/{snippet_id}/comment"))
        .insert_header(("Authorization", format!("Bearer {owner_token}")))
        .set_json(json!({ "content": "thanks", "parent_id": comment_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let comments: Value = test::read_body_json(resp).await;
    assert_eq!(comments[0]["content"], json!("thanks"));
    assert_eq!(comments[0]["parent_id"], json!(comment_id));
    assert_eq!(comments[1]["content"], json!("hello"));

    // Empty content is rejected.
    let req = test::TestRequest::post()
        .uri(&format!("/api/snippets/{snippet_id}/comment"))
        .insert_header(("Authorization", format!("Bearer {fan_token}")))
        .set_json(json!({ "content": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A bystander may not delete someone else's comment.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/snippets/{snippet_id}/comment?commentId={comment_id}"))
        .insert_header(("Authorization", format!("Bearer {stranger_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The author may; the reply goes with it.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/snippets/{snippet_id}/comment?commentId={comment_id}"))
        .insert_header(("Authorization", format!("Bearer {fan_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["comments_count"], json!(0));
}

#[actix_web::test]
async fn missing_and_malformed_snippet_ids() {
    let state = test_state().await;
    let app = test_app!(state);

    let (token, _) = auth_user!(&app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/snippets/4040/like")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/snippets/not-a-number").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_validation_and_conflicts() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "weak@example.com",
            "username": "weak",
            "full_name": "Weak",
            "password": "letmein",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let _ = auth_user!(&app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "bob@example.com",
            "username": "bob2",
            "full_name": "Bob Again",
            "password": "Sup3rSecret",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unsupported_language_is_rejected() {
    let state = test_state().await;
    let app = test_app!(state);

    let (token, _) = auth_user!(&app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/snippets")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "title": "t", "code": "c", "language": "cobol" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn private_snippets_are_hidden_from_other_callers() {
    let state = test_state().await;
    let app = test_app!(state);

    let (owner_token, owner_id) = auth_user!(&app, "owner");
    let (stranger_token, _) = auth_user!(&app, "stranger");

    let snippet_id = create_snippet!(
        &app,
        owner_token,
        json!({
            "title": "secret notes",
            "code": "# draft",
            "language": "markdown",
            "visibility": "private",
        })
    );

    // Not in the public feed.
    let req = test::TestRequest::get().uri("/api/snippets").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_records"], json!(0));

    // Absent for strangers, present for the owner.
    let req = test::TestRequest::get()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {stranger_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {owner_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["owner"], json!(true));

    // Profile listing hides it from everyone but the owner.
    let req = test::TestRequest::get()
        .uri(&format!("/api/profile/{owner_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["snippets"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/profile/{owner_id}"))
        .insert_header(("Authorization", format!("Bearer {owner_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["snippets"].as_array().unwrap().len(), 1);
    assert_eq!(body["owner"], json!(true));
}

#[actix_web::test]
async fn only_the_owner_may_modify_a_snippet() {
    let state = test_state().await;
    let app = test_app!(state);

    let (owner_token, _) = auth_user!(&app, "owner");
    let (stranger_token, _) = auth_user!(&app, "stranger");

    let snippet_id = create_snippet!(
        &app,
        owner_token,
        json!({ "title": "mine", "code": "x = 1", "language": "python" })
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {stranger_token}")))
        .set_json(json!({ "title": "hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/snippets/{snippet_id}"))
        .insert_header(("Authorization", format!("Bearer {stranger_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
