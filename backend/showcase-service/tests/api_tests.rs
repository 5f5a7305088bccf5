//! HTTP-level tests against the full route table

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use showcase_service::handlers;
use showcase_service::routes::configure_routes;
use uuid::Uuid;

use common::{bearer, signup_request, upload_request, TestContext, TEST_MAX_UPLOAD};

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .configure(|cfg| configure_routes(cfg, &$ctx.state))
                .default_service(web::to(handlers::not_found)),
        )
        .await
    };
}

fn assert_error_body(body: &Value, detail: &str) {
    assert_eq!(body["detail"], detail);
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z'), "timestamp {timestamp} is not UTC");
}

#[actix_web::test]
async fn test_signup_then_login() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_request("ana@example.com", "Bogota"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User created successfully");
    let user_id = body["user_id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "ANA@example.com", "password": "Str0ngPass!"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["expires_in"], 3600);
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn test_signup_rejects_duplicate_email_and_mismatched_passwords() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    ctx.register("taken@example.com", "Cali").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_request("taken@example.com", "Cali"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Email already registered");

    let mut mismatched = signup_request("new@example.com", "Cali");
    mismatched.password2 = "Different1!".to_string();
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(mismatched)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Passwords do not match");
}

#[actix_web::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    ctx.register("ana@example.com", "Bogota").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "ana@example.com", "password": "nope-nope"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Invalid credentials");
}

#[actix_web::test]
async fn test_malformed_json_body_is_a_structured_400() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid request body"));
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn test_video_routes_require_a_valid_token() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    // Middleware rejections surface as service errors.
    let err = test::try_call_service(&app, test::TestRequest::get().uri("/api/videos").to_request())
        .await
        .err()
        .unwrap();
    let resp = err.error_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("WWW-Authenticate").unwrap(), "Bearer");

    let err = test::try_call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/videos")
            .insert_header(bearer("not.a.token"))
            .to_request(),
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_upload_starts_uploaded_and_worker_renders_it() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (_, token) = ctx.register("ana@example.com", "Bogota").await;

    let resp = test::call_service(
        &app,
        upload_request(&token, "Kickflip", "video/mp4", b"fake mp4 bytes").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "uploaded");
    assert_eq!(body["message"], "Video uploaded successfully. Processing started.");
    let video_id: Uuid = body["task_id"].as_str().unwrap().parse().unwrap();
    assert!(ctx.blob_exists(&format!("uploads/{}.mp4", video_id)));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "uploaded");
    assert!(body["processed_url"].is_null());

    let outcomes = ctx.run_pending_jobs().await;
    assert_eq!(outcomes.len(), 1);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["is_public"], false);
    assert_eq!(body["duration_seconds"], 42);
    assert_eq!(
        body["processed_url"],
        format!("/api/videos/{}/media", video_id)
    );
    assert!(ctx.blob_exists(&format!("processed/{}.mp4", video_id)));
    assert!(!ctx.blob_exists(&format!("uploads/{}.mp4", video_id)));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/videos")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["video_id"], video_id.to_string());
}

#[actix_web::test]
async fn test_upload_rejects_non_video_and_oversized_files() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (_, token) = ctx.register("ana@example.com", "Bogota").await;

    let resp = test::call_service(
        &app,
        upload_request(&token, "Notes", "text/plain", b"hello").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "File must be a video");

    let oversized = vec![0u8; TEST_MAX_UPLOAD + 1];
    let resp = test::call_service(
        &app,
        upload_request(&token, "Too big", "video/mp4", &oversized).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert!(ctx.take_jobs().await.is_empty());
}

#[actix_web::test]
async fn test_owner_checks_on_video_detail() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (owner, _) = ctx.register("owner@example.com", "Bogota").await;
    let (_, intruder_token) = ctx.register("intruder@example.com", "Cali").await;
    let video_id = ctx.processed_video(owner, "Mine").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&intruder_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", Uuid::new_v4()))
            .insert_header(bearer(&intruder_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/videos/not-a-uuid")
            .insert_header(bearer(&intruder_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Invalid UUID format");
}

#[actix_web::test]
async fn test_publish_requires_processed_and_public_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (_, token) = ctx.register("ana@example.com", "Bogota").await;

    let resp = test::call_service(
        &app,
        upload_request(&token, "Early", "video/mp4", b"bytes").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let video_id = body["task_id"].as_str().unwrap().to_string();

    let publish = || {
        test::TestRequest::put()
            .uri(&format!("/api/videos/{}/publish", video_id))
            .insert_header(bearer(&token))
            .to_request()
    };

    let resp = test::call_service(&app, publish()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(
        &body,
        "Video must be processed before publishing (current: uploaded)",
    );

    ctx.run_pending_jobs().await;

    let resp = test::call_service(&app, publish()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Video published successfully");

    let resp = test::call_service(&app, publish()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Cannot delete a public video");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/public/videos").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["video_id"], video_id.as_str());
    assert_eq!(body[0]["username"], "Ana Rojas");
}

#[actix_web::test]
async fn test_media_is_owner_only_until_published() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (owner, owner_token) = ctx.register("owner@example.com", "Bogota").await;
    let (_, other_token) = ctx.register("other@example.com", "Cali").await;
    let video_id = ctx.processed_video(owner, "Private").await;
    let public_path = format!("/storage/processed/{}.mp4", video_id);

    let anonymous = |uri: &str| test::TestRequest::get().uri(uri).to_request();
    let media = |token: &str| {
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}/media", video_id))
            .insert_header(bearer(token))
            .to_request()
    };

    let resp = test::call_service(&app, anonymous(&public_path)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    for namespace in ["uploads", "temp"] {
        let uri = format!("/storage/{}/{}.mp4", namespace, video_id);
        let resp = test::call_service(&app, anonymous(&uri)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri} was served");
    }

    let resp = test::call_service(&app, media(&other_token)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = test::call_service(&app, media(&owner_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"not really an mp4");

    ctx.state.videos.publish(owner, video_id).await.unwrap();

    let resp = test::call_service(&app, anonymous(&public_path)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"not really an mp4");
    let resp = test::call_service(&app, anonymous("/storage/processed/not-a-video.mp4")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_owner_can_fetch_raw_upload_before_render() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (_, token) = ctx.register("ana@example.com", "Bogota").await;

    let resp = test::call_service(
        &app,
        upload_request(&token, "Raw", "video/mp4", b"raw upload bytes").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let video_id = body["task_id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let original_url = body["original_url"].as_str().unwrap().to_string();
    assert_eq!(original_url, format!("/api/videos/{}/media", video_id));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&original_url)
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"raw upload bytes");
}

#[actix_web::test]
async fn test_delete_removes_record_and_blob() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (owner, token) = ctx.register("ana@example.com", "Bogota").await;
    let video_id = ctx.processed_video(owner, "Throwaway").await;
    let key = format!("processed/{}.mp4", video_id);
    assert!(ctx.blob_exists(&key));

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["video_id"], video_id.to_string());
    assert!(!ctx.blob_exists(&key));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/videos/{}", video_id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_vote_once_per_video() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (owner, _) = ctx.register("owner@example.com", "Bogota").await;
    let (_, voter_token) = ctx.register("voter@example.com", "Cali").await;
    let public_id = ctx.public_video(owner, "Vote me").await;
    let private_id = ctx.processed_video(owner, "Not yet").await;

    let vote = |id: Uuid, token: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/public/videos/{}/vote", id))
            .insert_header(bearer(token))
            .to_request()
    };

    let resp = test::call_service(&app, vote(public_id, &voter_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Vote registered successfully");
    assert_eq!(body["votes"], 1);

    let resp = test::call_service(&app, vote(public_id, &voter_token)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "You have already voted for this video");

    let resp = test::call_service(&app, vote(private_id, &voter_token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let err = test::try_call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/public/videos/{}/vote", public_id))
            .to_request(),
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_rankings_order_filter_and_positions() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (bogota, _) = ctx.register("b@example.com", "Bogota").await;
    let (medellin, _) = ctx.register("m@example.com", "Medellin").await;

    let top = ctx.public_video(bogota, "Top").await;
    let middle = ctx.public_video(medellin, "Middle").await;
    let bottom = ctx.public_video(bogota, "Bottom").await;

    let mut voters = Vec::new();
    for i in 0..3 {
        let (id, _) = ctx.register(&format!("voter{}@example.com", i), "Cali").await;
        voters.push(id);
    }
    for voter in &voters {
        ctx.state.votes.vote(*voter, top).await.unwrap();
    }
    for voter in &voters[..2] {
        ctx.state.votes.vote(*voter, middle).await.unwrap();
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/public/rankings").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["video_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![top.to_string(), middle.to_string(), bottom.to_string()]);
    assert_eq!(body[0]["position"], 1);
    assert_eq!(body[0]["votes"], 3);
    assert_eq!(body[2]["votes"], 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/public/rankings?city=Bogota&limit=1&offset=1")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["video_id"], bottom.to_string());
    assert_eq!(body[0]["position"], 2);
    assert_eq!(body[0]["city"], "Bogota");

    for bad in ["limit=0", "limit=101", "offset=-1", "limit=abc"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/public/rankings?{}", bad))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "query {bad}");
    }
}

#[actix_web::test]
async fn test_health_and_unknown_routes() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/nothing-here").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_error_body(&body, "Not found");
}
