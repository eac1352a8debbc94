mod common;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};

use shoal::handlers;
use shoal::security::token::SessionKeys;

const BOUNDARY: &str = "X-SHOAL-TEST-BOUNDARY";

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.pool.clone()))
                .app_data(web::Data::new($ctx.blobs.clone()))
                .app_data(web::Data::new(SessionKeys::new(
                    &$ctx.config.session.secret,
                    $ctx.config.session.ttl_hours,
                )))
                .app_data(web::Data::new($ctx.config.clone()))
                .configure(handlers::routes),
        )
        .await
    };
}

fn register_form(username: &str, email: &str) -> Vec<(String, String)> {
    vec![
        ("username".to_string(), username.to_string()),
        ("name".to_string(), "Test User".to_string()),
        ("email".to_string(), email.to_string()),
        ("password".to_string(), "correct horse battery staple".to_string()),
        ("age".to_string(), "30".to_string()),
    ]
}

fn text_part(content: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\n{content}\r\n"
    )
    .into_bytes()
}

fn file_part(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(data);
    part.extend_from_slice(b"\r\n");
    part
}

fn close_multipart(mut body: Vec<u8>) -> Vec<u8> {
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, session: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .cookie(Cookie::new("token", session.to_string()))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

fn session_cookie_value(resp: &actix_web::dev::ServiceResponse) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "token")
        .map(|c| c.value().to_string())
}

#[actix_web::test]
async fn register_login_post_delete_flow() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    // Register: session cookie plus redirect to the profile.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("alice", "alice@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/profile"
    );
    let session = session_cookie_value(&resp).expect("session cookie");

    // Profile starts empty.
    let profile: serde_json::Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile")
            .cookie(Cookie::new("token", session.clone()))
            .to_request(),
    )
    .await;
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["posts"].as_array().unwrap().len(), 0);

    // Publish a text-only post.
    let body = close_multipart(text_part("hello world"));
    let resp = test::call_service(&app, multipart_request("/post", &session, body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // It shows up on the profile.
    let profile: serde_json::Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile")
            .cookie(Cookie::new("token", session.clone()))
            .to_request(),
    )
    .await;
    let posts = profile["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "hello world");
    assert!(posts[0]["image"].is_null());
    let post_id = posts[0]["id"].as_str().unwrap().to_string();

    // Fresh login works with the registered credentials.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_form(vec![
                ("email".to_string(), "alice@example.com".to_string()),
                (
                    "password".to_string(),
                    "correct horse battery staple".to_string(),
                ),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let fresh_session = session_cookie_value(&resp).expect("session cookie");

    // Delete the post with the fresh session.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/delete-post")
            .cookie(Cookie::new("token", fresh_session.clone()))
            .set_form(vec![("postId".to_string(), post_id)])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // Profile is empty again.
    let profile: serde_json::Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile")
            .cookie(Cookie::new("token", fresh_session))
            .to_request(),
    )
    .await;
    assert_eq!(profile["posts"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn image_upload_streams_back_the_same_bytes() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("bob", "bob@example.com"))
            .to_request(),
    )
    .await;
    let session = session_cookie_value(&resp).expect("session cookie");

    // Multi-chunk payload so the streamed response crosses chunk boundaries.
    let image_bytes: Vec<u8> = (0..5000u32).map(|i| (i % 239) as u8).collect();
    let mut body = text_part("");
    body.extend_from_slice(&file_part("pic.png", "image/png", &image_bytes));
    let body = close_multipart(body);

    let resp = test::call_service(&app, multipart_request("/post", &session, body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let profile: serde_json::Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile")
            .cookie(Cookie::new("token", session.clone()))
            .to_request(),
    )
    .await;
    let posts = profile["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "");
    let image_url = posts[0]["image"].as_str().expect("image url").to_string();
    assert!(image_url.starts_with("/image/"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&image_url).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let served = test::read_body(resp).await;
    assert_eq!(served.as_ref(), image_bytes.as_slice());
}

#[actix_web::test]
async fn empty_post_is_rejected() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("carol", "carol@example.com"))
            .to_request(),
    )
    .await;
    let session = session_cookie_value(&resp).expect("session cookie");

    let body = close_multipart(text_part(""));
    let resp = test::call_service(&app, multipart_request("/post", &session, body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn non_image_attachment_is_rejected() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("dave", "dave@example.com"))
            .to_request(),
    )
    .await;
    let session = session_cookie_value(&resp).expect("session cookie");

    let mut body = text_part("with a bad file");
    body.extend_from_slice(&file_part("note.txt", "text/plain", b"not an image"));
    let body = close_multipart(body);

    let resp = test::call_service(&app, multipart_request("/post", &session, body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn duplicate_email_registration_conflicts() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("erin", "erin@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("erin2", "erin@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn missing_registration_fields_are_rejected() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(vec![("username".to_string(), "frank".to_string())])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn wrong_password_is_rejected() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_form(register_form("grace", "grace@example.com"))
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_form(vec![
                ("email".to_string(), "grace@example.com".to_string()),
                ("password".to_string(), "wrong password".to_string()),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unauthenticated_profile_redirects_to_login() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    // No cookie at all.
    let resp = test::call_service(&app, test::TestRequest::get().uri("/profile").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");

    // A tampered cookie behaves identically and is cleared.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile")
            .cookie(Cookie::new("token", "garbage.token.value"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == "token")
        .expect("removal cookie");
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn logout_clears_the_session_cookie() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == "token")
        .expect("removal cookie");
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn unknown_image_is_not_found() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/image/1700000000000-0-missing.png")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_reports_ok() {
    let ctx = common::setup().await;
    let app = init_app!(ctx);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
