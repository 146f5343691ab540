//! Access resolver tests: endpoint choice from session state, the one-shot
//! public fallback on 401/403, and error classification.

mod common;

use common::{make_token, repo_json, session_against};
use forgedeck::api::AccessResolver;
use forgedeck::ApiError;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn unauthenticated_resolution_uses_public_mirror_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme", "widget", false)))
        .expect(1)
        .mount(&server)
        .await;
    // The authenticated endpoint must never be probed without credentials
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;
    assert!(!ctx.controller.session().is_authenticated);

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let repo = resolver
        .repository("acme", "widget")
        .await
        .expect("public fetch should succeed");
    assert_eq!(repo.full_name(), "acme/widget");
    ctx.controller.shutdown();
}

#[tokio::test]
async fn authenticated_resolution_sends_bearer_token() {
    let server = MockServer::start().await;
    let token = make_token(3600, 42);
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/acme/widget"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme", "widget", true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;
    assert!(ctx.controller.login(&token, None, false));

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let repo = resolver
        .repository("acme", "widget")
        .await
        .expect("authenticated fetch should succeed");
    assert!(repo.private);
    ctx.controller.shutdown();
}

#[tokio::test]
async fn forbidden_authenticated_attempt_falls_back_to_public_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme", "widget", false)))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;
    assert!(ctx.controller.login(&make_token(3600, 42), None, false));

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let repo = resolver
        .repository("acme", "widget")
        .await
        .expect("fallback fetch should succeed");
    assert_eq!(repo.full_name(), "acme/widget");
    ctx.controller.shutdown();
}

#[tokio::test]
async fn missing_resource_surfaces_ambiguous_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let err = resolver
        .repository("acme", "ghost")
        .await
        .expect_err("missing repo must error");

    assert!(matches!(err, ApiError::NotFound(_)));
    let message = err.to_string();
    // Must not reveal whether the repository exists but is private
    assert!(message.contains("not accessible"));
    assert!(message.contains("acme/ghost"));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    ctx.controller.shutdown();
}

#[tokio::test]
async fn denied_fallback_that_also_fails_keeps_resource_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/acme/secret"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/secret"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;
    assert!(ctx.controller.login(&make_token(3600, 42), None, false));

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let err = resolver
        .repository("acme", "secret")
        .await
        .expect_err("denied repo must error");
    assert!(err.to_string().contains("acme/secret"));
    ctx.controller.shutdown();
}

#[tokio::test]
async fn issues_are_resolved_through_the_same_routing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/public/repos/acme/widget/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 1, "title": "First", "state": "open"},
            {"number": 2, "title": "Second", "state": "closed"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;

    let resolver = AccessResolver::new(ctx.client.clone(), ctx.controller.handle());
    let issues = resolver
        .issues("acme", "widget")
        .await
        .expect("issue list should succeed");
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].number, 1);
    ctx.controller.shutdown();
}

#[tokio::test]
async fn resolving_with_expiring_token_refreshes_in_background() {
    let server = MockServer::start().await;
    let fresh = make_token(3600, 42);
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme", "widget", true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = session_against(&server.uri());
    ctx.controller.init().await;
    // Token is valid but inside the expiring-soon window
    assert!(ctx
        .controller
        .login(&make_token(60, 42), Some("refresh-1"), true));

    let handle = ctx.controller.handle();
    let resolver = AccessResolver::new(ctx.client.clone(), handle.clone());
    resolver
        .repository("acme", "widget")
        .await
        .expect("fetch should succeed");

    // The background refresh swaps the token in shortly after
    let mut refreshed = false;
    for _ in 0..100 {
        if handle.bearer_token().as_deref() == Some(fresh.as_str()) {
            refreshed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(refreshed, "expiring token was not refreshed in background");
    ctx.controller.shutdown();
}
