//! Feed cycle tests against a mock events API
//!
//! - Early-stop pagination and the page cap
//! - Rate-limit handling
//! - Failure handling (nothing saved)
//! - Full HTTP round trip through the router
//! - Stored feeds are only served to the credential's owner

use std::fs;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use event_feed::api::{create_router, AppState};
use event_feed::event_store::EventStore;
use event_feed::types::EventRecord;
use event_feed::utils::{format_event_date, parse_event_date};
use event_feed::{Credential, FeedConfig, FeedError, FeedService, StopReason, UserContext};

const EVENTS_PATH: &str = "/users/octocat/received_events";

fn now() -> DateTime<Utc> {
    parse_event_date("2024-09-30T09:00:00Z").unwrap()
}

fn api_event(id: &str, repo: &str, created_at: DateTime<Utc>, pr_title: Option<&str>) -> Value {
    let mut value = json!({
        "id": id,
        "type": "PullRequestEvent",
        "created_at": format_event_date(&created_at),
        "repo": {"name": repo, "url": format!("https://api.github.com/repos/{}", repo)},
        "actor": {"login": "hubot", "avatar_url": "https://avatars.example/hubot"},
    });
    if let Some(title) = pr_title {
        value["payload"] = json!({
            "pull_request": {"title": title, "html_url": format!("https://github.com/{}/pull/{}", repo, id)}
        });
    }
    value
}

fn page_response(events: Vec<Value>, remaining: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(Value::Array(events))
        .insert_header("X-RateLimit-Limit", "5000")
        .insert_header("X-RateLimit-Remaining", remaining.to_string().as_str())
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_owner(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn owner(login: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"login": login, "id": 1}))
}

async fn get(app: axum::Router, uri: &str, authorization: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Authorization", authorization)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn requested_pages(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|req| {
            req.url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

fn feed_for(server: &MockServer, dir: &TempDir) -> FeedService {
    let config = FeedConfig {
        api_base: server.uri(),
        ..FeedConfig::with_data_dir(dir.path())
    };
    FeedService::from_config(config).unwrap()
}

fn ctx() -> UserContext {
    UserContext::new("octocat", &Credential::Token("abc".into())).unwrap()
}

fn seed_store(feed: &FeedService, events: Vec<Value>) {
    let mut store = EventStore::new(feed.config().store_config(), "octocat").unwrap();
    store.add_new(events.into_iter().map(|v| EventRecord::from_json(v, 0).unwrap()));
    store.save().unwrap();
}

#[tokio::test]
async fn test_stops_after_page_zero_when_not_newer() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    let t = now() - Duration::hours(1);
    seed_store(&feed, vec![api_event("known", "acme/app", t, Some("Known"))]);

    mount_page(
        &server,
        0,
        page_response(vec![api_event("older", "acme/app", t - Duration::seconds(1), Some("Older"))], 4999),
    )
    .await;
    mount_page(&server, 1, page_response(vec![api_event("never", "acme/app", t, None)], 4998)).await;

    let result = feed.run_cycle_at(&ctx(), true, now()).await.unwrap();

    assert_eq!(requested_pages(&server).await, vec!["0"]);
    assert_eq!(result.stats.pages, 1);
    assert_eq!(result.stats.stop_reason, Some(StopReason::CaughtUp));
    assert_eq!(result.stats.added, 1);
    assert!(result.records.iter().all(|r| r.id() != "never"));
}

#[tokio::test]
async fn test_sends_authorization_header() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("Authorization", "token abc"))
        .respond_with(page_response(vec![], 4999))
        .expect(1)
        .mount(&server)
        .await;

    feed.run_cycle_at(&ctx(), true, now()).await.unwrap();
}

#[tokio::test]
async fn test_page_cap_limits_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = FeedConfig {
        api_base: server.uri(),
        page_cap: 10,
        ..FeedConfig::with_data_dir(dir.path())
    };
    let feed = FeedService::from_config(config).unwrap();

    for page in 0..12u32 {
        let created = now() - Duration::minutes(i64::from(page));
        mount_page(
            &server,
            page,
            page_response(vec![api_event(&format!("e{}", page), "acme/app", created, None)], 4000),
        )
        .await;
    }

    let result = feed.run_cycle_at(&ctx(), true, now()).await.unwrap();

    assert_eq!(result.stats.pages, 10);
    assert_eq!(result.stats.stop_reason, Some(StopReason::PageCap));
    assert_eq!(result.records.len(), 10);
    assert_eq!(requested_pages(&server).await.len(), 10);
}

#[tokio::test]
async fn test_rate_limit_exhausted_stops_paging() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    mount_page(&server, 0, page_response(vec![api_event("1", "acme/app", now(), Some("One"))], 0)).await;
    mount_page(&server, 1, page_response(vec![api_event("2", "acme/app", now(), Some("Two"))], 0)).await;

    let result = feed.run_cycle_at(&ctx(), true, now()).await.unwrap();

    assert_eq!(requested_pages(&server).await, vec!["0"]);
    assert_eq!(result.stats.stop_reason, Some(StopReason::RateLimited));
    assert_eq!(result.stats.stored, 1);
}

#[tokio::test]
async fn test_server_error_leaves_persisted_state_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    seed_store(&feed, vec![api_event("known", "acme/app", now() - Duration::days(2), Some("Known"))]);
    let store_path = feed.config().store_config().events_path("octocat");
    let before = fs::read_to_string(&store_path).unwrap();

    mount_page(&server, 0, ResponseTemplate::new(500).set_body_string("oops")).await;

    let err = feed.run_cycle_at(&ctx(), true, now()).await.unwrap_err();

    assert!(matches!(err, FeedError::RemoteApi { status: Some(500), .. }));
    assert_eq!(fs::read_to_string(&store_path).unwrap(), before);
}

#[tokio::test]
async fn test_malformed_event_fails_cycle() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    let mut broken = api_event("2", "acme/app", now(), None);
    broken.as_object_mut().unwrap().remove("actor");
    mount_page(
        &server,
        0,
        page_response(vec![api_event("1", "acme/app", now(), None), broken], 4999),
    )
    .await;

    let err = feed.run_cycle_at(&ctx(), true, now()).await.unwrap_err();

    match err {
        FeedError::MalformedEvent { index, reason } => {
            assert_eq!(index, 1);
            assert!(reason.contains("actor"));
        }
        other => panic!("expected malformed event, got {:?}", other),
    }
    assert!(!feed.config().store_config().events_path("octocat").exists());
}

#[tokio::test]
async fn test_non_array_body_is_remote_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);

    mount_page(
        &server,
        0,
        ResponseTemplate::new(200).set_body_json(json!({"message": "Not Found"})),
    )
    .await;

    let err = feed.run_cycle_at(&ctx(), true, now()).await.unwrap_err();
    assert!(matches!(err, FeedError::RemoteApi { .. }));
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = FeedConfig {
        api_base: server.uri(),
        page_timeout: std::time::Duration::from_millis(200),
        ..FeedConfig::with_data_dir(dir.path())
    };
    let feed = FeedService::from_config(config).unwrap();

    mount_page(
        &server,
        0,
        page_response(vec![], 4999).set_delay(std::time::Duration::from_secs(2)),
    )
    .await;

    let err = feed.run_cycle_at(&ctx(), true, now()).await.unwrap_err();
    assert!(matches!(err, FeedError::Timeout(_)));
}

#[tokio::test]
async fn test_router_returns_grouped_feed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The router uses the wall clock, so keep dates recent
    let fresh = Utc::now() - Duration::hours(1);
    mount_page(
        &server,
        0,
        page_response(
            vec![
                api_event("3", "acme/lib", fresh, Some("Bump")),
                api_event("2", "acme/app", fresh - Duration::minutes(5), None),
                api_event("1", "acme/app", fresh - Duration::minutes(10), Some("Fix bug")),
            ],
            4999,
        ),
    )
    .await;

    mount_owner(&server, owner("octocat")).await;

    let app = create_router(Arc::new(AppState::new(feed_for(&server, &dir))));
    let (status, body) = get(app, "/api/users/octocat/events", "token abc").await;

    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["user"], "octocat");
    assert_eq!(body["stats"]["added"], 3);

    let groups = body["groups"].as_object().unwrap();
    let repos: Vec<&String> = groups.keys().collect();
    assert_eq!(repos, vec!["acme/lib", "acme/app"]);
    assert_eq!(groups["acme/app"].as_array().unwrap().len(), 1);
    assert_eq!(groups["acme/app"][0]["title"], "Fix bug");
    assert_eq!(groups["acme/app"][0]["url"], "https://github.com/acme/app/pull/1");
}

#[tokio::test]
async fn test_router_maps_upstream_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_owner(&server, owner("octocat")).await;
    mount_page(&server, 0, ResponseTemplate::new(500).set_body_string("oops")).await;

    let app = create_router(Arc::new(AppState::new(feed_for(&server, &dir))));
    let (status, body) = get(app, "/api/users/octocat/events/flat", "token abc").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

fn seed_secret(feed: &FeedService) {
    let created = Utc::now() - Duration::hours(1);
    seed_store(feed, vec![api_event("9", "acme/app", created, Some("Secret PR"))]);
}

#[tokio::test]
async fn test_stored_feed_refused_for_rejected_credential() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);
    seed_secret(&feed);

    mount_owner(&server, ResponseTemplate::new(401).set_body_string("Bad credentials")).await;

    let app = create_router(Arc::new(AppState::new(feed)));
    let (status, body) = get(app, "/api/users/octocat/events?refresh=false", "anything").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("groups").is_none());
    assert!(!body.to_string().contains("Secret PR"));
}

#[tokio::test]
async fn test_stored_feed_refused_for_another_users_credential() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);
    seed_secret(&feed);

    mount_owner(&server, owner("hubot")).await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(page_response(vec![], 4999))
        .expect(0)
        .mount(&server)
        .await;

    let app = create_router(Arc::new(AppState::new(feed)));
    for uri in [
        "/api/users/octocat/events?refresh=false",
        "/api/users/octocat/events",
        "/api/users/octocat/events/flat",
    ] {
        let (status, body) = get(app.clone(), uri, "token hubots").await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["code"], "FORBIDDEN");
        assert!(!body.to_string().contains("Secret PR"));
    }
}

#[tokio::test]
async fn test_stored_feed_served_to_owner_without_fetching() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let feed = feed_for(&server, &dir);
    seed_secret(&feed);

    // Logins compare case-insensitively
    mount_owner(&server, owner("OctoCat")).await;

    let app = create_router(Arc::new(AppState::new(feed)));
    let (status, body) = get(app, "/api/users/octocat/events?refresh=false", "token abc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups"]["acme/app"][0]["title"], "Secret PR");
    assert!(requested_pages(&server).await.is_empty());
}
