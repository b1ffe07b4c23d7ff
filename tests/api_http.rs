// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /trends/{source} (live, fallback, filter, unknown id, wrong method)
// - GET /sources

mod common;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::{adapters_with, chart_records, test_router, wiki_records, Behaviour, StubAdapter};
use trend_pulse::fallback;
use trend_pulse::model::SourceId;

const BODY_LIMIT: usize = 1024 * 1024;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let state = resp
        .headers()
        .get("x-trends-state")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, state, json)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(adapters_with(vec![]));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "OK");
}

#[tokio::test]
async fn trends_returns_live_items_with_fixed_field_names() {
    let wiki = StubAdapter::new(
        SourceId::Wikipedia,
        Behaviour::Records(wiki_records(&["Some_Topic", "Other_Topic"])),
    );
    let app = test_router(adapters_with(vec![wiki.clone()]));

    let (status, state, json) = get(app, "/trends/wikipedia").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.as_deref(), Some("fresh"));

    let items = json.as_array().expect("array body");
    assert_eq!(items.len(), 2);
    let first = &items[0];
    assert_eq!(first["sourceId"], "wikipedia");
    assert_eq!(first["primaryText"], "Some Topic");
    assert_eq!(first["metricValue"], "100,000");
    assert_eq!(first["rank"], 1);
    assert_eq!(first["targetUrl"], "https://en.wikipedia.org/wiki/Some_Topic");
    assert!(first.get("extra").is_some());
    assert_eq!(wiki.calls(), 1);
}

#[tokio::test]
async fn failing_source_serves_fallback_not_an_error() {
    let app = test_router(adapters_with(vec![]));
    let (status, state, json) = get(app, "/trends/spotify").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.as_deref(), Some("fallback"));

    let expected = serde_json::to_value(fallback::sample(SourceId::Spotify)).unwrap();
    assert_eq!(json, expected);
}

#[tokio::test]
async fn query_parameter_filters_case_insensitively() {
    let spotify = StubAdapter::new(
        SourceId::Spotify,
        Behaviour::Records(chart_records(&[
            ("Kesariya", "Arijit Singh"),
            ("Naatu Naatu", "Rahul Sipligunj"),
            ("Tum Hi Ho", "Arijit Singh"),
        ])),
    );
    let app = test_router(adapters_with(vec![spotify]));

    let (status, _, json) = get(app.clone(), "/trends/spotify?q=ARIJIT").await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["primaryText"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Kesariya", "Tum Hi Ho"]);

    let (_, _, json) = get(app, "/trends/spotify?q=nothing%20matches").await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn source_id_must_match_exactly() {
    let app = test_router(adapters_with(vec![]));
    let (status, _, _) = get(app.clone(), "/trends/Netflix").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = get(app.clone(), "/trends/%20reddit").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = get(app, "/trends/netflix").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_source_is_a_client_error_and_never_fetched() {
    let adapters = adapters_with(vec![]);
    let app = test_router(adapters);
    let (status, state, json) = get(app, "/trends/myspace").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state, None);
    assert_eq!(json["message"], "unknown source `myspace`");
}

#[tokio::test]
async fn non_get_methods_are_rejected() {
    let app = test_router(adapters_with(vec![]));
    for method in ["POST", "PUT", "DELETE"] {
        let req = Request::builder()
            .method(method)
            .uri("/trends/google")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert!(resp.status().is_client_error());
    }
}

#[tokio::test]
async fn refresh_flag_forces_a_second_fetch() {
    let wiki = StubAdapter::new(
        SourceId::Wikipedia,
        Behaviour::Records(wiki_records(&["A_Topic"])),
    );
    let app = test_router(adapters_with(vec![wiki.clone()]));

    get(app.clone(), "/trends/wikipedia").await;
    get(app.clone(), "/trends/wikipedia").await;
    assert_eq!(wiki.calls(), 1, "second request is served from cache");

    get(app, "/trends/wikipedia?refresh=1").await;
    assert_eq!(wiki.calls(), 2);
}

#[tokio::test]
async fn sources_lists_every_source_with_its_state() {
    let app = test_router(adapters_with(vec![]));
    get(app.clone(), "/trends/reddit").await;

    let (status, _, json) = get(app, "/sources").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 7);
    let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        vec!["google", "youtube", "twitter", "wikipedia", "reddit", "spotify", "netflix"]
    );
    let reddit = rows.iter().find(|r| r["id"] == "reddit").unwrap();
    assert_eq!(reddit["state"], "fallback");
    assert!(reddit["items"].as_u64().unwrap() > 0);
    let google = rows.iter().find(|r| r["id"] == "google").unwrap();
    assert_eq!(google["state"], "stale");
}
