use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lexis_core::{Engine, EngineConfig, ExtractedDocument};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

fn doc(path: &str, text: &str, title: Option<&str>) -> ExtractedDocument {
    let mut metadata = BTreeMap::new();
    if let Some(title) = title {
        metadata.insert("title".to_string(), title.to_string());
    }
    ExtractedDocument { source_id: path.to_string(), text: text.to_string(), metadata }
}

fn tiny_app() -> Router {
    let engine = Engine::in_memory(EngineConfig::default());
    engine
        .reindex(vec![
            doc("b.txt", "cautare lenta", None),
            doc("a.pdf", "cautare rapida", Some("Raport anual")),
        ])
        .unwrap();
    lexis_server::router(Arc::new(engine))
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (status, body) = call(tiny_app(), "/search?q=cautare&k=2&boost_suffix=.pdf").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["path"], "a.pdf");
    assert_eq!(arr[1]["path"], "b.txt");
    assert!(arr[0]["explanation"].as_str().unwrap().contains("idf"));
}

#[tokio::test]
async fn search_can_target_another_field() {
    let (status, body) = call(tiny_app(), "/search?q=raport&field=title&explain=false").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["path"], "a.pdf");
    assert_eq!(arr[0]["explanation"], "");
}

#[tokio::test]
async fn unknown_field_is_empty_not_an_error() {
    let (status, body) = call(tiny_app(), "/search?q=cautare&field=nonexistent").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_query_is_bad_request() {
    let (status, _) = call(tiny_app(), "/search?q=cautare%20OR").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn doc_returns_stored_values() {
    let (status, body) = call(tiny_app(), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["stored"]["path"][0], "a.pdf");
    assert_eq!(json["stored"]["title"][0], "Raport anual");
    assert!(json["stored"].get("contents").is_none());

    let (status, _) = call(tiny_app(), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
