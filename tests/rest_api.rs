//! End-to-end tests: bootstrap with extensions over the in-memory store, then drive the router.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use docstore_rest::{app_router, AppConfig, Bootstrap, ServiceRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

const POST_MAPPING: &str = r#"{
    "class": "App\\Post",
    "collection": "posts",
    "fields": [
        { "name": "title", "type": "string", "validation": { "required": true, "max_length": 40 } },
        { "name": "views", "type": "int", "validation": { "minimum": 0 } },
        { "name": "status", "type": "string", "validation": { "allowed": ["draft", "published"] } },
        { "name": "secret", "type": "string", "serialize": false },
        { "name": "createdBy", "type": "string", "annotations": ["stamp:createdBy"] },
        { "name": "createdOn", "type": "date", "annotations": ["stamp:createdOn"] },
        { "name": "revision", "type": "int", "annotations": ["version:number"] },
        { "name": "deleted", "type": "boolean", "annotations": ["softDelete:flag"] },
        { "name": "deletedOn", "type": "date", "annotations": ["softDelete:deletedOn"] }
    ]
}"#;

struct TestApp {
    router: Router,
    _mappings: tempfile::TempDir,
}

async fn app() -> TestApp {
    let mappings = tempfile::tempdir().unwrap();
    std::fs::write(mappings.path().join("post.json"), POST_MAPPING).unwrap();
    let config: AppConfig = serde_json::from_value(json!({
        "odm": {
            "driver": {
                "odm_default": { "class": "chain", "drivers": { "App\\": "app" } },
                "app": { "class": "annotation", "paths": [mappings.path().to_string_lossy()] }
            }
        },
        "extensions": {
            "extension_configs": { "stamp": true, "version": true, "softDelete": true },
            "active_user": "current.user"
        },
        "services": { "values": { "current.user": "editor" } },
        "resources": { "posts": { "document_class": "App\\Post", "limit": 2 } }
    }))
    .unwrap();

    let mut application = Bootstrap::new(config, ServiceRegistry::default())
        .load_modules_post()
        .unwrap();
    application.connect().await.unwrap();
    TestApp {
        router: app_router(application.into_state(), 64 * 1024),
        _mappings: mappings,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let range = response
        .headers()
        .get(header::CONTENT_RANGE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, range, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn seed(router: &Router) {
    for (id, title, views) in [("p1", "alpha", 10), ("p2", "beta", 30), ("p3", "gamma", 20)] {
        let (status, _, _) = send(
            router,
            json_request("POST", "/posts", json!({"id": id, "title": title, "views": views, "status": "draft"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn create_applies_extension_subscribers_and_hides_unserialized_fields() {
    let app = app().await;
    let (status, _, body) = send(
        &app.router,
        json_request("POST", "/posts", json!({"title": "hello", "secret": "s3cr3t", "unknown": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(body["createdBy"], json!("editor"));
    assert!(body["createdOn"].is_string());
    assert_eq!(body["revision"], json!(1));
    assert_eq!(body["deleted"], json!(false));
    assert!(body.get("secret").is_none());
    assert!(body.get("unknown").is_none());
}

#[tokio::test]
async fn list_uses_default_limit_and_reports_content_range() {
    let app = app().await;
    seed(&app.router).await;

    let (status, range, body) = send(&app.router, get("/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(range.as_deref(), Some("0-2/3"));
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_honours_range_sort_and_criteria() {
    let app = app().await;
    seed(&app.router).await;

    let request = Request::builder()
        .uri("/posts?sort(-views)")
        .header(header::RANGE, "items=1-2")
        .body(Body::empty())
        .unwrap();
    let (status, range, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(range.as_deref(), Some("1-3/3"));
    let titles: Vec<&str> = body.as_array().unwrap().iter().map(|d| d["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["gamma", "alpha"]);

    let (_, range, body) = send(&app.router, get("/posts?title=beta")).await;
    assert_eq!(range.as_deref(), Some("0-1/1"));
    assert_eq!(body[0]["id"], json!("p2"));

    let (_, range, body) = send(&app.router, get("/posts?views=20&sort(+title)")).await;
    assert_eq!(range.as_deref(), Some("0-1/1"));
    assert_eq!(body[0]["title"], json!("gamma"));
}

#[tokio::test]
async fn malformed_range_is_a_bad_request() {
    let app = app().await;
    let request = Request::builder()
        .uri("/posts")
        .header(header::RANGE, "items=5-1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn missing_document_and_unknown_resource_are_not_found() {
    let app = app().await;
    let (status, _, body) = send(&app.router, get("/posts/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"]["message"],
        json!("Document with id nope could not be found in the database")
    );

    let (status, _, _) = send(&app.router, get("/comments")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_create_is_rejected_and_nothing_is_stored() {
    let app = app().await;
    let (status, _, body) = send(
        &app.router,
        json_request("POST", "/posts", json!({"views": -1, "status": "archived"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("invalid_argument"));
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("title is required"));
    assert!(message.contains("status must be one of"));

    let (_, range, _) = send(&app.router, get("/posts")).await;
    assert_eq!(range.as_deref(), Some("0-0/0"));
}

#[tokio::test]
async fn failed_update_leaves_the_stored_document_unchanged() {
    let app = app().await;
    seed(&app.router).await;
    let (_, _, before) = send(&app.router, get("/posts/p1")).await;

    let (status, _, _) = send(
        &app.router,
        json_request("PUT", "/posts/p1", json!({"title": "x".repeat(41)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, _, after) = send(&app.router, get("/posts/p1")).await;
    assert_eq!(after, before);

    let (status, _, updated) = send(&app.router, json_request("PATCH", "/posts/p1", json!({"views": 11}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["views"], json!(11));
    assert_eq!(updated["revision"], json!(2));
}

#[tokio::test]
async fn soft_deleted_documents_are_hidden_from_reads() {
    let app = app().await;
    seed(&app.router).await;

    let (status, _, body) = send(&app.router, json_request("PUT", "/posts/p2", json!({"deleted": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["deletedOn"].is_string());

    let (_, range, _) = send(&app.router, get("/posts")).await;
    assert_eq!(range.as_deref(), Some("0-2/2"));
    let (status, _, _) = send(&app.router, get("/posts/p2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_returns_no_content_and_removes_the_document() {
    let app = app().await;
    seed(&app.router).await;

    let request = Request::builder().method("DELETE").uri("/posts/p3").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _, _) = send(&app.router, get("/posts/p3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_ready_respond() {
    let app = app().await;
    let (status, _, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, _, body) = send(&app.router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (_, _, body) = send(&app.router, get("/version")).await;
    assert_eq!(body["name"], json!("docstore-rest"));
}
