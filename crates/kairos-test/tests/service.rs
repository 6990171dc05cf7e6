//! A small application exercised end to end through the test client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::StatusCode;
use kairos_core::{RequestContext, Response};
use kairos_extract::{Json, Local, PathParam, QueryMap, State};
use kairos_middleware::stages::RequestIdStage;
use kairos_middleware::{BoxFuture, Middleware, Next};
use kairos_server::App;
use kairos_test::TestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
struct Tenant(String);

/// Copies `x-tenant` into the request locals.
struct TenantResolver;

impl Middleware for TenantResolver {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn process<'a>(&'a self, mut ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let tenant = ctx.header("x-tenant").unwrap_or("public").to_string();
            ctx.locals_mut().insert(Tenant(tenant));
            next.run(ctx).await
        })
    }
}

#[derive(Deserialize, Serialize)]
struct NewItem {
    name: String,
}

fn app() -> App {
    let mut app = App::new();
    app.use_middleware(RequestIdStage::new()).unwrap();
    app.get("/", || async { "root" }).unwrap();
    app.nest("/api", |api| {
        api.use_state(AtomicUsize::new(0))?;
        api.use_middleware(TenantResolver)?;
        api.get("/items/{id}", |PathParam(id): PathParam<u64>, Local(tenant): Local<Tenant>| async move {
            Json(json!({ "id": id, "tenant": tenant.0 }))
        })?;
        api.post("/items", |counter: State<AtomicUsize>, Json(item): Json<NewItem>| async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            (StatusCode::CREATED, Json(json!({ "n": n, "name": item.name })))
        })?;
        api.get("/search", |query: QueryMap| async move {
            query.get("q").map(str::to_string).unwrap_or_default()
        })?;
        Ok(())
    })
    .unwrap();
    app.get("/no-tenant", |Local(tenant): Local<Tenant>| async move { tenant.0 }).unwrap();
    app
}

#[tokio::test]
async fn test_scope_state_and_locals() {
    let client = TestClient::from_app(&mut app()).unwrap();

    client
        .get("/api/items/42")
        .header("x-tenant", "acme")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({ "id": 42, "tenant": "acme" }));

    let first = client.post("/api/items").json(&NewItem { name: "a".into() }).send().await;
    first.assert_status_code(201).assert_json_field("n", &json!(1));
    let second = client.post("/api/items").json(&NewItem { name: "b".into() }).send().await;
    second.assert_json_field("n", &json!(2)).assert_json_field("name", &json!("b"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let client = TestClient::from_app(&mut app()).unwrap();
    let response = client.get("/").send().await;
    response.assert_body_eq("root");
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_extraction_failures_use_the_envelope() {
    let client = TestClient::from_app(&mut app()).unwrap();

    client
        .get("/api/items/abc")
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "INVALID_PARAMETER");

    client
        .post("/api/items")
        .body(r#"{"name":"x"}"#)
        .content_type("text/plain")
        .send()
        .await
        .assert_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE");

    client
        .get("/no-tenant")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_query_map() {
    let client = TestClient::from_app(&mut app()).unwrap();
    client
        .get("/api/search")
        .query(&[("q", "kairos router")])
        .send()
        .await
        .assert_body_eq("kairos router");
}

#[tokio::test]
async fn test_head_falls_back_to_get() {
    let client = TestClient::from_app(&mut app()).unwrap();
    let response = client.head("/").send().await;
    response.assert_success();
}

#[tokio::test]
async fn test_shared_service_is_cloneable() {
    let client = TestClient::from_app(&mut app()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                if client.get("/").send().await.is_success() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}
