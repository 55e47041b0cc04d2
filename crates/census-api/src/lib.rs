//! JSON REST API for the census service.
//!
//! Exposes an axum [`Router`] backed by any [`census_core::store::CitizenStore`].
//! Successful responses wrap their payload as `{"data": ...}`; failures are
//! `{"error": "<message>"}`. Transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = census_api::api_router(Arc::new(store));
//! ```

pub mod citizens;
pub mod error;
pub mod extract;
pub mod imports;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use census_core::store::CitizenStore;
use serde::Serialize;
use serde_json::Value;

pub use error::ApiError;

/// The success envelope.
#[derive(Debug, Serialize)]
pub struct Data<T> {
  pub data: T,
}

impl<T> Data<T> {
  pub fn new(data: T) -> Self { Self { data } }
}

/// Parse a request body as JSON whatever its `Content-Type`.
pub(crate) fn parse_json(body: &[u8]) -> Result<Value, ApiError> {
  serde_json::from_slice(body)
    .map_err(|e| ApiError::BadRequest(format!("malformed JSON body: {e}")))
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CitizenStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/ping", get(ping))
    .route("/imports", post(imports::create::<S>))
    .route("/imports/{import_id}/citizens", get(citizens::list::<S>))
    .route(
      "/imports/{import_id}/citizens/{citizen_id}",
      patch(citizens::update::<S>),
    )
    .route(
      "/imports/{import_id}/citizens/birthdays",
      get(reports::birthdays::<S>),
    )
    .route(
      "/imports/{import_id}/towns/stat/percentile/age",
      get(reports::age_percentiles::<S>),
    )
    .with_state(store)
}

/// `GET /ping`
async fn ping() -> &'static str { "pong" }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use census_store_sqlite::SqliteStore;
  use serde_json::json;
  use tower::ServiceExt as _;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(
    app:    &Router,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_default();
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .body(body)
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
  }

  fn record(id: u64, birth_date: &str, relatives: Value) -> Value {
    json!({
      "citizen_id": id,
      "town": "Москва",
      "street": "Льва Толстого",
      "building": "16к7стр5",
      "apartment": 7,
      "name": "Иванов Иван Иванович",
      "birth_date": birth_date,
      "gender": "male",
      "relatives": relatives
    })
  }

  fn family() -> Value {
    json!({
      "citizens": [
        record(1, "26.12.1986", json!([2])),
        record(2, "01.04.1997", json!([1])),
        record(3, "11.04.1991", json!([])),
      ]
    })
  }

  // ── Ping ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn ping_answers_pong() {
    let app = app().await;
    let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    assert_eq!(&bytes[..], b"pong");
  }

  // ── Imports ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn import_then_list_round_trips() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/imports", Some(family())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"data": {"import_id": 1}}));

    let (status, body) = send(&app, "GET", "/imports/1/citizens", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], family()["citizens"]);
  }

  #[tokio::test]
  async fn dates_are_rendered_zero_padded() {
    let app = app().await;
    let body = json!({"citizens": [record(1, "1.4.1997", json!([]))]});
    send(&app, "POST", "/imports", Some(body)).await;

    let (_, body) = send(&app, "GET", "/imports/1/citizens", None).await;
    assert_eq!(body["data"][0]["birth_date"], "01.04.1997");
  }

  #[tokio::test]
  async fn asymmetric_import_is_rejected() {
    let app = app().await;
    let body = json!({
      "citizens": [record(1, "26.12.1986", json!([2])), record(2, "01.04.1997", json!([]))]
    });
    let (status, body) = send(&app, "POST", "/imports", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Nothing was stored.
    let (status, _) = send(&app, "GET", "/imports/1/citizens", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_bodies_are_bad_requests() {
    let app = app().await;
    let req = Request::builder()
      .method("POST")
      .uri("/imports")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, _) =
      send(&app, "POST", "/imports", Some(json!([record(1, "01.01.2000", json!([]))])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_import_is_not_found() {
    let app = app().await;
    for uri in [
      "/imports/7/citizens",
      "/imports/7/citizens/birthdays",
      "/imports/7/towns/stat/percentile/age",
    ] {
      let (status, body) = send(&app, "GET", uri, None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
      assert_eq!(body["error"], "import 7 not found");
    }
  }

  #[tokio::test]
  async fn unparsable_ids_use_the_error_envelope() {
    let app = app().await;
    send(&app, "POST", "/imports", Some(family())).await;

    for (method, uri, body) in [
      ("GET", "/imports/abc/citizens", None),
      ("GET", "/imports/abc/towns/stat/percentile/age", None),
      ("PATCH", "/imports/1/citizens/-3", Some(json!({"name": "Кто-то"}))),
    ] {
      let (status, body) = send(&app, method, uri, body).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
      assert!(body["error"].is_string(), "{uri}: {body}");
    }
  }

  // ── Updates ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn patch_mirrors_relatives() {
    let app = app().await;
    send(&app, "POST", "/imports", Some(family())).await;

    let (status, body) = send(
      &app,
      "PATCH",
      "/imports/1/citizens/1",
      Some(json!({"relatives": [3], "name": "Иванов Пётр"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["relatives"], json!([3]));
    assert_eq!(body["data"]["name"], "Иванов Пётр");

    let (_, body) = send(&app, "GET", "/imports/1/citizens", None).await;
    assert_eq!(body["data"][1]["relatives"], json!([]));
    assert_eq!(body["data"][2]["relatives"], json!([1]));
  }

  #[tokio::test]
  async fn patch_rejections() {
    let app = app().await;
    send(&app, "POST", "/imports", Some(family())).await;

    let cases = [
      ("/imports/1/citizens/1", json!({"citizen_id": 5}), StatusCode::BAD_REQUEST),
      ("/imports/1/citizens/1", json!({"nickname": "x"}), StatusCode::BAD_REQUEST),
      ("/imports/1/citizens/1", json!({"relatives": [2, 2]}), StatusCode::BAD_REQUEST),
      ("/imports/1/citizens/1", json!({"relatives": [42]}), StatusCode::BAD_REQUEST),
      ("/imports/1/citizens/9", json!({"name": "Кто-то"}), StatusCode::NOT_FOUND),
      ("/imports/2/citizens/1", json!({"name": "Кто-то"}), StatusCode::NOT_FOUND),
    ];
    for (uri, patch, expected) in cases {
      let (status, body) = send(&app, "PATCH", uri, Some(patch.clone())).await;
      assert_eq!(status, expected, "{uri} {patch}");
      assert!(body["error"].is_string(), "{uri} {patch}");
    }

    // The rejected patches left citizen 1 untouched.
    let (_, body) = send(&app, "GET", "/imports/1/citizens", None).await;
    assert_eq!(body["data"][0], family()["citizens"][0]);
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn birthdays_report_has_twelve_months() {
    let app = app().await;
    send(&app, "POST", "/imports", Some(family())).await;

    let (status, body) =
      send(&app, "GET", "/imports/1/citizens/birthdays", None).await;
    assert_eq!(status, StatusCode::OK);
    let months = body["data"].as_object().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(body["data"]["4"], json!([{"citizen_id": 1, "presents": 1}]));
    assert_eq!(body["data"]["12"], json!([{"citizen_id": 2, "presents": 1}]));
  }

  #[tokio::test]
  async fn age_percentiles_cover_each_town() {
    let app = app().await;
    send(&app, "POST", "/imports", Some(family())).await;

    let (status, body) =
      send(&app, "GET", "/imports/1/towns/stat/percentile/age", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = body["data"].as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["town"], "Москва");
    for key in ["p50", "p75", "p99"] {
      assert!(stats[0][key].is_f64(), "{key}");
    }
  }
}
