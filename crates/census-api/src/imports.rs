//! Handler for `POST /imports`.
//!
//! Body: `{"citizens": [<record>, ...]}`. The whole batch is validated before
//! anything is written; one bad record rejects the import.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use census_core::{
  ImportBatch, RecordValidator,
  citizen::ImportId,
  store::CitizenStore,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Data, error::ApiError, parse_json};

#[derive(Debug, Serialize)]
pub struct Created {
  pub import_id: ImportId,
}

/// `POST /imports`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: CitizenStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  info!("create import");
  let body = parse_json(&body)?;
  let records = body.get("citizens").ok_or_else(|| {
    ApiError::BadRequest("body must be an object with a `citizens` array".into())
  })?;

  let batch =
    ImportBatch::parse(records, &RecordValidator::new()).inspect_err(|e| {
      warn!(error = %e, "rejected import");
    })?;
  let count = batch.len();

  let import_id = store.create_import(batch).await.map_err(ApiError::store)?;
  debug!(import_id, citizens = count, "import created");
  Ok((StatusCode::CREATED, Json(Data::new(Created { import_id }))))
}
