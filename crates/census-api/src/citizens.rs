//! Handlers for the citizens of one import.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/imports/:import_id/citizens` | 404 if the import is missing |
//! | `PATCH` | `/imports/:import_id/citizens/:citizen_id` | partial update; relatives are mirrored |

use std::sync::Arc;

use axum::{Json, extract::State};
use bytes::Bytes;
use census_core::{
  RecordValidator,
  citizen::{Citizen, CitizenId, ImportId},
  graph::ensure_distinct_relatives,
  store::{CitizenStore, PatchOutcome},
};
use tracing::{debug, info, warn};

use crate::{Data, error::ApiError, extract::Ids, parse_json};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /imports/:import_id/citizens`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Ids(import_id): Ids<ImportId>,
) -> Result<Json<Data<Vec<Citizen>>>, ApiError>
where
  S: CitizenStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  info!(import_id, "list citizens");
  let citizens = store
    .list_citizens(import_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| import_not_found(import_id))?;
  Ok(Json(Data::new(citizens)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /imports/:import_id/citizens/:citizen_id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Ids((import_id, citizen_id)): Ids<(ImportId, CitizenId)>,
  body: Bytes,
) -> Result<Json<Data<Citizen>>, ApiError>
where
  S: CitizenStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  info!(import_id, citizen_id, "update citizen");
  let body = parse_json(&body)?;

  let patch = RecordValidator::new()
    .parse_update(&body)
    .and_then(|patch| {
      if let Some(relatives) = &patch.relatives {
        ensure_distinct_relatives(citizen_id, relatives)?;
      }
      Ok(patch)
    })
    .inspect_err(|e| warn!(import_id, citizen_id, error = %e, "rejected patch"))?;

  let outcome = store
    .update_citizen(import_id, citizen_id, patch)
    .await
    .map_err(ApiError::store)?;

  match outcome {
    PatchOutcome::Updated(citizen) => {
      debug!(import_id, citizen_id, "citizen updated");
      Ok(Json(Data::new(citizen)))
    }
    PatchOutcome::ImportNotFound => Err(import_not_found(import_id)),
    PatchOutcome::CitizenNotFound => Err(ApiError::NotFound(format!(
      "citizen {citizen_id} not found in import {import_id}"
    ))),
    PatchOutcome::UnknownRelatives(ids) => {
      let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
      warn!(import_id, citizen_id, unknown = ?ids, "rejected patch");
      Err(ApiError::BadRequest(format!(
        "unknown relatives in import {import_id}: {}",
        ids.join(", ")
      )))
    }
  }
}

pub(crate) fn import_not_found(import_id: ImportId) -> ApiError {
  ApiError::NotFound(format!("import {import_id} not found"))
}
