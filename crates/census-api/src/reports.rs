//! Aggregate report handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use census_core::{
  citizen::ImportId,
  report::{BirthdayReport, TownAgeStats},
  store::CitizenStore,
};
use chrono::Utc;
use tracing::info;

use crate::{Data, citizens::import_not_found, error::ApiError, extract::Ids};

/// `GET /imports/:import_id/citizens/birthdays`
pub async fn birthdays<S>(
  State(store): State<Arc<S>>,
  Ids(import_id): Ids<ImportId>,
) -> Result<Json<Data<BirthdayReport>>, ApiError>
where
  S: CitizenStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  info!(import_id, "birthdays report");
  let report = store
    .birthdays(import_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| import_not_found(import_id))?;
  Ok(Json(Data::new(report)))
}

/// `GET /imports/:import_id/towns/stat/percentile/age`
///
/// Ages are taken as of the current UTC date.
pub async fn age_percentiles<S>(
  State(store): State<Arc<S>>,
  Ids(import_id): Ids<ImportId>,
) -> Result<Json<Data<Vec<TownAgeStats>>>, ApiError>
where
  S: CitizenStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  info!(import_id, "age percentiles report");
  let stats = store
    .town_age_percentiles(import_id, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| import_not_found(import_id))?;
  Ok(Json(Data::new(stats)))
}
