//! The `CitizenStore` trait and supporting result types.
//!
//! The trait is implemented by storage backends (e.g. `census-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  batch::ImportBatch,
  citizen::{Citizen, CitizenId, CitizenPatch, ImportId},
  report::{BirthdayReport, TownAgeStats},
};

/// The result of [`CitizenStore::update_citizen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
  /// The patch was applied; carries the citizen as it now stands.
  Updated(Citizen),
  ImportNotFound,
  CitizenNotFound,
  /// The patch lists relatives that do not exist in the import. Nothing was
  /// written.
  UnknownRelatives(Vec<CitizenId>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a census store backend.
///
/// Each import is an isolated dataset; citizen ids are only meaningful
/// within their import. Implementations own id generation for imports and
/// must apply every write atomically.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CitizenStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a validated batch as a new import and return its id.
  fn create_import(
    &self,
    batch: ImportBatch,
  ) -> impl Future<Output = Result<ImportId, Self::Error>> + Send + '_;

  /// Apply `patch` to one citizen.
  ///
  /// When the patch carries `relatives`, the relation is kept symmetric: the
  /// citizen is added to every new relative's list and removed from every
  /// dropped relative's list, in the same transaction.
  fn update_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    patch: CitizenPatch,
  ) -> impl Future<Output = Result<PatchOutcome, Self::Error>> + Send + '_;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn import_exists(
    &self,
    import_id: ImportId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn citizen_exists(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The citizen's current relatives, ascending. `None` if the citizen (or
  /// the import) does not exist.
  fn get_relatives(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> impl Future<Output = Result<Option<Vec<CitizenId>>, Self::Error>> + Send + '_;

  /// Every citizen of the import, ordered by id. `None` if the import does
  /// not exist.
  fn list_citizens(
    &self,
    import_id: ImportId,
  ) -> impl Future<Output = Result<Option<Vec<Citizen>>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Presents each citizen buys per month for their relatives' birthdays.
  fn birthdays(
    &self,
    import_id: ImportId,
  ) -> impl Future<Output = Result<Option<BirthdayReport>, Self::Error>> + Send + '_;

  /// Age percentiles per town, ages computed as of `as_of`.
  fn town_age_percentiles(
    &self,
    import_id: ImportId,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Option<Vec<TownAgeStats>>, Self::Error>> + Send + '_;
}
