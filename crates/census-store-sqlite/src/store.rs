//! The SQLite implementation of [`CitizenStore`].

use std::{collections::HashMap, path::Path};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, ToSql};
use tracing::debug;

use census_core::{
  batch::ImportBatch,
  citizen::{Citizen, CitizenId, CitizenPatch, ImportId},
  graph::RelativesDelta,
  report::{self, BirthdayReport, TownAgeStats},
  store::{CitizenStore, PatchOutcome},
};

use crate::{
  encode::{
    decode_date, encode_date, encode_dt, encode_gender, patch_columns,
    RawCitizen, CITIZEN_COLUMNS,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A census store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// Ids are bound as `u64`; rusqlite refuses values above `i64::MAX`, so callers
// screen those out with `storable` first.

fn storable(id: u64) -> bool { i64::try_from(id).is_ok() }

fn import_row_exists(conn: &Connection, import_id: ImportId) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM imports WHERE import_id = ?1",
        rusqlite::params![import_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn citizen_row_exists(
  conn: &Connection,
  import_id: ImportId,
  citizen_id: CitizenId,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM citizens WHERE import_id = ?1 AND citizen_id = ?2",
        rusqlite::params![import_id, citizen_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn citizen_row(
  conn: &Connection,
  import_id: ImportId,
  citizen_id: CitizenId,
) -> rusqlite::Result<Option<RawCitizen>> {
  conn
    .query_row(
      &format!(
        "SELECT {CITIZEN_COLUMNS} FROM citizens
         WHERE import_id = ?1 AND citizen_id = ?2"
      ),
      rusqlite::params![import_id, citizen_id],
      RawCitizen::from_row,
    )
    .optional()
}

fn relatives_of(
  conn: &Connection,
  import_id: ImportId,
  citizen_id: CitizenId,
) -> rusqlite::Result<Vec<CitizenId>> {
  let mut stmt = conn.prepare(
    "SELECT relative_id FROM relatives
     WHERE import_id = ?1 AND citizen_id = ?2
     ORDER BY relative_id",
  )?;
  stmt
    .query_map(rusqlite::params![import_id, citizen_id], |row| row.get(0))?
    .collect()
}

/// What the update transaction decided, before rows are decoded.
enum RawOutcome {
  Updated(RawCitizen, Vec<CitizenId>),
  ImportNotFound,
  CitizenNotFound,
  UnknownRelatives(Vec<CitizenId>),
}

// ─── CitizenStore impl ───────────────────────────────────────────────────────

impl CitizenStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create_import(&self, batch: ImportBatch) -> Result<ImportId> {
    let created_at = encode_dt(Utc::now());
    let citizens: Vec<Citizen> = batch.into_citizens();
    let count = citizens.len();

    let import_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let import_id: ImportId = tx.query_row(
          "INSERT INTO imports (created_at) VALUES (?1) RETURNING import_id",
          rusqlite::params![created_at],
          |row| row.get(0),
        )?;

        {
          let mut insert_citizen = tx.prepare(
            "INSERT INTO citizens (
               import_id, citizen_id, town, street, building,
               apartment, name, birth_date, gender
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          )?;
          for c in &citizens {
            insert_citizen.execute(rusqlite::params![
              import_id,
              c.citizen_id,
              c.town,
              c.street,
              c.building,
              c.apartment,
              c.name,
              encode_date(c.birth_date),
              encode_gender(c.gender),
            ])?;
          }

          // Every citizen row must exist before the edges referencing it.
          let mut insert_relative = tx.prepare(
            "INSERT INTO relatives (import_id, citizen_id, relative_id)
             VALUES (?1, ?2, ?3)",
          )?;
          for c in &citizens {
            for relative_id in &c.relatives {
              insert_relative.execute(rusqlite::params![
                import_id,
                c.citizen_id,
                relative_id
              ])?;
            }
          }
        }

        tx.commit()?;
        Ok(import_id)
      })
      .await?;

    debug!(import_id, citizens = count, "stored import");
    Ok(import_id)
  }

  async fn update_citizen(
    &self,
    import_id:  ImportId,
    citizen_id: CitizenId,
    patch:      CitizenPatch,
  ) -> Result<PatchOutcome> {
    if !storable(import_id) {
      return Ok(PatchOutcome::ImportNotFound);
    }
    if !storable(citizen_id) {
      return Ok(PatchOutcome::CitizenNotFound);
    }

    let columns = patch_columns(&patch)?;
    let relatives = patch.relatives;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !import_row_exists(&tx, import_id)? {
          return Ok(RawOutcome::ImportNotFound);
        }
        if !citizen_row_exists(&tx, import_id, citizen_id)? {
          return Ok(RawOutcome::CitizenNotFound);
        }

        if let Some(new) = relatives {
          let mut unknown = Vec::new();
          for &relative_id in &new {
            if !storable(relative_id)
              || !citizen_row_exists(&tx, import_id, relative_id)?
            {
              unknown.push(relative_id);
            }
          }
          if !unknown.is_empty() {
            // Dropping `tx` rolls back.
            return Ok(RawOutcome::UnknownRelatives(unknown));
          }

          let old = relatives_of(&tx, import_id, citizen_id)?;
          let delta = RelativesDelta::between(&old, &new);
          for relative_id in &delta.removed {
            tx.execute(
              "DELETE FROM relatives
               WHERE import_id = ?1
                 AND ((citizen_id = ?2 AND relative_id = ?3)
                   OR (citizen_id = ?3 AND relative_id = ?2))",
              rusqlite::params![import_id, citizen_id, relative_id],
            )?;
          }
          for relative_id in &delta.added {
            tx.execute(
              "INSERT OR IGNORE INTO relatives (import_id, citizen_id, relative_id)
               VALUES (?1, ?2, ?3), (?1, ?3, ?2)",
              rusqlite::params![import_id, citizen_id, relative_id],
            )?;
          }
        }

        if !columns.is_empty() {
          let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
          let n = columns.len();
          let sql = format!(
            "UPDATE citizens SET {assignments}
             WHERE import_id = ?{} AND citizen_id = ?{}",
            n + 1,
            n + 2,
          );
          let mut values: Vec<&dyn ToSql> =
            columns.iter().map(|(_, v)| v as &dyn ToSql).collect();
          values.push(&import_id);
          values.push(&citizen_id);
          tx.execute(&sql, values.as_slice())?;
        }

        let row = citizen_row(&tx, import_id, citizen_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        let relatives = relatives_of(&tx, import_id, citizen_id)?;
        tx.commit()?;
        Ok(RawOutcome::Updated(row, relatives))
      })
      .await?;

    Ok(match raw {
      RawOutcome::Updated(row, relatives) => {
        debug!(import_id, citizen_id, "updated citizen");
        PatchOutcome::Updated(row.into_citizen(relatives)?)
      }
      RawOutcome::ImportNotFound => PatchOutcome::ImportNotFound,
      RawOutcome::CitizenNotFound => PatchOutcome::CitizenNotFound,
      RawOutcome::UnknownRelatives(ids) => PatchOutcome::UnknownRelatives(ids),
    })
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn import_exists(&self, import_id: ImportId) -> Result<bool> {
    if !storable(import_id) {
      return Ok(false);
    }
    Ok(
      self
        .conn
        .call(move |conn| Ok(import_row_exists(conn, import_id)?))
        .await?,
    )
  }

  async fn citizen_exists(
    &self,
    import_id:  ImportId,
    citizen_id: CitizenId,
  ) -> Result<bool> {
    if !storable(import_id) || !storable(citizen_id) {
      return Ok(false);
    }
    Ok(
      self
        .conn
        .call(move |conn| Ok(citizen_row_exists(conn, import_id, citizen_id)?))
        .await?,
    )
  }

  async fn get_relatives(
    &self,
    import_id:  ImportId,
    citizen_id: CitizenId,
  ) -> Result<Option<Vec<CitizenId>>> {
    if !storable(import_id) || !storable(citizen_id) {
      return Ok(None);
    }
    Ok(
      self
        .conn
        .call(move |conn| {
          if !citizen_row_exists(conn, import_id, citizen_id)? {
            return Ok(None);
          }
          Ok(Some(relatives_of(conn, import_id, citizen_id)?))
        })
        .await?,
    )
  }

  async fn list_citizens(&self, import_id: ImportId) -> Result<Option<Vec<Citizen>>> {
    if !storable(import_id) {
      return Ok(None);
    }

    let raws: Option<(Vec<RawCitizen>, Vec<(CitizenId, CitizenId)>)> = self
      .conn
      .call(move |conn| {
        if !import_row_exists(conn, import_id)? {
          return Ok(None);
        }

        let mut stmt = conn.prepare(&format!(
          "SELECT {CITIZEN_COLUMNS} FROM citizens
           WHERE import_id = ?1
           ORDER BY citizen_id"
        ))?;
        let citizens = stmt
          .query_map(rusqlite::params![import_id], RawCitizen::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT citizen_id, relative_id FROM relatives
           WHERE import_id = ?1
           ORDER BY citizen_id, relative_id",
        )?;
        let edges = stmt
          .query_map(rusqlite::params![import_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((citizens, edges)))
      })
      .await?;

    let Some((citizens, edges)) = raws else {
      return Ok(None);
    };

    let mut relatives: HashMap<CitizenId, Vec<CitizenId>> = HashMap::new();
    for (citizen_id, relative_id) in edges {
      relatives.entry(citizen_id).or_default().push(relative_id);
    }

    citizens
      .into_iter()
      .map(|raw| {
        let own = relatives.remove(&raw.citizen_id).unwrap_or_default();
        raw.into_citizen(own)
      })
      .collect::<Result<Vec<_>>>()
      .map(Some)
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn birthdays(&self, import_id: ImportId) -> Result<Option<BirthdayReport>> {
    if !storable(import_id) {
      return Ok(None);
    }

    let rows: Option<Vec<(u32, CitizenId, u64)>> = self
      .conn
      .call(move |conn| {
        if !import_row_exists(conn, import_id)? {
          return Ok(None);
        }

        // One present per relative, bought in the month the relative was born.
        let mut stmt = conn.prepare(
          "SELECT CAST(strftime('%m', r.birth_date) AS INTEGER) AS month,
                  e.citizen_id,
                  COUNT(*)
           FROM relatives e
           JOIN citizens r
             ON r.import_id = e.import_id AND r.citizen_id = e.relative_id
           WHERE e.import_id = ?1
           GROUP BY month, e.citizen_id
           ORDER BY month, e.citizen_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![import_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    Ok(rows.map(|rows| {
      let mut report = BirthdayReport::new();
      for (month, citizen_id, presents) in rows {
        report.push(month, citizen_id, presents);
      }
      report
    }))
  }

  async fn town_age_percentiles(
    &self,
    import_id: ImportId,
    as_of:     NaiveDate,
  ) -> Result<Option<Vec<TownAgeStats>>> {
    if !storable(import_id) {
      return Ok(None);
    }

    let rows: Option<Vec<(String, String)>> = self
      .conn
      .call(move |conn| {
        if !import_row_exists(conn, import_id)? {
          return Ok(None);
        }
        let mut stmt = conn.prepare(
          "SELECT town, birth_date FROM citizens WHERE import_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![import_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    let Some(rows) = rows else {
      return Ok(None);
    };

    let residents = rows
      .into_iter()
      .map(|(town, birth_date)| Ok((town, decode_date(&birth_date)?)))
      .collect::<Result<Vec<_>>>()?;
    Ok(Some(report::town_age_percentiles(residents, as_of)))
  }
}
