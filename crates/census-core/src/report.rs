//! Aggregate reports over one import.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::citizen::CitizenId;

// ─── Birthdays ───────────────────────────────────────────────────────────────

/// How many presents a citizen buys in one month: one per relative born in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayEntry {
  pub citizen_id: CitizenId,
  pub presents:   u64,
}

/// Presents per month, keyed `1..=12`. Every month is present, possibly
/// empty; serialises as `{"1": [...], ..., "12": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BirthdayReport {
  months: BTreeMap<u32, Vec<BirthdayEntry>>,
}

impl Default for BirthdayReport {
  fn default() -> Self { Self::new() }
}

impl BirthdayReport {
  pub fn new() -> Self {
    Self { months: (1..=12).map(|m| (m, Vec::new())).collect() }
  }

  /// Record `presents` for `citizen_id` in `month`. Months outside `1..=12`
  /// are ignored.
  pub fn push(&mut self, month: u32, citizen_id: CitizenId, presents: u64) {
    if let Some(entries) = self.months.get_mut(&month) {
      entries.push(BirthdayEntry { citizen_id, presents });
    }
  }

  pub fn month(&self, month: u32) -> &[BirthdayEntry] {
    self.months.get(&month).map(Vec::as_slice).unwrap_or(&[])
  }
}

// ─── Age percentiles ─────────────────────────────────────────────────────────

/// Age percentiles of one town's residents, in full years, rounded to two
/// decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownAgeStats {
  pub town: String,
  pub p50:  f64,
  pub p75:  f64,
  pub p99:  f64,
}

/// Full years between `birth_date` and `as_of`.
pub fn age_on(birth_date: NaiveDate, as_of: NaiveDate) -> u32 {
  as_of.years_since(birth_date).unwrap_or(0)
}

/// Continuous percentile of sorted `values`: linear interpolation between
/// the two closest ranks. `rank` is in `0.0..=1.0`.
pub fn percentile(sorted: &[f64], rank: f64) -> Option<f64> {
  let last = sorted.len().checked_sub(1)?;
  let position = rank * last as f64;
  let lower = position.floor() as usize;
  let upper = position.ceil() as usize;
  let weight = position - lower as f64;
  Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

/// Group `residents` (town, birth date) by town and compute p50/p75/p99 of
/// their ages as of `as_of`. Towns are returned in name order.
pub fn town_age_percentiles(
  residents: impl IntoIterator<Item = (String, NaiveDate)>,
  as_of: NaiveDate,
) -> Vec<TownAgeStats> {
  let mut towns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
  for (town, birth_date) in residents {
    towns
      .entry(town)
      .or_default()
      .push(f64::from(age_on(birth_date, as_of)));
  }

  towns
    .into_iter()
    .filter_map(|(town, mut ages)| {
      ages.sort_by(f64::total_cmp);
      Some(TownAgeStats {
        p50: round2(percentile(&ages, 0.5)?),
        p75: round2(percentile(&ages, 0.75)?),
        p99: round2(percentile(&ages, 0.99)?),
        town,
      })
    })
    .collect()
}
