//! Batch-wide invariants of the relatives graph.
//!
//! Relatives form an undirected graph: if A lists B, B must list A. The
//! symmetry check keeps a signed count per directed edge. Every listing
//! `R → X` adds one to `(R, X)` and subtracts one from `(X, R)`; an edge whose
//! count returns to zero has met its mirror and is dropped. Whatever survives
//! a single pass over the batch is an edge without a partner.

use std::collections::{BTreeSet, HashMap, HashSet, hash_map::Entry};

use crate::{
  citizen::{Citizen, CitizenId},
  error::ValidationError,
};

type Edge = (CitizenId, CitizenId);

/// Check id uniqueness, per-record relative uniqueness and symmetry over a
/// batch of records that have each passed record validation.
pub fn validate_batch(records: &[Citizen]) -> Result<(), ValidationError> {
  let mut seen = HashSet::with_capacity(records.len());
  for citizen in records {
    if !seen.insert(citizen.citizen_id) {
      return Err(ValidationError::DuplicateId(citizen.citizen_id));
    }
  }

  for citizen in records {
    ensure_distinct_relatives(citizen.citizen_id, &citizen.relatives)?;
  }

  let mut edges: HashMap<Edge, i64> = HashMap::new();
  for citizen in records {
    for &relative_id in &citizen.relatives {
      bump(&mut edges, (citizen.citizen_id, relative_id), 1);
      bump(&mut edges, (relative_id, citizen.citizen_id), -1);
    }
  }

  // Report the smallest edge that was listed but never mirrored so the
  // error does not depend on hash order.
  let unmatched = edges
    .iter()
    .filter(|&(_, &count)| count > 0)
    .map(|(&edge, _)| edge)
    .min()
    .or_else(|| edges.keys().min().copied());

  match unmatched {
    Some((citizen_id, relative_id)) => {
      Err(ValidationError::AsymmetricRelation { citizen_id, relative_id })
    }
    None => Ok(()),
  }
}

fn bump(edges: &mut HashMap<Edge, i64>, edge: Edge, delta: i64) {
  match edges.entry(edge) {
    Entry::Occupied(mut slot) => {
      *slot.get_mut() += delta;
      if *slot.get() == 0 {
        slot.remove();
      }
    }
    Entry::Vacant(slot) => {
      slot.insert(delta);
    }
  }
}

/// Fail with [`ValidationError::DuplicateRelative`] on the first id that
/// `relatives` repeats.
pub fn ensure_distinct_relatives(
  citizen_id: CitizenId,
  relatives: &[CitizenId],
) -> Result<(), ValidationError> {
  let mut seen = HashSet::with_capacity(relatives.len());
  match relatives.iter().find(|&&id| !seen.insert(id)) {
    Some(&relative_id) => {
      Err(ValidationError::DuplicateRelative { citizen_id, relative_id })
    }
    None => Ok(()),
  }
}

// ─── Symmetric updates ───────────────────────────────────────────────────────

/// The change between a citizen's old and new relatives, with set semantics.
///
/// A store applying an update writes both directions of every `added` edge
/// and deletes both directions of every `removed` edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativesDelta {
  /// Ids present only in the new list, ascending.
  pub added:   Vec<CitizenId>,
  /// Ids present only in the old list, ascending.
  pub removed: Vec<CitizenId>,
}

impl RelativesDelta {
  pub fn between(old: &[CitizenId], new: &[CitizenId]) -> Self {
    let old: BTreeSet<_> = old.iter().copied().collect();
    let new: BTreeSet<_> = new.iter().copied().collect();
    Self {
      added:   new.difference(&old).copied().collect(),
      removed: old.difference(&new).copied().collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty()
  }
}
