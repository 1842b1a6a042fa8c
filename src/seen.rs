//! Duplicate suppression for materialized records.
//!
//! The same logical creation can reach a view twice: once as the echoed row
//! of a direct mutation and once as the asynchronous change notification
//! for the same insert. Each scope's consumer owns one [`SeenIds`] set and
//! claims an id at the moment it decides to materialize, so the second
//! delivery path finds the id already taken.

use std::collections::HashSet;

use crate::models::RecordId;

/// The set of record ids already materialized for one scope.
///
/// The set only grows while the scope is live; ids are removed solely when
/// the corresponding record is explicitly deleted. `claim` combines the
/// membership check and the insertion in a single synchronous step so no
/// await point can slip between the decision to materialize and the mark.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<RecordId>,
}

impl SeenIds {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an id for materialization. Returns `true` if the id was not
    /// seen before (the caller should materialize), `false` if it was
    /// already claimed (the caller must drop the duplicate).
    pub fn claim(&mut self, id: &RecordId) -> bool {
        self.ids.insert(id.clone())
    }

    /// Check membership without claiming.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Remove an id after its record was explicitly deleted, allowing a
    /// later record with the same id (never the case in practice, but it
    /// keeps the set faithful to the view).
    pub fn forget(&mut self, id: &RecordId) -> bool {
        self.ids.remove(id)
    }

    /// Seed the set from an initial snapshot load.
    pub fn extend<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        self.ids.extend(ids);
    }

    /// Number of claimed ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` when nothing has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
