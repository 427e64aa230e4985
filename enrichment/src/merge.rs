//! Matching of courier profiles to the records that reference them.
//!
//! A record whose courier has no profile is passed through with `courier: null`.
//! This is the same for single records, batches and listings.

use indexmap::IndexSet;
use std::collections::HashMap;

use crate::types::{CourierId, CourierProfile, Enriched, ForeignKeyed};

/// Distinct courier ids referenced by `records`, in first-seen order.
pub fn distinct_ids<R: ForeignKeyed>(records: &[R]) -> Vec<CourierId> {
    records
        .iter()
        .filter_map(ForeignKeyed::foreign_id)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Requested ids without a matching profile.
pub fn missing_ids(ids: &[CourierId], profiles: &[CourierProfile]) -> Vec<CourierId> {
    let found: IndexSet<CourierId> = profiles.iter().map(|p| p.id).collect();
    ids.iter().filter(|id| !found.contains(*id)).copied().collect()
}

/// Profiles keyed by courier id. The first profile seen for an id wins.
pub struct ProfileIndex {
    profiles: HashMap<CourierId, CourierProfile>,
}

impl ProfileIndex {
    pub fn new(profiles: Vec<CourierProfile>) -> Self {
        let mut index = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            index.entry(profile.id).or_insert(profile);
        }
        ProfileIndex { profiles: index }
    }

    pub fn get(&self, id: CourierId) -> Option<&CourierProfile> {
        self.profiles.get(&id)
    }

    pub fn enrich<R: ForeignKeyed>(&self, mut record: R) -> Enriched<R> {
        record.clear_courier();
        let courier = record.foreign_id().and_then(|id| self.get(id).cloned());
        Enriched { record, courier }
    }
}

/// Pairs every record with its courier profile, preserving record order.
pub fn merge<R: ForeignKeyed>(records: Vec<R>, profiles: Vec<CourierProfile>) -> Vec<Enriched<R>> {
    let index = ProfileIndex::new(profiles);
    records.into_iter().map(|record| index.enrich(record)).collect()
}
