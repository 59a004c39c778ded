//! In-memory zone cache
//!
//! [`ZoneTable`] holds the authoritative mapping from zone identifier to [`Zone`]. It is
//! read by every query and written only by the refresh loop, so all three operations
//! take a single read/write lock: lookups share it, reconciliation takes it exclusively
//! for one linear pass over the old and new zone sets. No reader can observe a table
//! that mixes two snapshots.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::rr::{Zone, ZoneID};

#[derive(Debug, Default)]
struct Snapshot {
    zones: HashMap<ZoneID, Zone>,

    /// The sequence last passed to [`ZoneTable::replace_all`], used to skip no-op
    /// reconciliations and to find removed identifiers.
    last: Vec<Zone>,
}

/// Concurrent, read-mostly cache of the zone catalogue.
pub struct ZoneTable {
    inner: RwLock<Snapshot>,
}

impl fmt::Debug for ZoneTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneTable")
            .field("zones", &self.len())
            .finish()
    }
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ZoneTable {
    /// Seed a table from an initial full fetch.
    pub fn new(zones: Vec<Zone>) -> Self {
        let map = zones.iter().map(|zone| (zone.id(), zone.clone())).collect();
        Self {
            inner: RwLock::new(Snapshot {
                zones: map,
                last: zones,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner.read().expect("zone table poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner.write().expect("zone table poisoned")
    }

    /// Get the zone currently cached under `id`.
    pub fn get(&self, id: ZoneID) -> Option<Zone> {
        self.read().zones.get(&id).cloned()
    }

    /// Check whether a zone is currently cached under `id`.
    pub fn has(&self, id: ZoneID) -> bool {
        self.read().zones.contains_key(&id)
    }

    /// Number of cached zones.
    pub fn len(&self) -> usize {
        self.read().zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().zones.is_empty()
    }

    /// Identifiers of all cached zones, in ascending order.
    pub fn ids(&self) -> Vec<ZoneID> {
        let mut ids: Vec<_> = self.read().zones.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Reconcile the table to exactly `zones`.
    ///
    /// Identifiers missing from `zones` are dropped, every zone in `zones` is inserted
    /// or overwritten, and `zones` becomes the new last-known sequence. A sequence equal
    /// (element-wise, in order) to the last-known one leaves the table untouched.
    ///
    /// Returns `true` if the table was modified.
    #[tracing::instrument(skip_all, fields(zones = zones.len()), level = "trace")]
    pub fn replace_all(&self, zones: Vec<Zone>) -> bool {
        // An unchanged catalogue never takes the write lock.
        if self.read().last == zones {
            tracing::trace!("zone set unchanged");
            return false;
        }

        let mut snapshot = self.write();
        if snapshot.last == zones {
            return false;
        }

        let retained: HashSet<ZoneID> = zones.iter().map(Zone::id).collect();
        let removed: Vec<ZoneID> = snapshot
            .last
            .iter()
            .map(Zone::id)
            .filter(|id| !retained.contains(id))
            .collect();

        for id in &removed {
            snapshot.zones.remove(id);
        }

        for zone in &zones {
            snapshot.zones.insert(zone.id(), zone.clone());
        }

        tracing::trace!(
            removed = removed.len(),
            current = snapshot.zones.len(),
            "zone table reconciled"
        );
        snapshot.last = zones;
        true
    }
}
