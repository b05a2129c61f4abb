use super::errors::{StoreError, StoreResult};
use poset_consensus_core::{Floor, Height, Level, ProcessId, Unit};
use poset_hashes::Hash;
use std::collections::HashMap;
use std::sync::Arc;

/// Derived data attached to an installed unit: its level, its per-process
/// floor, and whether it is prime. Immutable once computed; the unit
/// itself never mutates after `prepare`.
#[derive(Clone, Debug)]
pub struct UnitRecord {
    pub unit: Arc<Unit>,
    pub level: Level,
    /// `floor[p]`: the maximal units created by `p` in the lower cone of this unit.
    pub floor: Floor,
    pub prime: bool,
}

impl UnitRecord {
    pub fn height(&self) -> Height {
        self.unit.height
    }

    pub fn creator_id(&self) -> ProcessId {
        self.unit.creator_id
    }

    pub fn hash(&self) -> Hash {
        self.unit.hash()
    }

    /// True iff this unit's floor proves process `p` has forked.
    pub fn has_forking_evidence(&self, p: ProcessId) -> bool {
        self.floor[p as usize].len() > 1
    }
}

/// Read-only view of the unit arena.
pub trait UnitStoreReader {
    fn get(&self, hash: Hash) -> StoreResult<Arc<UnitRecord>>;
    fn has(&self, hash: Hash) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Units in the order they were installed (for deterministic `dump`).
    fn insertion_order(&self) -> &[Hash];
}

/// Write API for the unit arena.
pub trait UnitStore: UnitStoreReader {
    fn insert(&mut self, record: UnitRecord);
}

/// In-memory unit arena. Persistence is an external collaborator; this
/// store exists only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryUnitStore {
    units: HashMap<Hash, Arc<UnitRecord>>,
    insertion_order: Vec<Hash>,
}

impl MemoryUnitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitStoreReader for MemoryUnitStore {
    fn get(&self, hash: Hash) -> StoreResult<Arc<UnitRecord>> {
        self.units.get(&hash).cloned().ok_or(StoreError::KeyNotFound(hash))
    }

    fn has(&self, hash: Hash) -> bool {
        self.units.contains_key(&hash)
    }

    fn len(&self) -> usize {
        self.units.len()
    }

    fn insertion_order(&self) -> &[Hash] {
        &self.insertion_order
    }
}

impl UnitStore for MemoryUnitStore {
    fn insert(&mut self, record: UnitRecord) {
        let hash = record.hash();
        if self.units.contains_key(&hash) {
            return;
        }
        self.insertion_order.push(hash);
        self.units.insert(hash, Arc::new(record));
    }
}
