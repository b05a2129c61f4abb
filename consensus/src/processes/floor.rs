//! Per-unit, per-process floor computation: for a process `p`
//! other than the unit's own creator, `floor[p]` is the maximal-antichain
//! merge of `parents[*].floor[p]`.

use super::relations::below_within_process;
use crate::model::stores::{ProcessIndex, UnitRecord, UnitStoreReader};
use poset_consensus_core::{Floor, FloorColumn};
use poset_hashes::Hash;
use smallvec::SmallVec;

/// Computes the floor of a new unit from its (already installed) parents.
/// `floor[creator_id]` is always the singleton `{hash}`; every other
/// column is the maximal-antichain merge of the parents' columns.
pub fn compute_floor(
    store: &dyn UnitStoreReader,
    index: &ProcessIndex,
    n: usize,
    creator_id: usize,
    hash: Hash,
    parents: &[std::sync::Arc<UnitRecord>],
) -> Floor {
    let mut floor: Floor = vec![SmallVec::new(); n];
    floor[creator_id].push(hash);

    for p in 0..n {
        if p == creator_id {
            continue;
        }
        floor[p] = merge_column(store, index, parents, p);
    }

    floor
}

/// Merges `parents[*].floor[column]` into a single maximal antichain,
/// without forcing any particular result size. Used directly by
/// [`compute_floor`] for columns other than the unit's own creator, and by
/// the compliance validator's self-forking check, which must inspect the
/// *unreduced* merge of the creator's own column.
pub fn merge_column(
    store: &dyn UnitStoreReader, index: &ProcessIndex, parents: &[std::sync::Arc<UnitRecord>], column: usize,
) -> FloorColumn {
    let mut merged = SmallVec::new();
    for parent in parents {
        for &candidate in parent.floor[column].iter() {
            merge_candidate(store, index, &mut merged, candidate);
        }
    }
    merged
}

/// Inserts `candidate` into `column`, keeping only maximal elements under
/// `below_within_process`: dominated candidates are dropped, candidates the
/// new one dominates are removed, and genuinely incomparable candidates
/// (fork evidence) are kept side by side.
fn merge_candidate(store: &dyn UnitStoreReader, index: &ProcessIndex, column: &mut FloorColumn, candidate: Hash) {
    if column.contains(&candidate) {
        return;
    }
    if column.iter().any(|&existing| below_within_process(store, index, candidate, existing)) {
        return;
    }
    column.retain(|&existing| !below_within_process(store, index, existing, candidate));
    column.push(candidate);
}

/// `has_forking_evidence(U, p) := |U.floor[p]| > 1`.
pub fn has_forking_evidence(record: &UnitRecord, p: usize) -> bool {
    record.floor[p].len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stores::{MemoryUnitStore, UnitStore};
    use poset_consensus_core::{CoinPayload, Unit};
    use std::sync::Arc;

    fn dealing(store: &mut MemoryUnitStore, index: &mut ProcessIndex, creator: u16, n: usize) -> Hash {
        let unit = Unit::new(creator, vec![], 0, vec![], vec![], CoinPayload::Empty);
        let hash = unit.hash();
        let mut floor = vec![SmallVec::new(); n];
        floor[creator as usize].push(hash);
        store.insert(UnitRecord { unit: Arc::new(unit), level: 0, floor, prime: true });
        index.record(creator, hash, 0, None, 0, true);
        hash
    }

    #[test]
    fn merging_two_distinct_dealing_units_surfaces_fork_evidence() {
        let mut store = MemoryUnitStore::new();
        let mut index = ProcessIndex::new(4);
        let n = 4;

        let d0 = dealing(&mut store, &mut index, 0, n);
        let d0b = Unit::new(0, vec![], 0, vec![1], vec![], CoinPayload::Empty).hash();
        // Install a distinct second dealing unit from process 0 directly.
        let unit = Unit::new(0, vec![], 0, vec![1], vec![], CoinPayload::Empty);
        assert_eq!(unit.hash(), d0b);
        let mut floor0b = vec![SmallVec::new(); n];
        floor0b[0].push(d0b);
        store.insert(UnitRecord { unit: Arc::new(unit), level: 0, floor: floor0b, prime: true });
        index.record(0, d0b, 0, None, 0, true);

        let d1 = dealing(&mut store, &mut index, 1, n);

        // A unit by process 1 that has both d0 and d0b as "floor" ancestors at column 0.
        let parent1 = store.get(d1).unwrap();
        let parent0 = store.get(d0).unwrap();
        let parent0b = store.get(d0b).unwrap();
        let parents = vec![parent1, parent0, parent0b];
        let u_hash = Hash::from_bytes([9; 32]);
        let floor = compute_floor(&store, &index, n, 1, u_hash, &parents);
        assert_eq!(floor[0].len(), 2, "U should carry fork evidence for process 0");
    }
}
