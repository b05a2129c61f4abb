//! `below`, `above`, and `below_within_process` over the DAG, implemented
//! purely in terms of floors and heights so they never need to
//! walk the whole poset.

use crate::model::stores::{ProcessIndex, UnitStoreReader};
use poset_consensus_core::{Floor, Height};
use poset_hashes::Hash;

/// `U <=_p V` for two units created by the same process `p`.
///
/// When `p` has never been observed forking below `U`'s height, the unique
/// self-predecessor chain guarantees the relation holds whenever heights
/// allow it; otherwise we walk down from `V` exactly `V.height - U.height`
/// self-predecessor steps and compare identities.
pub fn below_within_process(store: &dyn UnitStoreReader, index: &ProcessIndex, u: Hash, v: Hash) -> bool {
    let Ok(u_rec) = store.get(u) else { return false };
    let Ok(v_rec) = store.get(v) else { return false };
    debug_assert_eq!(u_rec.creator_id(), v_rec.creator_id());

    if u_rec.height() > v_rec.height() {
        return false;
    }

    let fork_height = index.forking_height(u_rec.creator_id()).unwrap_or(Height::MAX);
    if u_rec.height() < fork_height {
        return true;
    }

    let mut steps = v_rec.height() - u_rec.height();
    let mut current = v;
    while steps > 0 {
        let Ok(rec) = store.get(current) else { return false };
        let Some(pred) = rec.unit.self_predecessor_hash() else { return false };
        current = pred;
        steps -= 1;
    }
    current == u
}

/// `U <= V`: `U` is in the lower cone of `V`, i.e. there is some maximal
/// unit `W` by `U`'s creator in `V`'s floor with `U <=_p W`.
pub fn below(store: &dyn UnitStoreReader, index: &ProcessIndex, u: Hash, v: Hash) -> bool {
    let Ok(u_rec) = store.get(u) else { return false };
    let Ok(v_rec) = store.get(v) else { return false };
    let p = u_rec.creator_id() as usize;
    v_rec.floor[p].iter().any(|&w| below_within_process(store, index, u, w))
}

/// `U >= V`, the converse of [`below`].
pub fn above(store: &dyn UnitStoreReader, index: &ProcessIndex, u: Hash, v: Hash) -> bool {
    below(store, index, v, u)
}

/// Like [`below`], but against a floor that has been computed for a unit
/// not yet installed in the store (used while assigning level during
/// `prepare`, before the unit itself exists as a `UnitRecord`).
pub fn below_into_floor(store: &dyn UnitStoreReader, index: &ProcessIndex, u: Hash, target_floor: &Floor) -> bool {
    let Ok(u_rec) = store.get(u) else { return false };
    let p = u_rec.creator_id() as usize;
    target_floor[p].iter().any(|&w| below_within_process(store, index, u, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stores::{MemoryUnitStore, UnitRecord, UnitStore};
    use poset_consensus_core::CoinPayload;
    use poset_consensus_core::Unit;
    use smallvec::SmallVec;
    use std::sync::Arc;

    fn install(store: &mut MemoryUnitStore, index: &mut ProcessIndex, creator: u16, parent: Option<Hash>, n: usize) -> Hash {
        let (height, parents) = match parent {
            Some(p) => (store.get(p).unwrap().height() + 1, vec![p]),
            None => (0, vec![]),
        };
        let unit = Unit::new(creator, parents, height, vec![], vec![], CoinPayload::Empty);
        let hash = unit.hash();
        let mut floor = vec![SmallVec::new(); n];
        floor[creator as usize].push(hash);
        store.insert(UnitRecord { unit: Arc::new(unit), level: 0, floor, prime: parent.is_none() });
        index.record(creator, hash, height, parent, 0, parent.is_none());
        hash
    }

    #[test]
    fn chain_without_forks_is_linearly_ordered() {
        let mut store = MemoryUnitStore::new();
        let mut index = ProcessIndex::new(4);
        let d = install(&mut store, &mut index, 0, None, 4);
        let c1 = install(&mut store, &mut index, 0, Some(d), 4);
        let c2 = install(&mut store, &mut index, 0, Some(c1), 4);
        assert!(below_within_process(&store, &index, d, c2));
        assert!(below_within_process(&store, &index, c1, c2));
        assert!(!below_within_process(&store, &index, c2, c1));
    }
}
