//! Linearization: `timing_round(k)` floods the units decided by
//! the k-th timing unit but not the (k-1)-th, and `break_ties` flattens that
//! set into the deterministic per-round linear order every honest replica
//! agrees on.

use super::relations::below;
use crate::model::stores::{ProcessIndex, UnitStoreReader};
use poset_hashes::{Hash, Hasher, HasherBase, TieBreakHash};
use std::collections::{HashMap, HashSet};

/// `timing_round(k)`: units at-or-below `timing_units[k]` but not at-or-below
/// `timing_units[k-1]`, found by flooding parents from `timing_units[k]` and
/// pruning any path already below `timing_units[k-1]`.
pub fn timing_round(store: &dyn UnitStoreReader, index: &ProcessIndex, timing_units: &[Hash], k: usize) -> Vec<Hash> {
    let t_k = timing_units[k];
    let prev = (k > 0).then(|| timing_units[k - 1]);

    let mut visited = HashSet::new();
    let mut result = Vec::new();
    let mut stack = vec![t_k];
    while let Some(u) = stack.pop() {
        if !visited.insert(u) {
            continue;
        }
        if let Some(p) = prev {
            if below(store, index, u, p) {
                continue;
            }
        }
        result.push(u);
        let rec = store.get(u).expect("unit reachable from a timing unit must be installed");
        stack.extend(rec.unit.parent_hashes.iter().copied());
    }
    result
}

/// `break_ties(units)`: deterministic topological flush of `units`, breaking
/// ties within each wave of "ready" units (all in-set parents already
/// emitted) by a hash-derived nonce shared across the whole batch.
pub fn break_ties(store: &dyn UnitStoreReader, units: &[Hash]) -> Vec<Hash> {
    if units.is_empty() {
        return Vec::new();
    }

    let in_set: HashSet<Hash> = units.iter().copied().collect();
    let r = batch_nonce(units);

    let mut remaining_parents: HashMap<Hash, usize> = HashMap::with_capacity(units.len());
    let mut children: HashMap<Hash, Vec<Hash>> = HashMap::new();
    for &u in units {
        let rec = store.get(u).expect("unit in a timing_round output must be installed");
        let in_set_parents: Vec<Hash> = rec.unit.parent_hashes.iter().copied().filter(|p| in_set.contains(p)).collect();
        remaining_parents.insert(u, in_set_parents.len());
        for p in in_set_parents {
            children.entry(p).or_default().push(u);
        }
    }

    let mut ready: Vec<Hash> = units.iter().copied().filter(|u| remaining_parents[u] == 0).collect();
    let mut output = Vec::with_capacity(units.len());

    while !ready.is_empty() {
        ready.sort_by_key(|&u| tiebreaker(u, r));
        let wave = std::mem::take(&mut ready);
        for u in wave {
            output.push(u);
            if let Some(kids) = children.get(&u) {
                for &child in kids {
                    let counter = remaining_parents.get_mut(&child).expect("child recorded in its parent's fan-out");
                    *counter -= 1;
                    if *counter == 0 {
                        ready.push(child);
                    }
                }
            }
        }
    }

    output
}

/// `R = hash(concat of sorted unit hashes)`.
fn batch_nonce(units: &[Hash]) -> Hash {
    let mut sorted = units.to_vec();
    sorted.sort();
    let mut hasher = TieBreakHash::new();
    for h in &sorted {
        hasher.update(h.as_bytes());
    }
    hasher.finalize()
}

/// `tiebreaker(U) := hash(U.hash || R)`.
fn tiebreaker(u: Hash, r: Hash) -> Hash {
    let mut hasher = TieBreakHash::new();
    hasher.update(u.as_bytes());
    hasher.update(r.as_bytes());
    hasher.finalize()
}
