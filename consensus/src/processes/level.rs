//! Level assignment: `level(dealing) := 0`; otherwise a unit's
//! level is its parents' max level, bumped by one iff a supermajority of
//! processes already have a level-`m` prime unit below it.

use super::relations::below_into_floor;
use crate::model::stores::{ProcessIndex, UnitRecord, UnitStoreReader};
use poset_consensus_core::{Config, Floor, Level, ProcessId};

pub fn compute_level(
    store: &dyn UnitStoreReader,
    index: &ProcessIndex,
    config: &Config,
    parents: &[std::sync::Arc<UnitRecord>],
    floor: &Floor,
) -> Level {
    let Some(m) = parents.iter().map(|p| p.level).max() else {
        return 0;
    };

    let n = config.n as usize;
    let mut count = 0usize;
    for q in 0..n {
        let reached = index
            .primes_at(m, q as ProcessId)
            .iter()
            .any(|&v| below_into_floor(store, index, v, floor));
        if reached {
            count += 1;
        }
        if config.is_supermajority(count) {
            return m + 1;
        }
        let remaining = n - q - 1;
        if !config.is_supermajority(count + remaining) {
            // Even if every remaining process reached level m below U, we
            // could not make a supermajority: no point scanning further.
            break;
        }
    }
    m
}
