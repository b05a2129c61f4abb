//! Timing-unit selection: for a
//! level `L`, walk the committee in common-random-permutation order and, for
//! each process, its prime units at `L` sorted by hash, asking
//! `decide_unit_is_popular` of each candidate in turn.

use super::crp::Crp;
use super::popularity::PopularityEngine;
use crate::model::stores::ProcessIndex;
use poset_consensus_core::{Config, Level};
use poset_hashes::Hash;

/// Outcome of trying to decide level `L`'s timing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingOutcome {
    Decided(Hash),
    /// Not yet decidable; wait for more units.
    Pending,
}

/// Tries to decide the timing unit at `level`. Never mutates anything but
/// the engine's memoization tables.
pub fn decide_timing_unit_at_level(engine: &mut PopularityEngine, index: &ProcessIndex, crp: &Crp, config: &Config, level: Level) -> TimingOutcome {
    if index.level_reached() < level + config.voting_level {
        return TimingOutcome::Pending;
    }

    for process in crp.permutation(level) {
        for &candidate in index.primes_at(level, process) {
            match engine.decide_unit_is_popular(candidate) {
                1 => return TimingOutcome::Decided(candidate),
                -1 => return TimingOutcome::Pending,
                _ => continue,
            }
        }
    }
    TimingOutcome::Pending
}
