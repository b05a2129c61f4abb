//! The poset aggregator: owns every store and process module and exposes
//! the mutating/querying entry points external collaborators use:
//! [`Poset::prepare`], [`Poset::check_compliance`], [`Poset::add`],
//! [`Poset::attempt_timing_decision`], and [`Poset::timing_round`], plus
//! [`Poset::dump`] for debugging.
//!
//! Mutation is serialized by construction: every mutating method takes
//! `&mut self`, so the borrow checker enforces a single-writer rule.
//! Callers wanting concurrent reads alongside writes use [`SharedPoset`],
//! a thin `parking_lot::RwLock` newtype that serializes mutation while
//! letting read-only queries run concurrently with each other.

use crate::model::stores::{MemoStore, MemoryUnitStore, ProcessIndex, UnitRecord, UnitStore, UnitStoreReader};
use crate::processes::coin::ThresholdCoin;
use crate::processes::crp::Crp;
use crate::processes::popularity::PopularityEngine;
use crate::processes::timing::TimingOutcome;
use crate::processes::{compliance, floor, level, linearizer, relations, timing};
use itertools::Itertools;
use parking_lot::RwLock;
use poset_consensus_core::errors::{ComplianceError, MalformedUnitError};
use poset_consensus_core::{Config, Floor, Level, Unit};
use poset_hashes::{short_name, Hash};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A unit whose floor and level have been computed from its (already
/// installed) parents, ready for [`Poset::check_compliance`] and
/// [`Poset::add`].
pub struct PreparedUnit {
    pub unit: Unit,
    pub parents: Vec<Arc<UnitRecord>>,
    pub floor: Floor,
    pub level: Level,
    pub prime: bool,
}

impl PreparedUnit {
    pub fn hash(&self) -> Hash {
        self.unit.hash()
    }
}

/// Outcome of [`Poset::add`]. Forks are installed, not rejected: the
/// creator is muted by downstream rules rather than the unit being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Installed { hash: Hash, fork_observed: bool },
    AlreadyInstalled { hash: Hash },
}

pub struct Poset {
    config: Config,
    store: MemoryUnitStore,
    index: ProcessIndex,
    memo: MemoStore,
    fdu_cache: HashMap<Hash, Option<Hash>>,
    crp: Crp,
    coins: HashMap<Hash, ThresholdCoin>,
    timing_units: Vec<Hash>,
    level_timing_established: Option<Level>,
}

impl Poset {
    pub fn new(config: Config) -> Self {
        let n = config.n as usize;
        Self {
            crp: Crp::new(n),
            store: MemoryUnitStore::new(),
            index: ProcessIndex::new(n),
            memo: MemoStore::new(),
            fdu_cache: HashMap::new(),
            coins: HashMap::new(),
            timing_units: Vec::new(),
            level_timing_established: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn n_units(&self) -> usize {
        self.store.len()
    }

    pub fn has(&self, hash: Hash) -> bool {
        self.store.has(hash)
    }

    pub fn level_reached(&self) -> Level {
        self.index.level_reached()
    }

    pub fn level_timing_established(&self) -> Option<Level> {
        self.level_timing_established
    }

    pub fn timing_units(&self) -> &[Hash] {
        &self.timing_units
    }

    /// `below(U, V)`, exposed as a read-only query.
    pub fn below(&self, u: Hash, v: Hash) -> bool {
        relations::below(&self.store, &self.index, u, v)
    }

    /// Assigns floor and level to a unit whose parents are already installed.
    pub fn prepare(&self, unit: Unit) -> Result<PreparedUnit, MalformedUnitError> {
        let parents = compliance::check_parent_correctness(&self.store, unit.creator_id, &unit.parent_hashes, unit.height)?;
        let hash = unit.hash();
        let floor = floor::compute_floor(&self.store, &self.index, self.config.n as usize, unit.creator_id as usize, hash, &parents);
        let lvl = level::compute_level(&self.store, &self.index, &self.config, &parents, &floor);
        let prime = match parents.first() {
            Some(self_pred) => lvl > self_pred.level,
            None => true,
        };
        Ok(PreparedUnit { unit, parents, floor, level: lvl, prime })
    }

    /// Runs the compliance validator against an already-prepared unit. The
    /// creator is effectively Byzantine on failure; the unit must not be
    /// installed.
    pub fn check_compliance(&self, prepared: &PreparedUnit) -> Result<(), ComplianceError> {
        compliance::check_compliance(
            &self.store,
            &self.index,
            &self.config,
            prepared.unit.creator_id,
            &prepared.parents,
            &prepared.unit.coin_payload,
            prepared.prime,
            prepared.level,
        )
        .map_err(|rule| {
            log::warn!("unit {} fails compliance: {}", short_name(&prepared.hash()), rule);
            compliance::to_compliance_error(prepared.hash(), rule)
        })
    }

    /// Installs a unit that has already passed [`Poset::check_compliance`]
    /// (or is a dealing unit whose only check is coin-shape). Re-delivering
    /// an already-installed unit is a no-op.
    pub fn add(&mut self, prepared: PreparedUnit) -> AddOutcome {
        let hash = prepared.hash();
        if self.store.has(hash) {
            log::trace!("unit {} already installed", short_name(&hash));
            return AddOutcome::AlreadyInstalled { hash };
        }

        let creator = prepared.unit.creator_id;
        let height = prepared.unit.height;
        let self_pred = prepared.unit.self_predecessor_hash();
        let was_forking = self.index.forking_height(creator).is_some();

        if self.config.use_tcoin {
            if let Some(dealt) = prepared.unit.coin_payload.as_dealt() {
                if let Some(coin) = ThresholdCoin::from_dealt(hash, dealt, self.config.n as usize, self.config.coin_threshold() as usize) {
                    self.coins.insert(hash, coin);
                }
            }
        }

        self.store.insert(UnitRecord { unit: Arc::new(prepared.unit), level: prepared.level, floor: prepared.floor, prime: prepared.prime });
        self.index.record(creator, hash, height, self_pred, prepared.level, prepared.prime);

        let fork_observed = !was_forking && self.index.forking_height(creator).is_some();
        if fork_observed {
            log::warn!("process {} observed forking at unit {}", creator, short_name(&hash));
        } else {
            log::debug!("installed unit {} (creator {}, level {})", short_name(&hash), creator, prepared.level);
        }

        AddOutcome::Installed { hash, fork_observed }
    }

    /// Advances the timing-unit frontier, returning one
    /// `(level, ordered_units)` batch per newly committed level. Stops at
    /// the first `Pending` level.
    pub fn attempt_timing_decision(&mut self) -> Vec<(Level, Vec<Hash>)> {
        let mut batches = Vec::new();
        loop {
            let next_level = self.level_timing_established.map_or(0, |l| l + 1);
            let outcome = {
                let mut engine =
                    PopularityEngine::new(&self.store, &self.index, &self.config, &self.crp, &self.coins, &mut self.memo, &mut self.fdu_cache);
                timing::decide_timing_unit_at_level(&mut engine, &self.index, &self.crp, &self.config, next_level)
            };

            match outcome {
                TimingOutcome::Decided(hash) => {
                    let k = self.timing_units.len();
                    self.timing_units.push(hash);
                    self.level_timing_established = Some(next_level);

                    let round = linearizer::timing_round(&self.store, &self.index, &self.timing_units, k);
                    let ordered = linearizer::break_ties(&self.store, &round);

                    let primes_at_level: Vec<Hash> = self.index.all_primes_at(next_level).map(|(_, &h)| h).collect();
                    self.memo.evict(primes_at_level);

                    log::debug!("committed timing unit {} at level {} ({} units in batch)", short_name(&hash), next_level, ordered.len());
                    batches.push((next_level, ordered));
                }
                TimingOutcome::Pending => break,
            }
        }
        batches
    }

    /// `timing_round(k)`, exposed directly for replay/debugging. May only
    /// be called once `timing_units` has index `k`.
    pub fn timing_round(&self, k: usize) -> Vec<Hash> {
        assert!(k < self.timing_units.len(), "timing_round({k}) called before level {k} was committed");
        linearizer::timing_round(&self.store, &self.index, &self.timing_units, k)
    }

    /// `break_ties(units)`, exposed directly for replay/debugging.
    pub fn break_ties(&self, units: &[Hash]) -> Vec<Hash> {
        linearizer::break_ties(&self.store, units)
    }

    /// Renders the poset in the `dump-nofork-level-timing` text format,
    /// with a trailing `forking_processes` line supplementing the
    /// original implementation's debug dumps.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        out.push_str("format dump-nofork-level-timing\n");
        out.push_str(&format!("process_id {}\n", self.config.process_id.unwrap_or(0)));
        out.push_str(&format!("n_processes {}\n", self.config.n));
        out.push_str(&format!("n_units {}\n", self.store.len()));

        let timing_set: HashSet<Hash> = self.timing_units.iter().copied().collect();
        for &hash in self.store.insertion_order() {
            let rec = self.store.get(hash).expect("insertion_order entries are always installed");
            out.push_str(&format!("{} {}\n", short_name(&hash), rec.creator_id()));
            out.push_str(&format!("parents {}\n", rec.unit.parent_hashes.iter().map(short_name).join(" ")));
            out.push_str(&format!("level {}\n", rec.level));
            let is_timing = rec.prime && timing_set.contains(&hash);
            out.push_str(&format!("timing {}\n", is_timing as u8));
        }

        let forking = (0..self.config.n).filter(|&p| self.index.forking_height(p).is_some()).join(",");
        out.push_str(&format!("forking_processes {}\n", forking));
        out
    }
}

/// A `Poset` behind a reader/writer lock: mutation
/// (`prepare`/`check_compliance`/`add`/`attempt_timing_decision`) is
/// serialized against every other access, while read-only queries
/// (`below`/`timing_round`/`dump`) may run concurrently with each other.
/// Newtype over the lock so the underlying primitive can change without
/// disturbing callers.
#[derive(Clone)]
pub struct SharedPoset(Arc<RwLock<Poset>>);

impl SharedPoset {
    pub fn new(poset: Poset) -> Self {
        Self(Arc::new(RwLock::new(poset)))
    }

    /// Exclusive access for `prepare`/`check_compliance`/`add`/`attempt_timing_decision`.
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Poset> {
        self.0.write()
    }

    /// Shared access for `below`/`timing_round`/`dump`, concurrent with other readers.
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Poset> {
        self.0.read()
    }
}
