use poset_consensus_core::{Height, Level, ProcessId};
use poset_hashes::Hash;
use std::collections::HashMap;

/// Per-process bookkeeping the aggregator maintains alongside the unit
/// arena: dealing units seen per creator, current tips, prime units
/// bucketed by (level, creator) and sorted by hash for deterministic fork
/// tie-break, forking heights, and the highest level any installed unit
/// has reached.
pub struct ProcessIndex {
    n: usize,
    dealing_units: Vec<Vec<Hash>>,
    max_units_per_process: Vec<Vec<Hash>>,
    prime_units_by_level: HashMap<Level, Vec<Vec<Hash>>>,
    forking_height: Vec<Option<Height>>,
    level_reached: Level,
}

impl ProcessIndex {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            dealing_units: vec![Vec::new(); n],
            max_units_per_process: vec![Vec::new(); n],
            prime_units_by_level: HashMap::new(),
            forking_height: vec![None; n],
            level_reached: 0,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn level_reached(&self) -> Level {
        self.level_reached
    }

    pub fn dealing_units(&self, p: ProcessId) -> &[Hash] {
        &self.dealing_units[p as usize]
    }

    /// Current tips by `p`: maximal known units created by that process.
    /// More than one entry means `p` is forking at its current frontier.
    pub fn tips(&self, p: ProcessId) -> &[Hash] {
        &self.max_units_per_process[p as usize]
    }

    pub fn forking_height(&self, p: ProcessId) -> Option<Height> {
        self.forking_height[p as usize]
    }

    /// Prime units at `level` created by `p`, sorted by hash.
    pub fn primes_at(&self, level: Level, p: ProcessId) -> &[Hash] {
        self.prime_units_by_level
            .get(&level)
            .map(|by_process| by_process[p as usize].as_slice())
            .unwrap_or(&[])
    }

    /// All prime units at `level`, across every process, in process order.
    pub fn all_primes_at(&self, level: Level) -> impl Iterator<Item = (ProcessId, &Hash)> {
        let n = self.n;
        self.prime_units_by_level.get(&level).into_iter().flat_map(move |by_process| {
            (0..n).flat_map(move |p| by_process[p].iter().map(move |h| (p as ProcessId, h)))
        })
    }

    /// Records a newly installed unit's place in these indices. Height and
    /// self-predecessor bookkeeping has already happened in `prepare`; this
    /// only updates the per-process tips, dealing list, fork detection, and
    /// (if prime) the per-level prime index.
    pub fn record(&mut self, creator: ProcessId, hash: Hash, height: Height, self_pred: Option<Hash>, level: Level, prime: bool) {
        let p = creator as usize;
        self.level_reached = self.level_reached.max(level);

        if self_pred.is_none() {
            self.dealing_units[p].push(hash);
            if self.dealing_units[p].len() > 1 && self.forking_height[p].is_none() {
                self.forking_height[p] = Some(0);
            }
        }

        let tips = &mut self.max_units_per_process[p];
        if let Some(pred) = self_pred {
            if let Some(pos) = tips.iter().position(|h| *h == pred) {
                tips.remove(pos);
            }
        }
        if !tips.contains(&hash) {
            tips.push(hash);
        }
        if tips.len() > 1 && self.forking_height[p].is_none() {
            self.forking_height[p] = Some(height);
        } else if let Some(existing) = self.forking_height[p] {
            self.forking_height[p] = Some(existing.min(height));
        }

        if prime {
            let by_process = self.prime_units_by_level.entry(level).or_insert_with(|| vec![Vec::new(); self.n]);
            let bucket = &mut by_process[p];
            let pos = bucket.binary_search(&hash).unwrap_or_else(|e| e);
            bucket.insert(pos, hash);
        }
    }
}
