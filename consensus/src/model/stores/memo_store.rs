use poset_hashes::Hash;
use std::collections::HashMap;

/// Cached sub-results for one (candidate, prover) pair: a fast-algorithm
/// vote, the two pi/delta randomized-voting values, and whether the
/// prover proves the candidate's popularity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Memo {
    pub proves_popularity: Option<bool>,
    pub vote: Option<i8>,
    pub pi: Option<i8>,
    pub delta: Option<i8>,
}

/// Two-level memoization table: the outer key is the candidate `Uc` whose
/// popularity is being decided, the inner key is the prover `V` at some
/// higher level. An entire candidate row is dropped wholesale once that
/// candidate's level is finalized — enforced here simply by owning
/// everything by value, so no reference into a dropped row can outlive it.
#[derive(Default)]
pub struct MemoStore {
    rows: HashMap<Hash, HashMap<Hash, Memo>>,
    /// Final `decide_unit_is_popular` outcomes, keyed by candidate. Not
    /// prover-specific, so kept separate from `rows` rather than forced
    /// into the (candidate, prover) shape.
    decisions: HashMap<Hash, i8>,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, candidate: Hash, prover: Hash) -> Memo {
        self.rows.get(&candidate).and_then(|row| row.get(&prover)).copied().unwrap_or_default()
    }

    pub fn set(&mut self, candidate: Hash, prover: Hash, memo: Memo) {
        self.rows.entry(candidate).or_default().insert(prover, memo);
    }

    pub fn update(&mut self, candidate: Hash, prover: Hash, f: impl FnOnce(&mut Memo)) {
        let entry = self.rows.entry(candidate).or_default().entry(prover).or_default();
        f(entry);
    }

    pub fn get_decision(&self, candidate: Hash) -> Option<i8> {
        self.decisions.get(&candidate).copied()
    }

    pub fn set_decision(&mut self, candidate: Hash, decision: i8) {
        self.decisions.insert(candidate, decision);
    }

    /// Drops every memoized row for the given candidates, called once their
    /// level's timing unit has been committed.
    pub fn evict(&mut self, candidates: impl IntoIterator<Item = Hash>) {
        for candidate in candidates {
            self.rows.remove(&candidate);
            self.decisions.remove(&candidate);
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
