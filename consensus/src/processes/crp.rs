//! Common Random Permutation: for each level `L` a deterministic
//! permutation of `{0..n-1}`. We derive it from a domain-separated hash of
//! the level alone: the permutation for `L` only becomes *useful* once the
//! timing algorithm has reached level `L-1` (earlier levels can't yet
//! evaluate `decide_unit_is_popular` for any candidate at `L`), which gives
//! the unpredictability this needs in practice — see DESIGN.md for the
//! full discussion of this choice.

use poset_consensus_core::{Level, ProcessId};
use poset_hashes::{CrpSeedHash, Hasher};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct Crp {
    n: usize,
}

impl Crp {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// The permutation of `{0..n-1}` for level `L`.
    pub fn permutation(&self, level: Level) -> Vec<ProcessId> {
        let seed = CrpSeedHash::hash(level.to_le_bytes());
        let mut rng = ChaCha8Rng::from_seed(*seed.as_bytes());
        let mut perm: Vec<ProcessId> = (0..self.n as ProcessId).collect();
        perm.shuffle(&mut rng);
        perm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_is_a_bijection_on_n() {
        let crp = Crp::new(7);
        let mut perm = crp.permutation(3);
        perm.sort();
        assert_eq!(perm, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn permutation_is_deterministic_per_level() {
        let crp = Crp::new(7);
        assert_eq!(crp.permutation(5), crp.permutation(5));
    }

    #[test]
    fn different_levels_usually_differ() {
        let crp = Crp::new(7);
        assert_ne!(crp.permutation(1), crp.permutation(2));
    }
}
