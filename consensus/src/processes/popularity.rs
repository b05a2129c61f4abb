//! Popularity, voting, and the fast/pi-delta decision algorithms.
//!
//! All entry points are methods on [`PopularityEngine`], a short-lived
//! borrow over the poset's stores built fresh for each call into the
//! aggregator; its only owned state is the memoization tables it mutates.

use super::coin::{simple_coin, ThresholdCoin};
use super::crp::Crp;
use super::relations::below;
use crate::model::stores::{MemoStore, ProcessIndex, UnitStoreReader};
use poset_consensus_core::{Config, Level, ProcessId};
use poset_hashes::Hash;
use std::collections::{HashMap, HashSet};

pub struct PopularityEngine<'a> {
    store: &'a dyn UnitStoreReader,
    index: &'a ProcessIndex,
    config: &'a Config,
    crp: &'a Crp,
    coins: &'a HashMap<Hash, ThresholdCoin>,
    memo: &'a mut MemoStore,
    fdu_cache: &'a mut HashMap<Hash, Option<Hash>>,
}

impl<'a> PopularityEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn UnitStoreReader,
        index: &'a ProcessIndex,
        config: &'a Config,
        crp: &'a Crp,
        coins: &'a HashMap<Hash, ThresholdCoin>,
        memo: &'a mut MemoStore,
        fdu_cache: &'a mut HashMap<Hash, Option<Hash>>,
    ) -> Self {
        Self { store, index, config, crp, coins, memo, fdu_cache }
    }

    fn level_of(&self, h: Hash) -> Level {
        self.store.get(h).expect("unit referenced in a popularity computation must be installed").level
    }

    fn primes_at(&self, level: Level) -> Vec<Hash> {
        self.index.all_primes_at(level).map(|(_, &h)| h).collect()
    }

    /// `decide_unit_is_popular(Uc) -> {-1, 0, 1}`. Cached: once the decision
    /// settles to 0 or 1 it never changes (monotonicity law), so only
    /// pending (-1) outcomes are recomputed.
    pub fn decide_unit_is_popular(&mut self, uc: Hash) -> i8 {
        if let Some(cached) = self.memo.get_decision(uc) {
            if cached != -1 {
                return cached;
            }
        }
        let result = self.decide_unit_is_popular_uncached(uc);
        if result != -1 {
            self.memo.set_decision(uc, result);
        }
        result
    }

    fn decide_unit_is_popular_uncached(&mut self, uc: Hash) -> i8 {
        let uc_level = self.level_of(uc);
        let t = self.config.voting_level;
        let t_pd = self.config.pi_delta_level;
        let level_reached = self.index.level_reached();

        // 1. Fast-positive window: levels [level(Uc)+2, level(Uc)+t-1].
        let window_end = uc_level + t - 1;
        let mut l = uc_level + 2;
        while l <= window_end && l <= level_reached {
            for u in self.primes_at(l) {
                if self.proves_popularity(uc, u) {
                    return 1;
                }
            }
            l += 1;
        }

        // 2. Fast algorithm: levels [level(Uc)+t+1, min(level(Uc)+t_pd, level_reached)].
        let fast_end = (uc_level + t_pd).min(level_reached);
        let mut l = uc_level + t + 1;
        while l <= fast_end {
            for u in self.primes_at(l) {
                let v = self.vote(u, uc);
                let d = self.default_vote(u, uc);
                if v == d {
                    return v;
                }
            }
            l += 1;
        }

        // 3. Pi/delta algorithm, stepping by 2 from level(Uc)+t_pd+1.
        let mut l = uc_level + t_pd + 1;
        while l <= level_reached {
            for u in self.primes_at(l) {
                let d = self.compute_delta(uc, u);
                if d == 0 || d == 1 {
                    return d;
                }
            }
            l += 2;
        }

        -1
    }

    /// `proves_popularity(V, Uc)`: true iff `V` certifies `Uc` is visible
    /// to a supermajority as of `V`'s level.
    pub fn proves_popularity(&mut self, uc: Hash, v: Hash) -> bool {
        if let Some(cached) = self.memo.get(uc, v).proves_popularity {
            return cached;
        }
        let result = self.proves_popularity_uncached(uc, v);
        self.memo.update(uc, v, |m| m.proves_popularity = Some(result));
        result
    }

    fn proves_popularity_uncached(&self, uc: Hash, v: Hash) -> bool {
        let v_level = self.level_of(v);
        let uc_level = self.level_of(uc);
        if v_level <= uc_level || !below(self.store, self.index, uc, v) {
            return false;
        }

        let mut seen_processes = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![v];
        while let Some(w) = stack.pop() {
            if !visited.insert(w) {
                continue;
            }
            if !below(self.store, self.index, uc, w) {
                continue;
            }
            let w_rec = self.store.get(w).expect("DFS frontier unit must be installed");
            if w_rec.level + 2 <= v_level || (w_rec.level + 1 == v_level && w_rec.prime) {
                seen_processes.insert(w_rec.creator_id());
                if self.config.is_supermajority(seen_processes.len()) {
                    return true;
                }
            }
            stack.extend(w_rec.unit.parent_hashes.iter().copied());
        }
        false
    }

    /// Fast binary vote `vote(U, Uc)`, round `r = level(U) - level(Uc) - t`.
    pub fn vote(&mut self, u: Hash, uc: Hash) -> i8 {
        if let Some(cached) = self.memo.get(uc, u).vote {
            return cached;
        }
        let result = self.vote_uncached(u, uc);
        self.memo.update(uc, u, |m| m.vote = Some(result));
        result
    }

    fn vote_uncached(&mut self, u: Hash, uc: Hash) -> i8 {
        let r = self.round(u, uc);
        if r == 0 {
            return if self.proves_popularity(uc, u) { 1 } else { 0 };
        }

        let level_below = self.level_of(u) - 1;
        let primes = self.primes_at(level_below);
        let mut votes = Vec::new();
        for v in primes {
            if below(self.store, self.index, v, u) {
                let mut vv = self.vote(v, uc);
                if vv == -1 {
                    vv = self.default_vote(v, uc);
                }
                votes.push(vv);
            }
        }
        self.super_majority(&votes)
    }

    fn round(&self, u: Hash, uc: Hash) -> i64 {
        self.level_of(u) as i64 - self.level_of(uc) as i64 - self.config.voting_level as i64
    }

    /// `default_vote(U, Uc)`, by `r' = level(U) - level(Uc) - t`.
    pub fn default_vote(&self, u: Hash, uc: Hash) -> i8 {
        match self.round(u, uc) {
            1 => 1,
            2 => 0,
            _ => i8::from(simple_coin(uc, self.level_of(u))),
        }
    }

    /// `super_majority`: 1 only when `3*count(1) >= 2n`, symmetric for 0, else bot (-1).
    pub fn super_majority(&self, votes: &[i8]) -> i8 {
        let ones = votes.iter().filter(|&&v| v == 1).count();
        let zeros = votes.iter().filter(|&&v| v == 0).count();
        if self.config.is_supermajority(ones) {
            1
        } else if self.config.is_supermajority(zeros) {
            0
        } else {
            -1
        }
    }

    /// `exists_tc(votes, Uc, U)`: first of {1, 0} present, else `toss_coin`.
    pub fn exists_tc(&mut self, votes: &[i8], uc: Hash, u: Hash) -> i8 {
        if votes.contains(&1) {
            1
        } else if votes.contains(&0) {
            0
        } else {
            i8::from(self.toss_coin(uc, u))
        }
    }

    /// `compute_pi(Uc, U)`, pi-round `r = level(U) - (level(Uc) + t_pd) + 1`.
    pub fn compute_pi(&mut self, uc: Hash, u: Hash) -> i8 {
        if let Some(cached) = self.memo.get(uc, u).pi {
            return cached;
        }
        let result = self.compute_pi_uncached(uc, u);
        self.memo.update(uc, u, |m| m.pi = Some(result));
        result
    }

    fn pi_round(&self, uc: Hash, u: Hash) -> i64 {
        self.level_of(u) as i64 - (self.level_of(uc) as i64 + self.config.pi_delta_level as i64) + 1
    }

    fn compute_pi_uncached(&mut self, uc: Hash, u: Hash) -> i8 {
        let r = self.pi_round(uc, u);
        let level_below = self.level_of(u) - 1;
        let below_u: Vec<Hash> =
            self.primes_at(level_below).into_iter().filter(|&v| below(self.store, self.index, v, u)).collect();

        let values: Vec<i8> = if r == 1 {
            below_u
                .into_iter()
                .map(|v| {
                    let mut vv = self.vote(v, uc);
                    if vv == -1 {
                        vv = self.default_vote(v, uc);
                    }
                    vv
                })
                .collect()
        } else {
            below_u.into_iter().map(|v| self.compute_pi(uc, v)).collect()
        };

        if r % 2 != 0 {
            self.super_majority(&values)
        } else {
            self.exists_tc(&values, uc, u)
        }
    }

    /// `compute_delta(Uc, U)` (r even): `super_majority` of pi-values at `level(U)-1`.
    pub fn compute_delta(&mut self, uc: Hash, u: Hash) -> i8 {
        if let Some(cached) = self.memo.get(uc, u).delta {
            return cached;
        }
        let result = self.compute_delta_uncached(uc, u);
        self.memo.update(uc, u, |m| m.delta = Some(result));
        result
    }

    fn compute_delta_uncached(&mut self, uc: Hash, u: Hash) -> i8 {
        let level_below = self.level_of(u) - 1;
        let below_u: Vec<Hash> =
            self.primes_at(level_below).into_iter().filter(|&v| below(self.store, self.index, v, u)).collect();
        let values: Vec<i8> = below_u.into_iter().map(|v| self.compute_pi(uc, v)).collect();
        self.super_majority(&values)
    }

    /// `toss_coin(Uc, U)`: threshold-coin path with a `simple_coin`
    /// fallback on disable, low level, or combine failure.
    pub fn toss_coin(&mut self, uc: Hash, u: Hash) -> bool {
        let u_level = self.level_of(u);
        if !self.config.use_tcoin || u_level <= self.config.add_shares {
            return simple_coin(u, u_level);
        }

        let l = u_level - 1;
        let below_u: Vec<Hash> =
            self.primes_at(l).into_iter().filter(|&v| below(self.store, self.index, v, u)).collect();

        let mut dealer: Option<Hash> = None;
        let mut used_creators = HashSet::new();
        let mut shares: Vec<(ProcessId, Vec<u8>)> = Vec::new();
        let mut threshold = None;

        for v in below_u {
            let v_rec = self.store.get(v).expect("prime below u must be installed");
            let creator = v_rec.creator_id();
            if used_creators.contains(&creator) {
                continue;
            }
            let Some(fdu) = self.fdu(v) else { continue };
            if let Some(established) = dealer {
                if established != fdu {
                    continue;
                }
            } else {
                dealer = Some(fdu);
                threshold = self.coins.get(&fdu).map(ThresholdCoin::threshold);
            }
            let Some(share) = v_rec.unit.coin_payload.as_share() else { continue };
            used_creators.insert(creator);
            shares.push((creator, share.to_vec()));
            if Some(shares.len()) == threshold {
                break;
            }
        }

        let (Some(dealer_hash), Some(k)) = (dealer, threshold) else {
            return simple_coin(uc, l);
        };
        if shares.len() != k {
            return simple_coin(uc, l);
        }
        let Some(coin) = self.coins.get(&dealer_hash) else {
            return simple_coin(uc, l);
        };
        match coin.combine(&shares, l) {
            Ok(bit) => bit,
            Err(_) => simple_coin(uc, l),
        }
    }

    /// `FDU(V)`: the first dealer in `CRP[level(V)]` (skipping dealers for
    /// whom `V` has forking evidence) whose dealing unit is below `V`.
    pub fn fdu(&mut self, v: Hash) -> Option<Hash> {
        if let Some(cached) = self.fdu_cache.get(&v) {
            return *cached;
        }
        let result = self.fdu_uncached(v);
        self.fdu_cache.insert(v, result);
        result
    }

    fn fdu_uncached(&self, v: Hash) -> Option<Hash> {
        let v_rec = self.store.get(v).expect("unit must be installed");
        let perm = self.crp.permutation(v_rec.level);
        for dealer_process in perm {
            if v_rec.has_forking_evidence(dealer_process) {
                continue;
            }
            for &d in self.index.dealing_units(dealer_process) {
                if below(self.store, self.index, d, v) {
                    return Some(d);
                }
            }
        }
        None
    }
}
