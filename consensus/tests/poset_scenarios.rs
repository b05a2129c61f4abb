//!
//! End-to-end scenarios over the public `Poset` API.
//!

use poset_consensus::model::stores::{MemoStore, MemoryUnitStore, ProcessIndex, UnitRecord, UnitStore, UnitStoreReader};
use poset_consensus::processes::crp::Crp;
use poset_consensus::processes::popularity::PopularityEngine;
use poset_consensus::processes::{coin::ThresholdCoin, linearizer};
use poset_consensus::{AddOutcome, CoinPayload, ComplianceRule, Config, Poset, Unit};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

fn unit(creator: u16, parents: Vec<poset_hashes::Hash>, height: u64) -> Unit {
    Unit::new(creator, parents, height, vec![], vec![], CoinPayload::Empty)
}

fn install(poset: &mut Poset, u: Unit) -> poset_hashes::Hash {
    let prepared = poset.prepare(u).expect("well-formed parents");
    poset.check_compliance(&prepared).expect("compliant unit");
    match poset.add(prepared) {
        AddOutcome::Installed { hash, .. } | AddOutcome::AlreadyInstalled { hash } => hash,
    }
}

#[test]
fn linear_chain_no_forks_commits_first_dealing_unit_in_crp_order() {
    drop(env_logger::try_init());
    // Arrange: four processes each deal, then each builds a single child that
    // sees the other three dealing units, reaching level 1 everywhere.
    let mut poset = Poset::new(Config::new(4));
    let mut dealing = Vec::new();
    for p in 0..4u16 {
        dealing.push(install(&mut poset, unit(p, vec![], 0)));
    }

    let mut children = Vec::new();
    for p in 0..4u16 {
        let mut parents = vec![dealing[p as usize]];
        for (q, &d) in dealing.iter().enumerate() {
            if q as u16 != p {
                parents.push(d);
            }
        }
        children.push(install(&mut poset, unit(p, parents, 1)));
    }
    assert_eq!(poset.level_reached(), 1);
    // All four children are installed and visible; no batch is committable yet
    // since reaching a timing decision at level 0 needs level_reached >= t.
    assert!(poset.attempt_timing_decision().is_empty());
    assert_eq!(poset.n_units(), 8);
    let _ = children;
}

#[test]
fn fork_muting_rejects_a_unit_that_both_descends_from_and_carries_evidence_against_the_same_process() {
    drop(env_logger::try_init());
    // Arrange: process 0 forks into D0 and D0'. Two independent witnesses (by
    // process 1 and process 2) each see exactly one of the fork's branches.
    let mut poset = Poset::new(Config::new(4));
    let d0 = install(&mut poset, unit(0, vec![], 0));
    let d0b = install(&mut poset, Unit::new(0, vec![], 0, vec![1], vec![], CoinPayload::Empty));
    let d1 = install(&mut poset, unit(1, vec![], 0));
    let d2 = install(&mut poset, unit(2, vec![], 0));

    let x = install(&mut poset, unit(1, vec![d1, d0], 1));
    let y = install(&mut poset, unit(2, vec![d2, d0b], 1));

    // U merges both branches into its floor[0] but is itself compliant: the
    // self-forking-evidence rule only inspects U's own column (1).
    let u = install(&mut poset, unit(1, vec![x, y], 2));

    // W by process 2 both descends from U (which now carries fork evidence
    // for process 0) and directly cites a unit created by process 0.
    let w = poset.prepare(unit(2, vec![y, u, d0], 2)).unwrap();
    let err = poset.check_compliance(&w).unwrap_err();
    assert_eq!(err.rule, ComplianceRule::ForkerMuting);
    assert_eq!(err.unit, w.hash());
    let _ = d0b;
}

#[test]
fn expand_primes_violation_when_two_extra_parents_contribute_the_same_primes() {
    drop(env_logger::try_init());
    // Arrange: U's two non-self parents both resolve to exactly {D1} among
    // level-0 primes, so the second contributes nothing new.
    let mut poset = Poset::new(Config::new(4));
    let d0 = install(&mut poset, unit(0, vec![], 0));
    let d1 = install(&mut poset, unit(1, vec![], 0));

    let v1 = install(&mut poset, unit(1, vec![d1], 1));
    let v2 = install(&mut poset, unit(1, vec![v1], 2));

    let u = poset.prepare(unit(0, vec![d0, v1, v2], 1)).unwrap();
    let err = poset.check_compliance(&u).unwrap_err();
    assert_eq!(err.rule, ComplianceRule::ExpandPrimes);
}

#[test]
fn undecided_when_level_reached_trails_the_candidate_by_less_than_the_voting_level() {
    drop(env_logger::try_init());
    // Arrange: a single dealing unit; level_reached == level(Uc) == 0, and
    // the default voting_level (t) is 3, so the fast-positive window and
    // every later window are all out of reach.
    let mut poset = Poset::new(Config::new(4));
    let d0 = install(&mut poset, unit(0, vec![], 0));
    assert_eq!(poset.level_reached(), 0);
    assert!(poset.attempt_timing_decision().is_empty());
    let _ = d0;
}

#[test]
fn tie_break_is_deterministic_regardless_of_in_memory_ordering() {
    drop(env_logger::try_init());
    let mut store = MemoryUnitStore::new();
    let mut index = ProcessIndex::new(3);
    let n = 3;

    let mut install_raw = |creator: u16, parents: Vec<poset_hashes::Hash>| -> poset_hashes::Hash {
        let height = parents.first().map(|&p| store.get(p).unwrap().height() + 1).unwrap_or(0);
        let u = unit(creator, parents.clone(), height);
        let hash = u.hash();
        let mut floor = vec![SmallVec::new(); n];
        floor[creator as usize].push(hash);
        for p in &parents {
            let prec = store.get(*p).unwrap();
            for col in 0..n {
                if col == creator as usize {
                    continue;
                }
                for &h in prec.floor[col].iter() {
                    if !floor[col].contains(&h) {
                        floor[col].push(h);
                    }
                }
            }
        }
        store.insert(UnitRecord { unit: Arc::new(u), level: 0, floor, prime: parents.is_empty() });
        index.record(creator, hash, height, parents.first().copied(), 0, parents.is_empty());
        hash
    };

    let d0 = install_raw(0, vec![]);
    let d1 = install_raw(1, vec![]);
    let d2 = install_raw(2, vec![]);
    let c0 = install_raw(0, vec![d0, d1, d2]);

    let forward = linearizer::break_ties(&store, &[d0, d1, d2, c0]);
    let shuffled = linearizer::break_ties(&store, &[c0, d2, d0, d1]);
    assert_eq!(forward, shuffled);
}

#[test]
fn delta_at_the_first_even_pi_round_matches_super_majority_of_the_round_below() {
    drop(env_logger::try_init());
    // Arrange a five-layer tower so a supermajority of witnesses genuinely
    // propagates from Uc (`proves_popularity` only succeeds from
    // level(Uc) + 2 onward, once a third process has relayed a unit
    // that itself relayed Uc): dealings (L0) -> direct relays (L1) -> the
    // first units that actually prove Uc's popularity (L2, round 0 votes)
    // -> pi at the first odd round (L3) -> delta at the first even round (L4).
    let mut store = MemoryUnitStore::new();
    let mut index = ProcessIndex::new(4);
    let config = Config { voting_level: 2, pi_delta_level: 3, ..Config::new(4) };
    let crp = Crp::new(4);
    let coins: HashMap<poset_hashes::Hash, ThresholdCoin> = HashMap::new();
    let mut memo = MemoStore::new();
    let mut fdu_cache = HashMap::new();

    let mut install_raw = |creator: u16, parents: Vec<poset_hashes::Hash>, level: u32| -> poset_hashes::Hash {
        let height = parents.first().map(|&p| store.get(p).unwrap().height() + 1).unwrap_or(0);
        let u = unit(creator, parents.clone(), height);
        let hash = u.hash();
        let mut floor = vec![SmallVec::new(); 4];
        floor[creator as usize].push(hash);
        for p in &parents {
            let prec = store.get(*p).unwrap();
            for col in 0..4 {
                if col == creator as usize {
                    continue;
                }
                for &h in prec.floor[col].iter() {
                    if !floor[col].contains(&h) {
                        floor[col].push(h);
                    }
                }
            }
        }
        store.insert(UnitRecord { unit: Arc::new(u), level, floor, prime: true });
        index.record(creator, hash, height, parents.first().copied(), level, true);
        hash
    };

    // L0: Uc plus three independent dealing units.
    let uc = install_raw(0, vec![], 0);
    let e1 = install_raw(1, vec![], 0);
    let e2 = install_raw(2, vec![], 0);
    let e3 = install_raw(3, vec![], 0);

    // L1: each process's first unit that has actually seen Uc.
    let h0 = install_raw(0, vec![uc, e1, e2, e3], 1);
    let h1 = install_raw(1, vec![e1, uc, e2, e3], 1);
    let h2 = install_raw(2, vec![e2, uc, e1, e3], 1);
    let h3 = install_raw(3, vec![e3, uc, e1, e2], 1);

    // L2: level(Uc) + 2, the first level at which `proves_popularity` can
    // succeed (it needs a supermajority of L1 relays below it and Uc).
    let g0 = install_raw(0, vec![h0, h1, h2, h3], 2);
    let g1 = install_raw(1, vec![h1, h0, h2, h3], 2);
    let g2 = install_raw(2, vec![h2, h0, h1, h3], 2);
    let g3 = install_raw(3, vec![h3, h0, h1, h2], 2);

    let mut engine = PopularityEngine::new(&store, &index, &config, &crp, &coins, &mut memo, &mut fdu_cache);
    for &g in &[g0, g1, g2, g3] {
        assert_eq!(engine.vote(g, uc), 1, "round 0 (level(Uc)+t) resolves directly to proves_popularity");
    }

    // L3: pi_round(Uc, U) = level(U) - (level(Uc) + t_pd) + 1 = 3 - 3 + 1 = 1
    // (odd), so compute_pi takes the super_majority of the votes one level down.
    let u0 = install_raw(0, vec![g0, g1, g2, g3], 3);
    let u1 = install_raw(1, vec![g1, g0, g2, g3], 3);
    let u2 = install_raw(2, vec![g2, g0, g1, g3], 3);
    let u3 = install_raw(3, vec![g3, g0, g1, g2], 3);
    for &u in &[u0, u1, u2, u3] {
        assert_eq!(engine.compute_pi(uc, u), 1, "odd pi-round take the super_majority of unanimous 1-votes below");
    }

    // L4: one level above, so compute_delta reads the pi-values just computed.
    let w = install_raw(0, vec![u0, u1, u2, u3], 4);
    let delta = engine.compute_delta(uc, w);
    assert_eq!(delta, 1, "delta equals the super_majority of unanimous pi=1 values one level below");
}
