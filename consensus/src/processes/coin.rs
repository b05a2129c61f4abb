//! Threshold coin: a per-dealer k-of-N shared pseudorandom bit source. The
//! dealing unit's [`CoinPayload::Dealt`] bundle already carries every
//! signer's key material in-band (compliance rule 2 only checks its
//! *shape*; encrypting `sks[i]` to its owner is explicitly out of scope),
//! so the [`ThresholdCoin`] extracted from it has direct access to all of
//! it. `create_share`/`verify_share`/`combine` are built as a
//! deterministic, domain-separated hash construction over that material
//! rather than a pairing-based BLS scheme (no pairing crate is part of this
//! workspace's dependency stack; see DESIGN.md).

use poset_consensus_core::coin::DealtCoin;
use poset_consensus_core::errors::CoinError;
use poset_consensus_core::{Level, ProcessId};
use poset_hashes::{CoinShareHash, Hash, Hasher, HasherBase};

/// Extracted from a dealing unit's [`CoinPayload::Dealt`] bundle, keyed
/// elsewhere by the dealing unit's hash.
#[derive(Clone, Debug)]
pub struct ThresholdCoin {
    dealer: Hash,
    threshold: usize,
    vks: Vec<Vec<u8>>,
    sks: Vec<Vec<u8>>,
}

impl ThresholdCoin {
    /// Extracts a coin from a dealing unit's bundle, or `None` if the shape
    /// is wrong for committee size `n` (the compliance validator should have
    /// already rejected such a unit; this is a defensive second check).
    pub fn from_dealt(dealer: Hash, dealt: &DealtCoin, n: usize, threshold: usize) -> Option<Self> {
        if !dealt.has_valid_shape(n) {
            return None;
        }
        Some(Self { dealer, threshold, vks: dealt.vks.clone(), sks: dealt.sks.clone() })
    }

    pub fn dealer(&self) -> Hash {
        self.dealer
    }

    /// `⌊n/3⌋ + 1`, the number of shares `combine` requires.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn n(&self) -> usize {
        self.vks.len()
    }

    /// `create_share(level)`: deterministic in (secret key, level).
    pub fn create_share(&self, signer_id: ProcessId, level: Level) -> Vec<u8> {
        share_digest(self.dealer, &self.sks[signer_id as usize], level).as_bytes().to_vec()
    }

    /// `verify_share(share, signer_id, level)` using the dealer's `vks[signer_id]`.
    pub fn verify_share(&self, share: &[u8], signer_id: ProcessId, level: Level) -> bool {
        let idx = signer_id as usize;
        if idx >= self.sks.len() || self.vks[idx].is_empty() {
            return false;
        }
        self.create_share(signer_id, level).as_slice() == share
    }

    /// `combine(shares, level) -> (bit, ok)`: requires exactly `k` valid
    /// shares from pairwise distinct signers; the resulting bit is
    /// pseudorandom and unpredictable before `k` honest shares are known.
    pub fn combine(&self, shares: &[(ProcessId, Vec<u8>)], level: Level) -> Result<bool, CoinError> {
        if shares.len() != self.threshold {
            return Err(CoinError::WrongShareCount(shares.len(), self.threshold));
        }

        let mut seen = std::collections::HashSet::new();
        for (signer, share) in shares {
            if !seen.insert(*signer) {
                return Err(CoinError::DuplicateSigner(*signer));
            }
            if !self.verify_share(share, *signer, level) {
                return Err(CoinError::InvalidShare(*signer, level));
            }
        }

        let mut ordered = shares.to_vec();
        ordered.sort_by_key(|(signer, _)| *signer);

        let mut hasher = CoinShareHash::new();
        hasher.update(self.dealer.as_bytes());
        hasher.update(level.to_le_bytes());
        for (signer, share) in &ordered {
            hasher.update(signer.to_le_bytes());
            hasher.update(share);
        }
        Ok(hasher.finalize().bit(0))
    }
}

fn share_digest(dealer: Hash, sk: &[u8], level: Level) -> Hash {
    let mut hasher = CoinShareHash::new();
    hasher.update(dealer.as_bytes());
    hasher.update(sk);
    hasher.update(level.to_le_bytes());
    hasher.finalize()
}

/// `simple_coin`: the `(level mod 8*|hash|)`-th bit of a unit's hash, used
/// as `default_vote` and as the `toss_coin` fallback.
pub fn simple_coin(unit_hash: Hash, level: Level) -> bool {
    let bits = poset_hashes::HASH_SIZE * 8;
    unit_hash.bit((level as usize) % bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dealt(n: usize) -> DealtCoin {
        DealtCoin {
            vk: vec![1],
            vks: (0..n).map(|i| vec![i as u8 + 1]).collect(),
            sks: (0..n).map(|i| vec![100u8 + i as u8]).collect(),
        }
    }

    #[test]
    fn share_verifies_against_its_own_signer_only() {
        let dealer = Hash::from_bytes([1; 32]);
        let d = dealt(4);
        let coin = ThresholdCoin::from_dealt(dealer, &d, 4, 2).unwrap();
        let share = coin.create_share(1, 10);
        assert!(coin.verify_share(&share, 1, 10));
        assert!(!coin.verify_share(&share, 2, 10));
        assert!(!coin.verify_share(&share, 1, 11));
    }

    #[test]
    fn combine_requires_exactly_threshold_shares() {
        let dealer = Hash::from_bytes([2; 32]);
        let d = dealt(4);
        let coin = ThresholdCoin::from_dealt(dealer, &d, 4, 2).unwrap();
        let shares = vec![(0, coin.create_share(0, 5)), (1, coin.create_share(1, 5))];
        assert!(coin.combine(&shares, 5).is_ok());

        let too_few = vec![(0, coin.create_share(0, 5))];
        assert_eq!(coin.combine(&too_few, 5), Err(CoinError::WrongShareCount(1, 2)));
    }

    #[test]
    fn combine_rejects_invalid_share() {
        let dealer = Hash::from_bytes([3; 32]);
        let d = dealt(4);
        let coin = ThresholdCoin::from_dealt(dealer, &d, 4, 2).unwrap();
        let bad_share = vec![(0, coin.create_share(0, 5)), (1, vec![0, 0, 0])];
        assert!(coin.combine(&bad_share, 5).is_err());
    }

    #[test]
    fn combine_is_deterministic_given_same_shares() {
        let dealer = Hash::from_bytes([4; 32]);
        let d = dealt(4);
        let coin = ThresholdCoin::from_dealt(dealer, &d, 4, 2).unwrap();
        let shares = vec![(1, coin.create_share(1, 7)), (0, coin.create_share(0, 7))];
        let a = coin.combine(&shares, 7).unwrap();
        let b = coin.combine(&shares, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn simple_coin_reads_expected_bit() {
        let h = Hash::from_bytes([0b0000_0001; 32]);
        assert!(simple_coin(h, 0));
        assert!(!simple_coin(h, 1));
    }
}
