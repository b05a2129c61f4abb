use crate::coin::CoinPayload;
use crate::{Height, ProcessId};
use poset_hashes::{Hash, Hasher, HasherBase, UnitHash};
use serde::{Deserialize, Serialize};

/// An immutable DAG node contributed by one committee member.
///
/// `parent_hashes[0]`, when present, is the *self-predecessor*: the
/// previous unit created by `creator_id`. A unit with no parents is a
/// *dealing unit*, the bottom of its creator's chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub creator_id: ProcessId,
    pub parent_hashes: Vec<Hash>,
    pub height: Height,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
    pub coin_payload: CoinPayload,
    hash: Hash,
}

impl Unit {
    pub fn new(
        creator_id: ProcessId,
        parent_hashes: Vec<Hash>,
        height: Height,
        payload: Vec<u8>,
        signature: Vec<u8>,
        coin_payload: CoinPayload,
    ) -> Self {
        let hash = compute_hash(creator_id, &parent_hashes, &coin_payload, &payload);
        Self { creator_id, parent_hashes, height, payload, signature, coin_payload, hash }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn is_dealing(&self) -> bool {
        self.parent_hashes.is_empty()
    }

    pub fn self_predecessor_hash(&self) -> Option<Hash> {
        self.parent_hashes.first().copied()
    }

    /// Parents other than the self-predecessor, in the order they were listed.
    pub fn other_parent_hashes(&self) -> &[Hash] {
        if self.parent_hashes.is_empty() {
            &[]
        } else {
            &self.parent_hashes[1..]
        }
    }
}

fn compute_hash(creator_id: ProcessId, parent_hashes: &[Hash], coin_payload: &CoinPayload, payload: &[u8]) -> Hash {
    let mut hasher = UnitHash::new();
    hasher.update(creator_id.to_le_bytes());
    hasher.update((parent_hashes.len() as u32).to_le_bytes());
    for parent in parent_hashes {
        hasher.update(parent.as_bytes());
    }
    let coin_bytes = coin_payload.canonical_bytes();
    hasher.update((coin_bytes.len() as u64).to_le_bytes());
    hasher.update(&coin_bytes);
    hasher.update((payload.len() as u64).to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
