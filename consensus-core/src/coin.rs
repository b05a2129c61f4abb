use serde::{Deserialize, Serialize};

/// The coin-share variant carried by a unit.
///
/// `Dealt` appears only in a dealing unit and bundles the full threshold-coin
/// key material for that dealer; `Share` appears in non-dealing prime units
/// at level >= `ADD_SHARES`; `Empty` is every other unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinPayload {
    Empty,
    Dealt(Box<DealtCoin>),
    Share(Vec<u8>),
}

impl CoinPayload {
    pub fn is_empty(&self) -> bool {
        matches!(self, CoinPayload::Empty)
    }

    pub fn as_dealt(&self) -> Option<&DealtCoin> {
        match self {
            CoinPayload::Dealt(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_share(&self) -> Option<&[u8]> {
        match self {
            CoinPayload::Share(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical bytes contributed to the unit's hash. Must change whenever
    /// the payload's observable content changes, so a unit's cached hash is
    /// invalidated when its coin-share is set.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            CoinPayload::Empty => vec![0u8],
            CoinPayload::Share(bytes) => {
                let mut out = vec![1u8];
                out.extend_from_slice(bytes);
                out
            }
            CoinPayload::Dealt(dealt) => {
                let mut out = vec![2u8];
                out.extend_from_slice(&dealt.vk);
                for vk in &dealt.vks {
                    out.extend_from_slice(vk);
                }
                for sk in &dealt.sks {
                    out.extend_from_slice(sk);
                }
                out
            }
        }
    }
}

/// The dealt threshold-coin bundle carried by a dealing unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtCoin {
    pub vk: Vec<u8>,
    pub vks: Vec<Vec<u8>>,
    pub sks: Vec<Vec<u8>>,
}

impl DealtCoin {
    /// The shape check used by compliance rule 2: `vk` present, `|vks| = n`, `|sks| = n`.
    pub fn has_valid_shape(&self, n: usize) -> bool {
        self.vks.len() == n && self.sks.len() == n
    }
}
