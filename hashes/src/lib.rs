mod hashers;
mod short_name;

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::{self, FromStr};

pub use hashers::{CoinShareHash, CrpSeedHash, Hasher, HasherBase, TieBreakHash, UnitHash};
pub use short_name::short_name;

pub const HASH_SIZE: usize = 32;

/// A collision-resistant digest. Used both as a unit's identity and as the
/// dealer key under which a [`ThresholdCoin`](poset-consensus-core) is filed.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// The bit at index `i` (0 = least significant bit of byte 0), used by `simple_coin`.
    pub fn bit(&self, i: usize) -> bool {
        let byte = self.0[i / 8];
        (byte >> (i % 8)) & 1 == 1
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex_buf = [0u8; HASH_SIZE * 2];
        hex::encode_to_slice(&self.0, &mut hex_buf).expect("output is exactly twice the size of the input");
        f.write_str(str::from_utf8(&hex_buf).expect("hex is always valid UTF-8"))
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hash_str, &mut bytes)?;
        Ok(Hash(bytes))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_display() {
        let h = Hash::from_bytes([7u8; HASH_SIZE]);
        let s = h.to_string();
        assert_eq!(Hash::from_str(&s).unwrap(), h);
    }

    #[test]
    fn bit_extraction_matches_manual_shift() {
        let h = Hash::from_bytes([0b0000_0010; HASH_SIZE]);
        assert!(h.bit(1));
        assert!(!h.bit(0));
    }
}
