//! Domain-separated BLAKE2b hasher family. Each hasher is keyed with a
//! distinct domain separator so that, e.g., a unit hash can never collide
//! with a coin-share hash even over identical bytes.

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> crate::Hash;

    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> crate::Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

macro_rules! blake2b_hasher {
    ($(struct $name:ident => $domain_sep:literal),+ $(,)?) => {$(
        #[derive(Clone)]
        pub struct $name(blake2b_simd::State);

        impl $name {
            #[inline(always)]
            pub fn new() -> Self {
                Self(blake2b_simd::Params::new().hash_length(crate::HASH_SIZE).key($domain_sep).to_state())
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                self.0.update(data.as_ref());
            }

            #[inline(always)]
            pub fn finalize(self) -> crate::Hash {
                let mut out = [0u8; crate::HASH_SIZE];
                out.copy_from_slice(self.0.finalize().as_bytes());
                crate::Hash::from_bytes(out)
            }
        }

        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                self.write(data);
                self
            }
        }

        impl Hasher for $name {
            #[inline(always)]
            fn finalize(self) -> crate::Hash {
                $name::finalize(self)
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::new()
            }
        }
    )*};
}

blake2b_hasher! {
    /// Hashes a unit's {creator_id, parent hashes, serialized coin-share, payload}.
    struct UnitHash => b"AlephPosetUnitHash",
    /// Hashes a threshold-coin share.
    struct CoinShareHash => b"AlephPosetCoinShareHash",
    /// Hashes the CRP seed material for a given level.
    struct CrpSeedHash => b"AlephPosetCrpSeedHash",
    /// Hashes the tie-break nonce `R` used by `break_ties`.
    struct TieBreakHash => b"AlephPosetTieBreakHash",
}
