pub mod coin;
pub mod config;
pub mod errors;
pub mod unit;

pub use coin::CoinPayload;
pub use config::{ComplianceRules, Config};
pub use poset_hashes::Hash;
pub use smallvec::SmallVec;
pub use unit::Unit;

/// Index of a committee member in `{0 .. n-1}`.
pub type ProcessId = u16;

/// An eventually-consistent round number assigned to a unit.
pub type Level = u32;

/// Number of units created by a single process below and including a given one.
pub type Height = u64;

/// `floor[p]` for one process `p`: the maximal ancestors of a unit created
/// by `p`. One element in the common case; more than one is fork evidence.
pub type FloorColumn = SmallVec<[Hash; 1]>;

/// A unit's floor: one [`FloorColumn`] per committee member.
pub type Floor = Vec<FloorColumn>;
