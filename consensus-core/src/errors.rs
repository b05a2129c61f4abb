use poset_hashes::Hash;
use thiserror::Error;

/// A unit that cannot be reasoned about at all: dangling parent references,
/// a malformed self-predecessor relationship, or duplicate parent creators.
/// The transport may resend; the creator is not blacklisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedUnitError {
    #[error("parent {0} of unit is not installed")]
    UnknownParent(Hash),

    #[error("unit's self-predecessor {expected} has creator {actual_creator}, expected {expected_creator}")]
    SelfPredecessorCreatorMismatch { expected: Hash, expected_creator: u16, actual_creator: u16 },

    #[error("unit's self-predecessor {0} has height {1}, expected height {2}")]
    SelfPredecessorHeightMismatch(Hash, u64, u64),

    #[error("parents are not pairwise distinct: creator {0} appears more than once")]
    DuplicateParentCreator(u16),
}

/// The rule violated by [`ComplianceError`], named so the aggregator can log
/// a single line identifying both the unit and the broken rule.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceRule {
    #[error("dealing unit's coin bundle shape is invalid")]
    DealingCoinShape,
    #[error("unit provides evidence that its own creator forks")]
    SelfForkingEvidence,
    #[error("unit both descends from a process and carries evidence that process forks")]
    ForkerMuting,
    #[error("a parent after the first contributes no new prime unit")]
    ExpandPrimes,
    #[error("coin-share shape is wrong for this unit's level")]
    CoinShareShape,
}

/// A unit that is well-formed but violates one of the compliance rules.
/// The creator is effectively Byzantine; the unit is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unit {unit} fails compliance rule: {rule}")]
pub struct ComplianceError {
    pub unit: Hash,
    pub rule: ComplianceRule,
}

/// Threshold-coin share verification or combination failed. Not fatal:
/// callers fall back to `simple_coin`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("share from signer {0} failed verification at level {1}")]
    InvalidShare(u16, u32),
    #[error("combine called with {0} shares, need exactly {1}")]
    WrongShareCount(usize, usize),
    #[error("duplicate share from signer {0}")]
    DuplicateSigner(u16),
}
