use crate::ProcessId;
use serde::{Deserialize, Serialize};

/// Per-rule toggles for the compliance validator, default-on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRules {
    pub forker_muting: bool,
    pub expand_primes: bool,
    pub threshold_coin: bool,
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self { forker_muting: true, expand_primes: true, threshold_coin: true }
    }
}

/// Configuration accepted by the poset aggregator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Committee size.
    pub n: u16,
    /// This process's index; required when `use_tcoin` is set.
    pub process_id: Option<ProcessId>,
    /// Enable the threshold-coin path in `toss_coin`.
    pub use_tcoin: bool,
    pub compliance_rules: ComplianceRules,
    /// Fast-algorithm start offset, `t`. Default 3.
    pub voting_level: u32,
    /// Switch to the pi/delta algorithm, `t_pd`. Default 12.
    pub pi_delta_level: u32,
    /// Earliest prime-unit level carrying a coin share. Default `pi_delta_level - 1`.
    pub add_shares: u32,
}

pub const DEFAULT_VOTING_LEVEL: u32 = 3;
pub const DEFAULT_PI_DELTA_LEVEL: u32 = 12;

impl Config {
    pub fn new(n: u16) -> Self {
        Self {
            n,
            process_id: None,
            use_tcoin: false,
            compliance_rules: ComplianceRules::default(),
            voting_level: DEFAULT_VOTING_LEVEL,
            pi_delta_level: DEFAULT_PI_DELTA_LEVEL,
            add_shares: DEFAULT_PI_DELTA_LEVEL - 1,
        }
    }

    /// `⌊n/3⌋ + 1`, the threshold-coin reconstruction quorum.
    pub fn coin_threshold(&self) -> u16 {
        self.n / 3 + 1
    }

    /// `3*count >= 2*n`, the supermajority test used throughout the core.
    pub fn is_supermajority(&self, count: usize) -> bool {
        3 * (count as u64) >= 2 * (self.n as u64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(4)
    }
}
