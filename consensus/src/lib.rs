pub mod model;
pub mod processes;
mod poset;

pub use poset::{AddOutcome, PreparedUnit, Poset, SharedPoset};
pub use processes::dump::{parse as parse_dump, Dump, DumpParseError, DumpedUnit};

pub use poset_consensus_core::{
    coin::{CoinPayload, DealtCoin},
    config::{ComplianceRules, Config},
    errors::{ComplianceError, ComplianceRule, CoinError, MalformedUnitError},
    Height, Level, ProcessId, Unit,
};
pub use poset_hashes::{short_name, Hash};
