//! Parser for the `dump-nofork-level-timing` text format [`crate::Poset::dump`]
//! emits, closing the round-trip law from spec.md §8 ("load(dump(P))
//! reproduces levels and timing flags exactly"). `short_name` truncates a
//! unit's hash to 8 bytes for readability, so this does not reconstruct a
//! runnable `Poset` (that would need the full hashes) — it recovers exactly
//! what the law asks for: each unit's level and timing flag, keyed by the
//! same short name the dump printed.

use poset_consensus_core::{Level, ProcessId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedUnit {
    pub short_name: String,
    pub creator_id: ProcessId,
    pub parent_short_names: Vec<String>,
    pub level: Level,
    pub timing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    pub process_id: ProcessId,
    pub n_processes: u16,
    pub n_units: usize,
    pub units: Vec<DumpedUnit>,
    pub forking_processes: Vec<ProcessId>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DumpParseError {
    #[error("expected a line starting with {0:?}, found {1:?}")]
    ExpectedPrefix(&'static str, String),
    #[error("truncated dump: expected a unit record after line {0}")]
    TruncatedRecord(usize),
    #[error("could not parse integer field on line {0}: {1:?}")]
    BadInteger(usize, String),
    #[error("unit record header on line {0} is missing a creator id: {1:?}")]
    MissingCreatorId(usize, String),
}

fn expect_prefix<'a>(line: Option<&'a str>, prefix: &'static str, line_no: usize) -> Result<&'a str, DumpParseError> {
    let line = line.ok_or(DumpParseError::TruncatedRecord(line_no))?;
    line.strip_prefix(prefix).ok_or_else(|| DumpParseError::ExpectedPrefix(prefix, line.to_string()))
}

fn parse_int<T: std::str::FromStr>(s: &str, line_no: usize) -> Result<T, DumpParseError> {
    s.trim().parse().map_err(|_| DumpParseError::BadInteger(line_no, s.to_string()))
}

/// Parses the text [`crate::Poset::dump`] produces back into a [`Dump`].
pub fn parse(text: &str) -> Result<Dump, DumpParseError> {
    let mut lines = text.lines().enumerate();

    let (no, header) = lines.next().ok_or(DumpParseError::TruncatedRecord(0))?;
    if header != "format dump-nofork-level-timing" {
        return Err(DumpParseError::ExpectedPrefix("format dump-nofork-level-timing", header.to_string()));
    }
    let _ = no;

    let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(1))?;
    let process_id = parse_int(expect_prefix(Some(line), "process_id ", no)?, no)?;

    let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(2))?;
    let n_processes = parse_int(expect_prefix(Some(line), "n_processes ", no)?, no)?;

    let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(3))?;
    let n_units: usize = parse_int(expect_prefix(Some(line), "n_units ", no)?, no)?;

    let mut units = Vec::with_capacity(n_units);
    for _ in 0..n_units {
        let (no, header_line) = lines.next().ok_or(DumpParseError::TruncatedRecord(4))?;
        let mut parts = header_line.rsplitn(2, ' ');
        let creator_str = parts.next().ok_or_else(|| DumpParseError::MissingCreatorId(no, header_line.to_string()))?;
        let short_name = parts.next().ok_or_else(|| DumpParseError::MissingCreatorId(no, header_line.to_string()))?;
        let creator_id = parse_int(creator_str, no)?;

        let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(no))?;
        let parents_str = expect_prefix(Some(line), "parents ", no)?;
        let parent_short_names: Vec<String> = parents_str.split_whitespace().map(str::to_string).collect();

        let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(no))?;
        let level = parse_int(expect_prefix(Some(line), "level ", no)?, no)?;

        let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(no))?;
        let timing_flag: u8 = parse_int(expect_prefix(Some(line), "timing ", no)?, no)?;

        units.push(DumpedUnit {
            short_name: short_name.to_string(),
            creator_id,
            parent_short_names,
            level,
            timing: timing_flag != 0,
        });
    }

    let (no, line) = lines.next().ok_or(DumpParseError::TruncatedRecord(4 + n_units))?;
    let forking_str = expect_prefix(Some(line), "forking_processes ", no)?;
    let forking_processes: Vec<ProcessId> =
        forking_str.split(',').filter(|s| !s.is_empty()).map(|s| parse_int(s, no)).collect::<Result<_, _>>()?;

    Ok(Dump { process_id, n_processes, n_units, units, forking_processes })
}
