use std::fmt;

use crate::ingest::IngestIssue;

#[derive(Debug)]
pub enum StatError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad column layout, negative rate, etc.).
    ConfigValidation(String),
    /// A source file contained no sheets at all.
    EmptyFile { file: String },
    /// Every row of a file was rejected; the rejected rows are kept for reporting.
    NoReadableRows { file: String, issues: Vec<IngestIssue> },
    /// Export attempted without the rosters or data it needs.
    MissingPrecondition(String),
    /// Export refused because ingestion reported malformed rows.
    BlockedByIssues { count: usize },
    /// Results of a load that was superseded by a later load or a reset.
    StaleLoad { ticket: u64, current: u64 },
}

impl fmt::Display for StatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyFile { file } => write!(f, "'{file}' contains no sheets"),
            Self::NoReadableRows { file, issues } => {
                write!(f, "'{file}': no readable rows ({} rejected)", issues.len())
            }
            Self::MissingPrecondition(msg) => write!(f, "missing precondition: {msg}"),
            Self::BlockedByIssues { count } => {
                write!(f, "{count} malformed row(s) must be fixed before export")
            }
            Self::StaleLoad { ticket, current } => {
                write!(f, "load #{ticket} was superseded (current load is #{current})")
            }
        }
    }
}

impl std::error::Error for StatError {}
