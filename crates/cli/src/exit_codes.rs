//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success                                                      |
//! | 1    | General error (unspecified)                                  |
//! | 2    | CLI usage error (bad args, missing or unsupported file)      |
//! | 3    | Ingest issues (malformed rows, unreadable source files)      |
//! | 4    | Missing precondition (no roster, no data)                    |
//! | 5    | Output write failure                                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use insurstat_core::StatError;
use insurstat_io::IoError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid job config, missing or unsupported input file.
pub const EXIT_USAGE: u8 = 2;

/// Source files contained malformed rows, or a file had no readable rows at all.
pub const EXIT_INGEST_ISSUES: u8 = 3;

/// Export attempted without a required roster or without data.
pub const EXIT_MISSING_PRECONDITION: u8 = 4;

/// Writing the output document or archive failed.
pub const EXIT_OUTPUT_WRITE: u8 = 5;

/// Map an engine error to its exit code.
pub fn stat_exit_code(err: &StatError) -> u8 {
    match err {
        StatError::ConfigParse(_) | StatError::ConfigValidation(_) => EXIT_USAGE,
        StatError::EmptyFile { .. } | StatError::NoReadableRows { .. } => EXIT_INGEST_ISSUES,
        StatError::BlockedByIssues { .. } => EXIT_INGEST_ISSUES,
        StatError::MissingPrecondition(_) => EXIT_MISSING_PRECONDITION,
        StatError::StaleLoad { .. } => EXIT_ERROR,
    }
}

/// Map an I/O error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. } | IoError::UnsupportedFormat { .. } => EXIT_USAGE,
        IoError::Decode { .. } => EXIT_INGEST_ISSUES,
        IoError::Encode { .. } | IoError::Archive(_) | IoError::Write { .. } => EXIT_OUTPUT_WRITE,
        IoError::Task(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stat_codes() {
        assert_eq!(stat_exit_code(&StatError::BlockedByIssues { count: 2 }), EXIT_INGEST_ISSUES);
        assert_eq!(
            stat_exit_code(&StatError::MissingPrecondition("roster".into())),
            EXIT_MISSING_PRECONDITION
        );
        assert_eq!(stat_exit_code(&StatError::ConfigParse("x".into())), EXIT_USAGE);
    }

    #[test]
    fn test_io_codes() {
        let missing = IoError::Read { path: PathBuf::from("a.xlsx"), message: "not found".into() };
        assert_eq!(io_exit_code(&missing), EXIT_USAGE);
        let write = IoError::Write { path: PathBuf::from("out.zip"), message: "denied".into() };
        assert_eq!(io_exit_code(&write), EXIT_OUTPUT_WRITE);
    }
}
