//! `insurstat check`: ingest only, report malformed rows.

use insurstat_config::Settings;
use insurstat_core::{run_check, SourceShape};

use crate::exit_codes::EXIT_INGEST_ISSUES;
use crate::job::{load, print_json, report_issues, resolve_config};
use crate::{CliError, JobArgs};

pub fn cmd_check(args: JobArgs, json_output: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let config = resolve_config(&args, SourceShape::MonthlySheets, &settings)?;
    let session = load(&args, &config)?;
    let report = run_check(&config, session.batches());

    if json_output {
        print_json(&report)?;
    }

    eprintln!(
        "{} file(s), {} record(s), {} issue(s)",
        report.files,
        report.records,
        report.issues.total()
    );
    if report.issues.is_empty() {
        return Ok(());
    }
    if !json_output {
        report_issues(&report.issues);
    }
    Err(CliError::new(EXIT_INGEST_ISSUES, ""))
}
