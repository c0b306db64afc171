//! Shared plumbing for the subcommands: config resolution, loading, issue output.

use std::path::{Path, PathBuf};

use insurstat_config::Settings;
use insurstat_core::ingest::{ingest_files, IssueLog};
use insurstat_core::{FileBatch, JobConfig, LoadSession, RawFile, SourceShape, StatError};
use insurstat_io::{load_sources, read_source};
use log::debug;

use crate::exit_codes::EXIT_ERROR;
use crate::{CliError, JobArgs};

/// Build the effective job config.
///
/// Precedence: CLI flag > job config file > user settings > built-in default. User settings
/// only fill in when no job config file is given.
pub fn resolve_config(args: &JobArgs, default_shape: SourceShape, settings: &Settings) -> Result<JobConfig, CliError> {
    let mut config = match args.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::args(format!("cannot read config {}: {e}", path.display())))?;
            JobConfig::from_toml(&text)?
        }
        None => {
            let mut config = JobConfig::for_shape(default_shape);
            settings.apply_to(&mut config);
            config
        }
    };

    if let Some(shape) = args.shape {
        config.shape = shape.into();
    }
    if let Some(rate) = args.unit_rate {
        config.stats.unit_rate = rate;
    }
    config.validate()?;
    debug!("job '{}': shape {}, unit rate {}", config.name, config.shape, config.stats.unit_rate);
    Ok(config)
}

/// Read every source concurrently, then ingest them into a committed load session.
pub fn load(args: &JobArgs, config: &JobConfig) -> Result<LoadSession, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot start runtime: {e}")))?;

    let mut session = LoadSession::new(config.issue_limit);
    let ticket = session.begin();

    let mut files = Vec::with_capacity(args.sources.len());
    for result in runtime.block_on(load_sources(&args.sources)) {
        files.push(result?);
    }

    let (batches, failures) = ingest_files(&files, &config.ingest_profile());
    let mut failures = failures.into_iter();
    if let Some(first) = failures.next() {
        let rest: Vec<StatError> = failures.collect();
        report_load_failure(config, &batches, &first, &rest);
        return Err(first.into());
    }

    session.commit(ticket, batches)?;
    Ok(session)
}

/// Show every rejected row of the load, from readable and unreadable files alike.
fn report_load_failure(config: &JobConfig, batches: &[FileBatch], first: &StatError, rest: &[StatError]) {
    let mut issues = IssueLog::new(config.issue_limit);
    for batch in batches {
        issues.extend(&batch.issues);
    }
    for failure in std::iter::once(first).chain(rest) {
        if let StatError::NoReadableRows { issues: rejected, .. } = failure {
            issues.extend(rejected);
        }
    }
    if !issues.is_empty() {
        eprintln!("{} source row(s) rejected:", issues.total());
        report_issues(&issues);
    }
    for failure in rest {
        eprintln!("error: {failure}");
    }
}

pub fn read_roster(path: &Path) -> Result<RawFile, CliError> {
    read_source(path).map_err(|e| CliError::from(e).with_hint("rosters are read from the first sheet"))
}

/// Print the shown issues and how many more were suppressed.
pub fn report_issues(issues: &IssueLog) {
    for issue in issues.shown() {
        eprintln!("  {issue}");
    }
    if issues.is_truncated() {
        eprintln!("  ... and {} more", issues.total() - issues.shown().len());
    }
}

/// `--out` if given, otherwise `default_name` inside the configured output directory.
pub fn output_path(out: Option<PathBuf>, settings: &Settings, default_name: &str) -> PathBuf {
    out.unwrap_or_else(|| settings.output_dir().unwrap_or_default().join(default_name))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}
