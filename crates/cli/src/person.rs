//! `insurstat person`: per-person statistics workbook.

use std::path::PathBuf;

use insurstat_config::Settings;
use insurstat_core::{run_person, PersonRoster, SourceShape};
use insurstat_io::archive::save_bytes;
use insurstat_io::xlsx::write_document;

use crate::job::{load, output_path, print_json, read_roster, report_issues, resolve_config};
use crate::{CliError, JobArgs, PolicyArg};

pub fn cmd_person(
    args: JobArgs,
    roster_path: Option<PathBuf>,
    policy: Option<PolicyArg>,
    label: Option<String>,
    out: Option<PathBuf>,
    yearly: bool,
    json_output: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let mut config = resolve_config(&args, SourceShape::MonthlySheets, &settings)?;
    if let Some(policy) = policy {
        config.stats.policy = policy.into();
    }
    if let Some(label) = label {
        config.name = label;
    }
    config.stats.yearly_sheet |= yearly;

    let profile = config.ingest_profile();
    let roster = match roster_path {
        Some(ref path) => PersonRoster::from_file(&read_roster(path)?, &config.roster, profile.name_normalization),
        None => PersonRoster::default(),
    };

    let session = load(&args, &config)?;
    if !session.issues().is_empty() {
        eprintln!("{} source row(s) skipped:", session.issues().total());
        report_issues(session.issues());
    }

    let report = run_person(&config, session.batches(), &roster)?;

    let path = output_path(out, &settings, &report.document.file_name);
    let bytes = write_document(&report.document)?;
    save_bytes(&path, &bytes)?;

    if json_output {
        print_json(&report)?;
    }

    let s = &report.summary;
    eprintln!(
        "{}: {} person(s), {} enrolled month(s), total {} ({} policy, {} month column(s))",
        config.name,
        s.rows,
        s.total_months,
        s.grand_total,
        config.stats.policy,
        report.view.month_range.len(),
    );
    eprintln!("wrote {}", path.display());
    Ok(())
}
