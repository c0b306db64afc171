//! `insurstat company`: per-company declaration workbooks in one archive.

use std::path::PathBuf;

use insurstat_config::Settings;
use insurstat_core::export::ARCHIVE_NAME;
use insurstat_core::{run_company, CompanyRoster, SourceShape, StatError};
use insurstat_io::archive::{bundle_documents, save_bytes};

use crate::job::{load, output_path, print_json, read_roster, report_issues, resolve_config};
use crate::{CliError, JobArgs};

pub fn cmd_company(
    args: JobArgs,
    companies_path: PathBuf,
    out: Option<PathBuf>,
    allow_issues: bool,
    json_output: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let config = resolve_config(&args, SourceShape::CompanyLedger, &settings)?;
    let roster = CompanyRoster::from_file(&read_roster(&companies_path)?, &config.roster);

    let session = load(&args, &config)?;
    if !session.issues().is_empty() {
        eprintln!("{} source row(s) rejected:", session.issues().total());
        report_issues(session.issues());
    }

    let report = match run_company(&config, session.batches(), &roster, allow_issues) {
        Ok(report) => report,
        Err(e @ StatError::MissingPrecondition(_)) if roster.is_empty() => {
            return Err(CliError::from(e)
                .with_hint(format!("{} lists no companies", companies_path.display())));
        }
        Err(e) => return Err(e.into()),
    };

    let path = output_path(out, &settings, ARCHIVE_NAME);
    let bytes = bundle_documents(report.documents())?;
    save_bytes(&path, &bytes)?;

    if json_output {
        print_json(&report)?;
    }

    let t = &report.totals;
    eprintln!(
        "{}: {} company document(s), {} person row(s), total {}",
        config.name, t.companies, t.rows, t.grand_total
    );
    eprintln!("wrote {}", path.display());
    Ok(())
}
