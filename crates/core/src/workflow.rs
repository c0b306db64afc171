//! End-to-end runs over already-ingested batches.
//!
//! Both runs fold the batches in one pass, apply the roster filter, build statistics and
//! assemble documents. Neither touches the filesystem.

use log::{info, warn};
use serde::Serialize;

use crate::config::{JobConfig, SourceShape};
use crate::error::StatError;
use crate::export::{company_document, person_document, Document};
use crate::index::{CompanyPersonMonthIndex, PersonMonthIndex};
use crate::ingest::{FileBatch, IssueLog};
use crate::roster::{CompanyRoster, OutputPolicy, PersonRoster};
use crate::stats::{MonthRange, StatisticsSummary, StatisticsView};

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub name: String,
    pub shape: SourceShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<OutputPolicy>,
    pub unit_rate: f64,
    pub files: usize,
    pub records: usize,
    pub engine_version: String,
    pub run_at: String,
}

impl RunMeta {
    fn new(config: &JobConfig, policy: Option<OutputPolicy>, batches: &[FileBatch]) -> Self {
        Self {
            name: config.name.clone(),
            shape: config.shape,
            policy,
            unit_rate: config.stats.unit_rate,
            files: batches.len(),
            records: record_count(batches),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn record_count(batches: &[FileBatch]) -> usize {
    batches.iter().map(|b| b.records.len()).sum()
}

/// Collect the issues of every batch under `limit`.
pub fn collect_issues(batches: &[FileBatch], limit: usize) -> IssueLog {
    let mut log = IssueLog::new(limit);
    for batch in batches {
        log.extend(&batch.issues);
    }
    log
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub files: usize,
    pub records: usize,
    pub issues: IssueLog,
}

/// Ingest-only summary: how much was read and what was rejected.
pub fn run_check(config: &JobConfig, batches: &[FileBatch]) -> CheckReport {
    CheckReport {
        files: batches.len(),
        records: record_count(batches),
        issues: collect_issues(batches, config.issue_limit),
    }
}

// ---------------------------------------------------------------------------
// Person statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PersonReport {
    pub meta: RunMeta,
    pub summary: StatisticsSummary,
    pub issues: IssueLog,
    #[serde(skip)]
    pub view: StatisticsView,
    #[serde(skip)]
    pub document: Document,
}

/// Person workflow: one statistics document for everyone the policy selects.
///
/// The month columns cover every ingested record, roster member or not.
pub fn run_person(
    config: &JobConfig,
    batches: &[FileBatch],
    roster: &PersonRoster,
) -> Result<PersonReport, StatError> {
    if batches.is_empty() {
        return Err(StatError::MissingPrecondition("no source files loaded".into()));
    }
    let policy = config.stats.policy;

    let mut index = PersonMonthIndex::for_roster(roster);
    index.fold_batches(batches);
    let selection = policy.select(&index, roster)?;

    let months = batches.iter().flat_map(|b| b.records.iter().map(|r| r.month));
    let range = MonthRange::build(config.stats.month_columns, months);
    let view = StatisticsView::build(&selection, range, config.stats.unit_rate);
    if view.rows.is_empty() {
        warn!("{}: no identities selected; exporting an empty table", config.name);
    }

    let summary = view.summary();
    info!(
        "{}: {} row(s), {} month column(s), total {}",
        config.name,
        summary.rows,
        view.month_range.len(),
        summary.grand_total
    );

    let document = person_document(&config.name, &view, config.stats.yearly_sheet);
    Ok(PersonReport {
        meta: RunMeta::new(config, Some(policy), batches),
        summary,
        issues: collect_issues(batches, config.issue_limit),
        view,
        document,
    })
}

// ---------------------------------------------------------------------------
// Company statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CompanyResult {
    pub company: String,
    pub summary: StatisticsSummary,
    #[serde(skip)]
    pub view: StatisticsView,
    #[serde(skip)]
    pub document: Document,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyTotals {
    pub companies: usize,
    pub rows: usize,
    pub grand_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyReport {
    pub meta: RunMeta,
    pub totals: CompanyTotals,
    pub issues: IssueLog,
    pub companies: Vec<CompanyResult>,
}

impl CompanyReport {
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.companies.iter().map(|c| &c.document)
    }
}

/// Company workflow: one declaration document per company on the roster.
///
/// Refuses to run while ingest issues exist unless `allow_issues` is set. A roster
/// company with no records still gets a document with an empty statistics table.
pub fn run_company(
    config: &JobConfig,
    batches: &[FileBatch],
    roster: &CompanyRoster,
    allow_issues: bool,
) -> Result<CompanyReport, StatError> {
    if batches.is_empty() {
        return Err(StatError::MissingPrecondition("no source files loaded".into()));
    }
    if roster.is_empty() {
        return Err(StatError::MissingPrecondition("company roster is empty".into()));
    }
    let issues = collect_issues(batches, config.issue_limit);
    if !issues.is_empty() && !allow_issues {
        return Err(StatError::BlockedByIssues { count: issues.total() });
    }
    if record_count(batches) == 0 {
        return Err(StatError::MissingPrecondition("no enrollment records loaded".into()));
    }
    if !batches.iter().flat_map(|b| &b.records).any(|r| r.company.is_some()) {
        return Err(StatError::MissingPrecondition(format!(
            "no record carries a company; '{}' sources are not grouped by company",
            config.shape
        )));
    }

    let mut index = CompanyPersonMonthIndex::new();
    index.fold_batches(batches, roster);

    let everyone = PersonRoster::default();
    let empty = PersonMonthIndex::discovered();
    let mut companies = Vec::with_capacity(roster.len());
    for company in roster.iter() {
        let people = index.get(company).unwrap_or(&empty);
        let selection = OutputPolicy::SourceDriven.select(people, &everyone)?;
        let range = MonthRange::build(config.stats.month_columns, people.observed_months());
        let view = StatisticsView::build(&selection, range, config.stats.unit_rate);
        if view.rows.is_empty() {
            warn!("{company}: no enrollment records; exporting an empty table");
        }
        companies.push(CompanyResult {
            company: company.clone(),
            summary: view.summary(),
            document: company_document(company, &view),
            view,
        });
    }

    let totals = CompanyTotals {
        companies: companies.len(),
        rows: companies.iter().map(|c| c.summary.rows).sum(),
        grand_total: companies.iter().map(|c| c.summary.grand_total).fold(0.0, |a, b| a + b),
    };
    info!(
        "{}: {} company document(s), {} row(s), total {}",
        config.name, totals.companies, totals.rows, totals.grand_total
    );

    Ok(CompanyReport { meta: RunMeta::new(config, None, batches), totals, issues, companies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::ingest::{ingest_file, RawFile, RawSheet};

    fn sheet(name: &str, data: &[[&str; 2]]) -> RawSheet {
        let mut rows = vec![vec!["姓名".to_string(), "身份证".to_string()]];
        rows.extend(data.iter().map(|r| r.iter().map(|c| c.to_string()).collect()));
        RawSheet::new(name, rows)
    }

    fn ledger(data: &[[&str; 4]]) -> FileBatch {
        let mut rows = vec![vec!["单位".into(), "年月".into(), "姓名".into(), "身份证".into()]];
        rows.extend(data.iter().map(|r| r.iter().map(|c| c.to_string()).collect()));
        let file = RawFile { name: "ledger.xlsx".into(), sheets: vec![RawSheet::new("Sheet1", rows)] };
        ingest_file(&file, &SourceShape::CompanyLedger.profile()).unwrap()
    }

    fn monthly(sheets: Vec<RawSheet>) -> FileBatch {
        let file = RawFile { name: "monthly.xlsx".into(), sheets };
        ingest_file(&file, &SourceShape::MonthlySheets.profile()).unwrap()
    }

    #[test]
    fn person_run_roster_driven() {
        let mut config = JobConfig::for_shape(SourceShape::MonthlySheets);
        config.stats.policy = OutputPolicy::RosterDriven;
        let roster = PersonRoster::from_identities([
            Identity::new("张三", "110101"),
            Identity::new("李四", "110102"),
        ]);
        let batches = vec![monthly(vec![sheet("202301", &[["张三", "110101"]])])];

        let report = run_person(&config, &batches, &roster).unwrap();
        assert_eq!(report.view.rows.len(), 2);
        assert_eq!(report.view.rows[0].month_count, 1);
        assert_eq!(report.view.rows[0].grand_total, 650.0);
        assert_eq!(report.view.rows[1].month_count, 0);
        assert_eq!(report.view.rows[1].grand_total, 0.0);
        assert_eq!(report.document.file_name, "汇总[汇总].xlsx");
        assert_eq!(report.meta.records, 1);
    }

    #[test]
    fn person_range_includes_non_roster_months() {
        let mut config = JobConfig::for_shape(SourceShape::MonthlySheets);
        config.stats.policy = OutputPolicy::SourceDriven;
        let roster = PersonRoster::from_identities([Identity::new("张三", "110101")]);
        let batches = vec![monthly(vec![
            sheet("202301", &[["张三", "110101"]]),
            sheet("202302", &[["王五", "110103"]]),
        ])];

        let report = run_person(&config, &batches, &roster).unwrap();
        assert_eq!(report.view.rows.len(), 1);
        assert_eq!(report.view.month_range.len(), 2);
        assert_eq!(report.view.rows[0].month_flags, vec![true, false]);
    }

    #[test]
    fn person_run_without_files_is_a_precondition_error() {
        let config = JobConfig::for_shape(SourceShape::MonthlySheets);
        let err = run_person(&config, &[], &PersonRoster::default()).unwrap_err();
        assert!(matches!(err, StatError::MissingPrecondition(_)));
    }

    #[test]
    fn empty_selection_still_produces_a_document() {
        let config = JobConfig::for_shape(SourceShape::MonthlySheets);
        let roster = PersonRoster::from_identities([Identity::new("赵六", "9")]);
        let batches = vec![monthly(vec![sheet("202301", &[["张三", "110101"]])])];
        let report = run_person(&config, &batches, &roster).unwrap();
        assert_eq!(report.summary.rows, 0);
        assert_eq!(report.document.tables[0].rows.len(), 2);
    }

    #[test]
    fn company_run_builds_one_document_per_roster_company() {
        let config = JobConfig::for_shape(SourceShape::CompanyLedger);
        let batches = vec![ledger(&[
            ["甲公司", "202301", "张三", "1"],
            ["甲公司", "202302", "张三", "1"],
            ["乙公司", "202301", "李四", "2"],
            ["丙公司", "202301", "王五", "3"],
        ])];
        let roster = CompanyRoster::from_names(["甲公司", "乙公司", "丁公司"]);

        let report = run_company(&config, &batches, &roster, false).unwrap();
        let names: Vec<&str> = report.companies.iter().map(|c| c.company.as_str()).collect();
        assert_eq!(names, vec!["丁公司", "乙公司", "甲公司"]);
        assert_eq!(report.totals.rows, 2);
        assert_eq!(report.totals.grand_total, 1950.0);

        let jia = &report.companies[2];
        assert_eq!(jia.document.file_name, "甲公司[汇总].xlsx");
        assert_eq!(jia.view.month_range.len(), 2);
        assert_eq!(report.companies[0].summary.rows, 0);
        assert_eq!(report.documents().count(), 3);
    }

    #[test]
    fn company_run_blocked_by_issues() {
        let config = JobConfig::for_shape(SourceShape::CompanyLedger);
        let batches = vec![ledger(&[
            ["甲公司", "202301", "张三", "1"],
            ["甲公司", "202313", "李四", "2"],
        ])];
        let roster = CompanyRoster::from_names(["甲公司"]);

        let err = run_company(&config, &batches, &roster, false).unwrap_err();
        assert!(matches!(err, StatError::BlockedByIssues { count: 1 }));

        let report = run_company(&config, &batches, &roster, true).unwrap();
        assert_eq!(report.issues.total(), 1);
        assert_eq!(report.totals.rows, 1);
    }

    #[test]
    fn company_run_needs_a_roster() {
        let config = JobConfig::for_shape(SourceShape::CompanyLedger);
        let batches = vec![ledger(&[["甲公司", "202301", "张三", "1"]])];
        let err = run_company(&config, &batches, &CompanyRoster::default(), false).unwrap_err();
        assert!(matches!(err, StatError::MissingPrecondition(_)));
    }

    #[test]
    fn company_run_rejects_sources_without_companies() {
        let config = JobConfig::for_shape(SourceShape::MonthlySheets);
        let batches = vec![monthly(vec![sheet("202301", &[["张三", "110101"]])])];
        let roster = CompanyRoster::from_names(["甲公司"]);
        let err = run_company(&config, &batches, &roster, false).unwrap_err();
        assert!(matches!(err, StatError::MissingPrecondition(_)));
    }

    #[test]
    fn company_without_records_totals_positive_zero() {
        let config = JobConfig::for_shape(SourceShape::CompanyLedger);
        let batches = vec![ledger(&[["丙公司", "202301", "王五", "3"]])];
        let roster = CompanyRoster::from_names(["丁公司"]);
        let report = run_company(&config, &batches, &roster, false).unwrap();
        assert_eq!(report.totals.rows, 0);
        assert!(report.totals.grand_total.is_sign_positive());
        assert!(report.companies[0].summary.grand_total.is_sign_positive());
    }

    #[test]
    fn check_counts_records_and_issues() {
        let config = JobConfig::for_shape(SourceShape::CompanyLedger);
        let batches = vec![ledger(&[
            ["甲公司", "202301", "张三", "1"],
            ["甲公司", "2023", "李四", "2"],
        ])];
        let report = run_check(&config, &batches);
        assert_eq!(report.files, 1);
        assert_eq!(report.records, 1);
        assert_eq!(report.issues.total(), 1);
    }
}
