//! Raw sheet rows → typed enrollment records.
//!
//! Ingestion is best-effort per row: a malformed row becomes an [`IngestIssue`] and the
//! rest of the sheet keeps going. A file only fails as a whole when nothing in it is
//! readable.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::config::{IngestProfile, MonthSource};
use crate::error::StatError;
use crate::identity::{Identity, KEY_SEPARATOR};
use crate::month::Month;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One sheet as delivered by the spreadsheet reader. Blank cells are empty strings.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// One source file: its display name plus its sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct RawFile {
    pub name: String,
    pub sheets: Vec<RawSheet>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), rows }
    }

    /// Rows after the first `header_rows`, paired with their 1-based sheet row number.
    pub fn data_rows(&self, header_rows: usize) -> impl Iterator<Item = (usize, &[String])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(header_rows)
            .map(|(i, row)| (i + 1, row.as_slice()))
    }
}

pub(crate) fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Records + issues
// ---------------------------------------------------------------------------

/// Where a record or issue came from. `row` is absent for sheet-level issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOrigin {
    pub file: String,
    pub sheet: String,
    pub row: Option<usize>,
}

impl fmt::Display for RowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} / sheet '{}' / row {}", self.file, self.sheet, row),
            None => write!(f, "{} / sheet '{}'", self.file, self.sheet),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub company: Option<String>,
    pub month: Month,
    pub identity: Identity,
    pub origin: RowOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidMonth,
    MissingName,
    MissingId,
    MissingCompany,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMonth => write!(f, "invalid month token"),
            Self::MissingName => write!(f, "missing name"),
            Self::MissingId => write!(f, "missing id"),
            Self::MissingCompany => write!(f, "missing company"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestIssue {
    pub origin: RowOrigin,
    pub kind: IssueKind,
    pub value: String,
}

impl fmt::Display for IngestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} '{}'", self.origin, self.kind, self.value)
    }
}

/// Issues kept for display, capped at `limit`; `total` counts every issue seen.
#[derive(Debug, Clone, Serialize)]
pub struct IssueLog {
    issues: Vec<IngestIssue>,
    total: usize,
    limit: usize,
}

impl IssueLog {
    pub fn new(limit: usize) -> Self {
        Self { issues: Vec::new(), total: 0, limit }
    }

    pub fn push(&mut self, issue: IngestIssue) {
        self.total += 1;
        if self.issues.len() < self.limit {
            self.issues.push(issue);
        }
    }

    pub fn extend<'a>(&mut self, issues: impl IntoIterator<Item = &'a IngestIssue>) {
        for issue in issues {
            self.push(issue.clone());
        }
    }

    pub fn shown(&self) -> &[IngestIssue] {
        &self.issues
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.total > self.issues.len()
    }
}

/// Everything ingested from one file. Immutable once built.
#[derive(Debug, Clone)]
pub struct FileBatch {
    pub file: String,
    pub records: Vec<EnrollmentRecord>,
    pub issues: Vec<IngestIssue>,
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Ingest every sheet of a file under `profile`.
pub fn ingest_file(file: &RawFile, profile: &IngestProfile) -> Result<FileBatch, StatError> {
    if file.sheets.is_empty() {
        return Err(StatError::EmptyFile { file: file.name.clone() });
    }

    let mut records = Vec::new();
    let mut issues = Vec::new();
    for sheet in &file.sheets {
        ingest_sheet(&file.name, sheet, profile, &mut records, &mut issues);
    }

    if records.is_empty() && !issues.is_empty() {
        return Err(StatError::NoReadableRows { file: file.name.clone(), issues });
    }
    if records.is_empty() {
        warn!("{}: no enrollment rows found", file.name);
    }

    debug!("{}: {} record(s), {} issue(s)", file.name, records.len(), issues.len());
    Ok(FileBatch { file: file.name.clone(), records, issues })
}

/// Ingest one sheet, appending to `records` and `issues`.
pub fn ingest_sheet(
    file: &str,
    sheet: &RawSheet,
    profile: &IngestProfile,
    records: &mut Vec<EnrollmentRecord>,
    issues: &mut Vec<IngestIssue>,
) {
    let sheet_month = match profile.month_source {
        MonthSource::SheetName => {
            let token = sheet.name.trim();
            match Month::parse(token) {
                Ok(m) => Some(m),
                Err(_) => {
                    warn!("{file}: skipping sheet '{}' (name is not a month token)", sheet.name);
                    issues.push(IngestIssue {
                        origin: RowOrigin { file: file.into(), sheet: sheet.name.clone(), row: None },
                        kind: IssueKind::InvalidMonth,
                        value: token.into(),
                    });
                    return;
                }
            }
        }
        MonthSource::Column => None,
    };

    let cols = &profile.columns;
    for (row_number, row) in sheet.data_rows(profile.header_rows) {
        let origin = || RowOrigin {
            file: file.into(),
            sheet: sheet.name.clone(),
            row: Some(row_number),
        };

        let name = profile.name_normalization.apply(cell(row, cols.name));
        let id = cell(row, cols.id).to_string();
        let company = cols.company.map(|c| cell(row, c).to_string());
        let month_token = cols.month.map(|c| cell(row, c));

        // Fully blank rows (typically trailing) carry no information.
        let blank = name.is_empty()
            && id.is_empty()
            && company.as_deref().map_or(true, str::is_empty)
            && month_token.map_or(true, str::is_empty);
        if blank {
            continue;
        }

        let month = match sheet_month {
            Some(m) => m,
            None => {
                let token = month_token.unwrap_or("");
                match Month::parse(token) {
                    Ok(m) => m,
                    Err(_) => {
                        issues.push(IngestIssue {
                            origin: origin(),
                            kind: IssueKind::InvalidMonth,
                            value: token.into(),
                        });
                        continue;
                    }
                }
            }
        };

        if name.is_empty() {
            issues.push(IngestIssue { origin: origin(), kind: IssueKind::MissingName, value: id });
            continue;
        }
        if id.is_empty() {
            issues.push(IngestIssue { origin: origin(), kind: IssueKind::MissingId, value: name });
            continue;
        }
        if let Some(ref c) = company {
            if c.is_empty() {
                issues.push(IngestIssue {
                    origin: origin(),
                    kind: IssueKind::MissingCompany,
                    value: Identity::new(name, id).canonical_key(),
                });
                continue;
            }
        }

        let identity = Identity::new(name, id);
        if identity.is_key_ambiguous() {
            warn!("{}: '{identity}' contains '{KEY_SEPARATOR}'; its display key does not split back", origin());
        }
        records.push(EnrollmentRecord { company, month, identity, origin: origin() });
    }
}

/// Ingest several files; files that fail as a whole are returned alongside the batches.
pub fn ingest_files<'a>(
    files: impl IntoIterator<Item = &'a RawFile>,
    profile: &IngestProfile,
) -> (Vec<FileBatch>, Vec<StatError>) {
    let mut batches = Vec::new();
    let mut failures = Vec::new();
    for file in files {
        match ingest_file(file, profile) {
            Ok(batch) => batches.push(batch),
            Err(e) => failures.push(e),
        }
    }
    (batches, failures)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
