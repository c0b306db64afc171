use serde::{Deserialize, Serialize};

use crate::error::StatError;
use crate::roster::OutputPolicy;

/// Unit rate applied per enrolled month unless configured otherwise.
pub const DEFAULT_UNIT_RATE: f64 = 650.0;

/// How many ingest issues are kept for display.
pub const DEFAULT_ISSUE_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Top-level job config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Label used in output file names (`{name}[汇总].xlsx`).
    #[serde(default = "default_name")]
    pub name: String,
    pub shape: SourceShape,
    #[serde(default)]
    pub profile: Option<ProfileOverride>,
    #[serde(default)]
    pub roster: RosterLayout,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default = "default_issue_limit")]
    pub issue_limit: usize,
}

fn default_name() -> String {
    "汇总".into()
}

fn default_issue_limit() -> usize {
    DEFAULT_ISSUE_LIMIT
}

// ---------------------------------------------------------------------------
// Source shapes and ingest profiles
// ---------------------------------------------------------------------------

/// Known layouts of enrollment source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    /// One sheet per month; sheet name is the month token; columns name, id.
    MonthlySheets,
    /// Older monthly export: three header rows, blanks stripped from names.
    LegacyMonthlySheets,
    /// One row per (company, month, person).
    CompanyLedger,
}

impl SourceShape {
    pub fn profile(self) -> IngestProfile {
        match self {
            Self::MonthlySheets => IngestProfile {
                month_source: MonthSource::SheetName,
                columns: ColumnLayout { company: None, month: None, name: 0, id: 1 },
                header_rows: 1,
                name_normalization: NameNormalization::Trim,
            },
            Self::LegacyMonthlySheets => IngestProfile {
                header_rows: 3,
                name_normalization: NameNormalization::StripBlanks,
                ..Self::MonthlySheets.profile()
            },
            Self::CompanyLedger => IngestProfile {
                month_source: MonthSource::Column,
                columns: ColumnLayout { company: Some(0), month: Some(1), name: 2, id: 3 },
                header_rows: 1,
                name_normalization: NameNormalization::Trim,
            },
        }
    }
}

impl std::fmt::Display for SourceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthlySheets => write!(f, "monthly_sheets"),
            Self::LegacyMonthlySheets => write!(f, "legacy_monthly_sheets"),
            Self::CompanyLedger => write!(f, "company_ledger"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSource {
    SheetName,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameNormalization {
    /// Trim leading/trailing whitespace only.
    Trim,
    /// Trim, then drop every whitespace character inside the name.
    StripBlanks,
}

impl NameNormalization {
    pub fn apply(self, raw: &str) -> String {
        match self {
            Self::Trim => raw.trim().to_string(),
            Self::StripBlanks => raw.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }
}

/// Zero-based column positions within a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnLayout {
    #[serde(default)]
    pub company: Option<usize>,
    #[serde(default)]
    pub month: Option<usize>,
    pub name: usize,
    pub id: usize,
}

impl ColumnLayout {
    fn positions(&self) -> Vec<usize> {
        [self.company, self.month, Some(self.name), Some(self.id)]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestProfile {
    pub month_source: MonthSource,
    pub columns: ColumnLayout,
    pub header_rows: usize,
    pub name_normalization: NameNormalization,
}

impl IngestProfile {
    pub fn is_company_grouped(&self) -> bool {
        self.columns.company.is_some()
    }
}

/// Per-field overrides of a shape's default profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileOverride {
    #[serde(default)]
    pub month_source: Option<MonthSource>,
    #[serde(default)]
    pub columns: Option<ColumnLayout>,
    #[serde(default)]
    pub header_rows: Option<usize>,
    #[serde(default)]
    pub name_normalization: Option<NameNormalization>,
}

// ---------------------------------------------------------------------------
// Roster + stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RosterLayout {
    #[serde(default = "default_roster_header_rows")]
    pub header_rows: usize,
}

fn default_roster_header_rows() -> usize {
    1
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self { header_rows: default_roster_header_rows() }
    }
}

/// Which months become columns of the statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthColumns {
    /// Every distinct month observed in the data.
    #[default]
    Observed,
    /// Every calendar month from the first to the last observed month.
    Contiguous,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_unit_rate")]
    pub unit_rate: f64,
    #[serde(default)]
    pub month_columns: MonthColumns,
    #[serde(default)]
    pub policy: OutputPolicy,
    #[serde(default)]
    pub yearly_sheet: bool,
}

fn default_unit_rate() -> f64 {
    DEFAULT_UNIT_RATE
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            unit_rate: DEFAULT_UNIT_RATE,
            month_columns: MonthColumns::default(),
            policy: OutputPolicy::default(),
            yearly_sheet: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl JobConfig {
    /// Built-in defaults for a shape, used when no config file is given.
    pub fn for_shape(shape: SourceShape) -> Self {
        Self {
            name: default_name(),
            shape,
            profile: None,
            roster: RosterLayout::default(),
            stats: StatsConfig::default(),
            issue_limit: DEFAULT_ISSUE_LIMIT,
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, StatError> {
        let config: JobConfig =
            toml::from_str(input).map_err(|e| StatError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The shape's default profile with any `[profile]` overrides applied.
    pub fn ingest_profile(&self) -> IngestProfile {
        let mut profile = self.shape.profile();
        if let Some(ref o) = self.profile {
            if let Some(month_source) = o.month_source {
                profile.month_source = month_source;
            }
            if let Some(columns) = o.columns {
                profile.columns = columns;
            }
            if let Some(header_rows) = o.header_rows {
                profile.header_rows = header_rows;
            }
            if let Some(name_normalization) = o.name_normalization {
                profile.name_normalization = name_normalization;
            }
        }
        profile
    }

    pub fn validate(&self) -> Result<(), StatError> {
        if !self.stats.unit_rate.is_finite() || self.stats.unit_rate < 0.0 {
            return Err(StatError::ConfigValidation(format!(
                "unit_rate must be a non-negative number, got {}",
                self.stats.unit_rate
            )));
        }

        if self.issue_limit == 0 {
            return Err(StatError::ConfigValidation("issue_limit must be at least 1".into()));
        }

        let profile = self.ingest_profile();

        let mut positions = profile.columns.positions();
        let count = positions.len();
        positions.sort_unstable();
        positions.dedup();
        if positions.len() != count {
            return Err(StatError::ConfigValidation(
                "column positions must be distinct".into(),
            ));
        }

        if profile.month_source == MonthSource::Column && profile.columns.month.is_none() {
            return Err(StatError::ConfigValidation(
                "month_source = \"column\" requires columns.month".into(),
            ));
        }

        if self.shape == SourceShape::CompanyLedger && profile.columns.company.is_none() {
            return Err(StatError::ConfigValidation(
                "company_ledger shape requires columns.company".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
