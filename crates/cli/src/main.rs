// insurstat CLI - enrollment statistics from monthly social-insurance sheets

mod check;
mod company;
mod exit_codes;
mod job;
mod person;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use insurstat_core::{OutputPolicy, SourceShape, StatError};
use insurstat_io::IoError;

use exit_codes::{io_exit_code, stat_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "insurstat")]
#[command(about = "Social-insurance enrollment statistics and declaration workbooks")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-person statistics workbook from monthly enrollment sheets
    #[command(after_help = "\
Examples:
  insurstat person 2023.xlsx --roster staff.xlsx
  insurstat person 2023.xlsx 2024.xlsx --roster staff.xlsx --policy roster-driven --yearly
  insurstat person 202301.csv 202302.csv --label 甲公司 --out out/甲公司.xlsx
  insurstat person old.xls --shape legacy-monthly-sheets --unit-rate 700 --json")]
    Person {
        #[command(flatten)]
        job: JobArgs,

        /// Person roster (first sheet, columns name and id)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Which rows appear in the output
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Label used in the output file name
        #[arg(long)]
        label: Option<String>,

        /// Output workbook (default: {label}[汇总].xlsx in the output directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Add a per-year subtotal sheet
        #[arg(long)]
        yearly: bool,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Per-company declaration workbooks bundled into one zip archive
    #[command(after_help = "\
Examples:
  insurstat company ledger.xlsx --companies companies.xlsx
  insurstat company ledger.xlsx --companies companies.xlsx --out out/汇总.zip
  insurstat company ledger.xlsx --companies companies.xlsx --allow-issues --json")]
    Company {
        #[command(flatten)]
        job: JobArgs,

        /// Company roster (first sheet, column A)
        #[arg(long)]
        companies: PathBuf,

        /// Output archive (default: 汇总.zip in the output directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Export even though some source rows were rejected
        #[arg(long)]
        allow_issues: bool,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Ingest sources and report malformed rows without exporting
    #[command(after_help = "\
Examples:
  insurstat check 2023.xlsx
  insurstat check ledger.xlsx --shape company-ledger --json")]
    Check {
        #[command(flatten)]
        job: JobArgs,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by every subcommand that reads sources.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Source files (xlsx, xls, xlsb, ods, csv)
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Job config (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Source layout (overrides the job config)
    #[arg(long, value_enum)]
    pub shape: Option<ShapeArg>,

    /// Amount per enrolled month (overrides config and settings)
    #[arg(long)]
    pub unit_rate: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ShapeArg {
    MonthlySheets,
    LegacyMonthlySheets,
    CompanyLedger,
}

impl From<ShapeArg> for SourceShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::MonthlySheets => SourceShape::MonthlySheets,
            ShapeArg::LegacyMonthlySheets => SourceShape::LegacyMonthlySheets,
            ShapeArg::CompanyLedger => SourceShape::CompanyLedger,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolicyArg {
    /// One row per roster member, including members with no months
    RosterDriven,
    /// One row per enrolled person who passes the roster
    SourceDriven,
}

impl From<PolicyArg> for OutputPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RosterDriven => OutputPolicy::RosterDriven,
            PolicyArg::SourceDriven => OutputPolicy::SourceDriven,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  insurstat-core ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Person { job, roster, policy, label, out, yearly, json } => {
            person::cmd_person(job, roster, policy, label, out, yearly, json)
        }
        Commands::Company { job, companies, out, allow_issues, json } => {
            company::cmd_company(job, companies, out, allow_issues, json)
        }
        Commands::Check { job, json } => check::cmd_check(job, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StatError> for CliError {
    fn from(err: StatError) -> Self {
        let hint = match &err {
            StatError::BlockedByIssues { .. } => {
                Some("fix the listed rows, or pass --allow-issues to export anyway".to_string())
            }
            StatError::MissingPrecondition(_) => Some("check the roster and source files".to_string()),
            _ => None,
        };
        Self { code: stat_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self::new(io_exit_code(&err), err.to_string())
    }
}
