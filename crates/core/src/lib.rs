//! `insurstat-core`: Enrollment statistics engine.
//!
//! Pure engine crate: receives pre-read sheets, returns statistics and export tables.
//! No CLI or IO dependencies.

pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod index;
pub mod ingest;
pub mod month;
pub mod roster;
pub mod session;
pub mod stats;
pub mod workflow;

pub use config::{JobConfig, SourceShape};
pub use error::StatError;
pub use export::{Cell, Document, Table};
pub use identity::Identity;
pub use ingest::{FileBatch, RawFile, RawSheet};
pub use month::Month;
pub use roster::{CompanyRoster, OutputPolicy, PersonRoster};
pub use session::LoadSession;
pub use workflow::{run_check, run_company, run_person};
