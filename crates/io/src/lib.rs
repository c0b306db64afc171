//! `insurstat-io`: spreadsheet, delimited-text and archive I/O for the statistics engine.
//!
//! Readers turn files into [`RawFile`](insurstat_core::RawFile)s; writers turn
//! [`Document`](insurstat_core::Document)s into xlsx bytes and bundle them into zip archives.

pub mod archive;
pub mod csv;
pub mod error;
pub mod loader;
pub mod xlsx;

pub use error::IoError;
pub use loader::{load_sources, read_source};
