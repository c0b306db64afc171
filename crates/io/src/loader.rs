// Source file loading, sequential and concurrent

use std::path::{Path, PathBuf};

use futures::future::join_all;
use insurstat_core::RawFile;
use log::{debug, info};

use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Delimited,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Workbook),
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            _ => None,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Decode already-read bytes according to the file's extension.
pub fn decode_source(path: &Path, bytes: Vec<u8>) -> Result<RawFile, IoError> {
    let name = display_name(path);
    match SourceFormat::from_path(path) {
        Some(SourceFormat::Workbook) => crate::xlsx::read_workbook(&name, bytes),
        Some(SourceFormat::Delimited) => crate::csv::read_csv(&name, &bytes),
        None => Err(IoError::UnsupportedFormat { path: path.to_path_buf() }),
    }
}

/// Read and decode one source file.
pub fn read_source(path: &Path) -> Result<RawFile, IoError> {
    if SourceFormat::from_path(path).is_none() {
        return Err(IoError::UnsupportedFormat { path: path.to_path_buf() });
    }
    let bytes = std::fs::read(path).map_err(|e| IoError::read(path, e))?;
    decode_source(path, bytes)
}

/// Read and decode several files concurrently.
///
/// Reads go through `tokio::fs`; decoding runs on the blocking pool. Results come back in
/// input order, one per path, so a failing file does not hide the others.
pub async fn load_sources(paths: &[PathBuf]) -> Vec<Result<RawFile, IoError>> {
    let results = join_all(paths.iter().cloned().map(load_one)).await;
    let ok = results.iter().filter(|r| r.is_ok()).count();
    info!("loaded {ok}/{} source file(s)", results.len());
    results
}

async fn load_one(path: PathBuf) -> Result<RawFile, IoError> {
    if SourceFormat::from_path(&path).is_none() {
        return Err(IoError::UnsupportedFormat { path });
    }
    let bytes = tokio::fs::read(&path).await.map_err(|e| IoError::read(&path, e))?;
    debug!("read {} ({} bytes)", path.display(), bytes.len());
    tokio::task::spawn_blocking(move || decode_source(&path, bytes))
        .await
        .map_err(|e| IoError::Task(e.to_string()))?
}
