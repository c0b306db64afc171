use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum IoError {
    /// Reading a source file from disk failed.
    Read { path: PathBuf, message: String },
    /// The file extension is not a known spreadsheet or delimited-text format.
    UnsupportedFormat { path: PathBuf },
    /// The bytes could not be decoded as a workbook or delimited text.
    Decode { file: String, message: String },
    /// Building a spreadsheet document failed.
    Encode { file: String, message: String },
    /// Building the archive failed.
    Archive(String),
    /// Writing output to disk failed.
    Write { path: PathBuf, message: String },
    /// A background read task panicked or was cancelled.
    Task(String),
}

impl IoError {
    pub(crate) fn read(path: &Path, err: impl fmt::Display) -> Self {
        Self::Read { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write { path: path.to_path_buf(), message: err.to_string() }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::UnsupportedFormat { path } => {
                write!(f, "unsupported file type: {}", path.display())
            }
            Self::Decode { file, message } => write!(f, "cannot decode '{file}': {message}"),
            Self::Encode { file, message } => write!(f, "cannot build '{file}': {message}"),
            Self::Archive(msg) => write!(f, "archive error: {msg}"),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Task(msg) => write!(f, "load task failed: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
