// Zip bundling of rendered documents

use std::io::{Cursor, Write};
use std::path::Path;

use insurstat_core::Document;
use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::IoError;
use crate::xlsx::write_document;

/// Pack `(entry name, bytes)` pairs into a zip archive, in the given order.
pub fn pack<N: AsRef<str>>(entries: &[(N, Vec<u8>)]) -> Result<Vec<u8>, IoError> {
    let archive_err = |e: &dyn std::fmt::Display| IoError::Archive(e.to_string());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer.start_file(name.as_ref(), options).map_err(|e| archive_err(&e))?;
        writer.write_all(bytes).map_err(|e| archive_err(&e))?;
    }

    let cursor = writer.finish().map_err(|e| archive_err(&e))?;
    Ok(cursor.into_inner())
}

/// Render every document to xlsx and bundle them, one entry per document file name.
pub fn bundle_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Result<Vec<u8>, IoError> {
    let mut entries = Vec::new();
    for document in documents {
        entries.push((document.file_name.clone(), write_document(document)?));
    }
    debug!("bundling {} document(s)", entries.len());
    pack(&entries)
}

/// Write bytes to `path`, creating parent directories as needed.
pub fn save_bytes(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::write(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| IoError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use insurstat_core::{Cell, Table};
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn document(company: &str) -> Document {
        Document {
            file_name: format!("{company}[汇总].xlsx"),
            tables: vec![Table { name: "个人统计".into(), rows: vec![vec![Cell::text("序号")]] }],
        }
    }

    #[test]
    fn test_pack_preserves_order_and_content() {
        let bytes = pack(&[("b.txt", b"second".to_vec()), ("a.txt", b"first".to_vec())]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "b.txt");

        let mut content = String::new();
        archive.by_name("a.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "first");
    }

    #[test]
    fn test_bundle_uses_document_names() {
        let docs = [document("甲公司"), document("乙公司")];
        let bytes = bundle_documents(&docs).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"甲公司[汇总].xlsx"));
        assert!(names.contains(&"乙公司[汇总].xlsx"));
    }

    #[test]
    fn test_save_bytes_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("汇总.zip");
        save_bytes(&path, b"zip").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"zip");
    }
}
