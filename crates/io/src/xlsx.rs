// Excel import (xlsx, xls, xlsb, ods) and xlsx export

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Days, NaiveDate};
use insurstat_core::{Cell, Document, Month, RawFile, RawSheet, Table};
use log::debug;
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet, XlsxError};

use crate::error::IoError;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Decode workbook bytes into sheets of text cells.
///
/// Cell positions are absolute: if a sheet's data does not start at A1 the leading rows and
/// columns are filled with empty strings, so configured column indexes keep their meaning.
pub fn read_workbook(name: &str, bytes: Vec<u8>) -> Result<RawFile, IoError> {
    let decode_err = |e: &dyn std::fmt::Display| IoError::Decode { file: name.into(), message: e.to_string() };

    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| decode_err(&e))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| decode_err(&e))?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            rows.push(cells);
        }

        debug!("{name}: sheet '{sheet_name}' has {} row(s)", rows.len());
        sheets.push(RawSheet::new(sheet_name.clone(), rows));
    }

    Ok(RawFile { name: name.to_string(), sheets })
}

/// Render one calamine cell as text.
///
/// Whole floats print without decimals (ids and month tokens are often stored as numbers);
/// date cells become their `YYYYMM` month token.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => serial_to_month(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}

/// Excel 1900-system serial date → `YYYYMM`.
fn serial_to_month(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_days(Days::new(serial.trunc() as u64))?;
    Some(Month::from_date(date).canonical())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Render a document to xlsx bytes, one worksheet per table.
pub fn write_document(document: &Document) -> Result<Vec<u8>, IoError> {
    let encode_err = |e: XlsxError| IoError::Encode { file: document.file_name.clone(), message: e.to_string() };

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    for table in &document.tables {
        let worksheet = workbook.add_worksheet().set_name(&table.name).map_err(encode_err)?;
        write_table(worksheet, table, &header).map_err(encode_err)?;
    }
    workbook.save_to_buffer().map_err(encode_err)
}

fn write_table(worksheet: &mut Worksheet, table: &Table, header: &Format) -> Result<(), XlsxError> {
    for (r, row) in table.rows.iter().enumerate() {
        let row32 = r as u32;
        for (c, cell) in row.iter().enumerate() {
            let col16 = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text { text } if r == 0 => {
                    worksheet.write_string_with_format(row32, col16, text, header)?;
                }
                Cell::Text { text } => {
                    worksheet.write_string(row32, col16, text)?;
                }
                Cell::Number { value } => {
                    worksheet.write_number(row32, col16, *value)?;
                }
                Cell::Formula { expr, value } => {
                    let formula = Formula::new(expr).set_result(format_result(*value));
                    worksheet.write_formula(row32, col16, formula)?;
                }
            }
        }
    }
    worksheet.autofit();
    Ok(())
}

fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Xlsx;
    use tempfile::tempdir;

    fn document() -> Document {
        Document {
            file_name: "甲公司[汇总].xlsx".into(),
            tables: vec![Table {
                name: "个人统计".into(),
                rows: vec![
                    vec![Cell::text("序号"), Cell::text("姓名"), Cell::text("202301")],
                    vec![Cell::number(1.0), Cell::text("张三"), Cell::number(650.0)],
                    vec![Cell::text("合计"), Cell::Empty, Cell::formula("SUM(C2:C2)", 650.0)],
                ],
            }],
        }
    }

    #[test]
    fn test_written_document_reads_back() {
        let bytes = write_document(&document()).unwrap();
        let file = read_workbook("甲公司[汇总].xlsx", bytes).unwrap();
        assert_eq!(file.sheets.len(), 1);
        let sheet = &file.sheets[0];
        assert_eq!(sheet.name, "个人统计");
        assert_eq!(sheet.rows[0], vec!["序号", "姓名", "202301"]);
        assert_eq!(sheet.rows[1], vec!["1", "张三", "650"]);
        assert_eq!(sheet.rows[2][0], "合计");
    }

    #[test]
    fn test_formulas_are_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("甲公司[汇总].xlsx");
        std::fs::write(&path, write_document(&document()).unwrap()).unwrap();

        let mut workbook: Xlsx<_> = calamine::open_workbook(&path).unwrap();
        let formulas = workbook.worksheet_formula("个人统计").unwrap();
        let found: Vec<&String> = formulas.used_cells().map(|(_, _, f)| f).collect();
        assert_eq!(found, vec!["SUM(C2:C2)"]);
    }

    #[test]
    fn test_leading_offset_is_padded() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet().set_name("202301").unwrap();
        sheet.write_string(1, 1, "张三").unwrap();
        sheet.write_number(1, 2, 110101.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let file = read_workbook("offset.xlsx", bytes).unwrap();
        let rows = &file.sheets[0].rows;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_empty());
        assert_eq!(rows[1], vec!["", "张三", "110101"]);
    }

    #[test]
    fn test_serial_dates_become_month_tokens() {
        // 2023-01-15
        assert_eq!(serial_to_month(44941.0).as_deref(), Some("202301"));
        assert_eq!(serial_to_month(0.0), None);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = read_workbook("junk.xlsx", b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, IoError::Decode { .. }));
    }
}
