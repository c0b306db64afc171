// Delimited-text sources

use insurstat_core::{RawFile, RawSheet};

use crate::error::IoError;

/// Decode a delimited-text file into a single-sheet [`RawFile`].
///
/// The sheet is named after the file stem, so `202301.csv` reads like a workbook sheet
/// named `202301`.
pub fn read_csv(name: &str, bytes: &[u8]) -> Result<RawFile, IoError> {
    let content = decode_text(bytes);
    let delimiter = sniff_delimiter(&content);
    let rows = parse_rows(name, &content, delimiter)?;
    Ok(RawFile { name: name.to_string(), sheets: vec![RawSheet::new(file_stem(name), rows)] })
}

fn file_stem(name: &str) -> &str {
    std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// UTF-8 (BOM stripped) when valid, otherwise GB18030, the usual encoding of
/// spreadsheet exports on Chinese-locale systems.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::GB18030.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn parse_rows(name: &str, content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::Decode { file: name.into(), message: e.to_string() })?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "姓名;身份证号\n张三;110101\n李四;110102\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "单位,年月,姓名,身份证号\n甲公司,202301,张三,110101\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "姓名\t身份证号\n张三\t110101\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "单位;姓名;身份证号\n\"甲公司, 分部\";张三;110101\n乙公司;李四;110102\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sheet_named_after_file_stem() {
        let file = read_csv("202301.csv", "姓名,身份证号\n张三,110101\n".as_bytes()).unwrap();
        assert_eq!(file.name, "202301.csv");
        assert_eq!(file.sheets.len(), 1);
        assert_eq!(file.sheets[0].name, "202301");
        assert_eq!(file.sheets[0].rows[1], vec!["张三".to_string(), "110101".to_string()]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice("姓名,身份证号\n".as_bytes());
        let file = read_csv("a.csv", &bytes).unwrap();
        assert_eq!(file.sheets[0].rows[0][0], "姓名");
    }

    #[test]
    fn test_gb18030_fallback() {
        let (encoded, _, _) = encoding_rs::GB18030.encode("姓名,身份证号\n张三,110101\n");
        let file = read_csv("legacy.csv", &encoded).unwrap();
        assert_eq!(file.sheets[0].rows[1][0], "张三");
    }
}
