//! Statistics → row-oriented tables ready for a spreadsheet writer.
//!
//! Everything here is pure. Count and total cells are emitted as formulas so that edits
//! made later in the destination spreadsheet keep the totals consistent; each formula
//! also carries the value it evaluates to, for readers that do not recalculate.

use serde::Serialize;

use crate::stats::StatisticsView;

/// Archive that bundles the per-company documents.
pub const ARCHIVE_NAME: &str = "汇总.zip";

pub const STATISTICS_SHEET: &str = "个人统计";
pub const YEARLY_SHEET: &str = "年度统计";
pub const TEMPLATE_SHEET: &str = "填入模板信息";
pub const ID_TYPE_SHEET: &str = "身份证件类型代码";
pub const CATEGORY_SHEET: &str = "类型代码";

/// Fixed columns of the statistics table.
const STATISTICS_HEADER: [&str; 9] = [
    "序号",
    "姓名",
    "身份证号",
    "证件编号",
    "证件类型",
    "开始参保年月",
    "结束参保年月",
    "参保总月数",
    "合计",
];
const MONTH_COUNT_COL: usize = 7;
const GRAND_TOTAL_COL: usize = 8;
const FIRST_MONTH_COL: usize = 9;

const TEMPLATE_CODES: [&str; 7] = ["xh", "lyrxm", "sfzjlxDm", "sfzjhm", "jycyzbh", "lxDm", "zbqygzsj"];
const TEMPLATE_LABELS: [&str; 7] = [
    "*序号",
    "*招用人姓名",
    "*身份证件类型",
    "*身份证件号码",
    "证件编号",
    "*类型(1)(2)(3)(4)",
    "*在本企业工作时间（月）",
];
const TEMPLATE_END: &str = "结束标志";

const ID_TYPES: [(&str, &str, &str); 33] = [
    ("227", "中国护照", "200"),
    ("228", "城镇退役士兵自谋职业证", "200"),
    ("100", "单位", ""),
    ("101", "组织机构代码证", "100"),
    ("199", "其他证件", "100"),
    ("200", "个人", ""),
    ("201", "居民身份证", "200"),
    ("202", "军官证", "200"),
    ("203", "武警警官证", "200"),
    ("204", "士兵证", "200"),
    ("205", "军队离退休干部证", "200"),
    ("206", "残疾人证", "200"),
    ("207", "残疾军人证（1-8级）", "200"),
    ("208", "外国护照", "200"),
    ("209", "港澳同胞回乡证", "200"),
    ("210", "港澳居民来往内地通行证", "200"),
    ("211", "台胞证", "200"),
    ("212", "中华人民共和国往来港澳通行证", "200"),
    ("213", "台湾居民来往大陆通行证", "200"),
    ("214", "大陆居民往来台湾通行证", "200"),
    ("215", "外国人居留证", "200"),
    ("216", "外交官证", "200"),
    ("217", "领事馆证", "200"),
    ("218", "海员证", "200"),
    ("219", "香港身份证", "200"),
    ("220", "台湾身份证", "200"),
    ("221", "澳门身份证", "200"),
    ("222", "外国人身份证件", "200"),
    ("223", "高校毕业生自主创业证", "200"),
    ("224", "就业失业登记证", "200"),
    ("225", "退休证", "200"),
    ("226", "离休证", "200"),
    ("299", "其他个人证件", "200"),
];

const CATEGORIES: [(&str, &str); 4] = [
    ("01", "在人力资源社会保障部门公共就业服务机构登记失业半年以上人员"),
    ("02", "零就业家庭、享受城市居民最低生活保障家庭劳动年龄内的登记失业人员"),
    ("03", "毕业年度内高校毕业生"),
    ("04", "纳入全国扶贫开发信息系统的农村建档立卡贫困人员"),
];

// ---------------------------------------------------------------------------
// Column addressing
// ---------------------------------------------------------------------------

/// Convert column index to spreadsheet column letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Inverse of [`column_letter`]. Accepts upper-case letters only.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add((b - b'A') as usize + 1)?;
    }
    Some(n - 1)
}

/// A1-style reference; `row` is 1-based.
pub fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{}", column_letter(col), row)
}

fn range_ref(first_col: usize, first_row: usize, last_col: usize, last_row: usize) -> String {
    format!("{}:{}", cell_ref(first_col, first_row), cell_ref(last_col, last_row))
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Text { text: String },
    Number { value: f64 },
    /// Numeric formula without the leading `=`, plus its current value.
    Formula { expr: String, value: f64 },
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    pub fn number(value: f64) -> Self {
        Self::Number { value }
    }

    pub fn formula(expr: impl Into<String>, value: f64) -> Self {
        Self::Formula { expr: expr.into(), value }
    }

    /// The numeric value a spreadsheet would show, if any.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number { value } | Self::Formula { value, .. } => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    fn from_text(name: &str, rows: Vec<Vec<&str>>) -> Self {
        Self {
            name: name.into(),
            rows: rows.into_iter().map(|r| r.into_iter().map(Cell::text).collect()).collect(),
        }
    }
}

/// One workbook: a file name and its sheets in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub file_name: String,
    pub tables: Vec<Table>,
}

pub fn document_file_name(label: &str) -> String {
    format!("{label}[汇总].xlsx")
}

/// Row sum formula over columns `first..=last` of one row, or `0` if the block is empty.
fn row_formula(func: &str, first: usize, width: usize, row: usize, value: f64) -> Cell {
    if width == 0 {
        return Cell::formula("0", 0.0);
    }
    Cell::formula(format!("{func}({})", range_ref(first, row, first + width - 1, row)), value)
}

/// Column sum over data rows `2..=last_row`, or `0` when there are no data rows.
fn column_total(col: usize, data_rows: usize, value: f64) -> Cell {
    if data_rows == 0 {
        return Cell::formula("0", 0.0);
    }
    Cell::formula(format!("SUM({})", range_ref(col, 2, col, data_rows + 1)), value)
}

// ---------------------------------------------------------------------------
// Statistics table
// ---------------------------------------------------------------------------

/// `个人统计`: one row per identity, month columns from the view's range, totals row.
pub fn statistics_table(view: &StatisticsView) -> Table {
    let months = view.month_range.months();
    let width = months.len();
    let rate = view.unit_rate;

    let mut header: Vec<Cell> = STATISTICS_HEADER.iter().map(|h| Cell::text(*h)).collect();
    header.extend(months.iter().map(|m| Cell::text(m.canonical())));

    let mut rows = vec![header];
    for (i, stat) in view.rows.iter().enumerate() {
        let sheet_row = i + 2;
        let enrolled = stat.month_flags.iter().filter(|&&f| f).count() as f64;

        let mut row = vec![
            Cell::number((i + 1) as f64),
            Cell::text(stat.identity.name.clone()),
            Cell::text(stat.identity.id.clone()),
            Cell::Empty,
            Cell::Empty,
            stat.first_month.map_or(Cell::Empty, |m| Cell::text(m.localized())),
            stat.last_month.map_or(Cell::Empty, |m| Cell::text(m.localized())),
            row_formula("COUNTA", FIRST_MONTH_COL, width, sheet_row, enrolled),
            row_formula("SUM", FIRST_MONTH_COL, width, sheet_row, enrolled * rate),
        ];
        row.extend(
            stat.month_flags
                .iter()
                .map(|&f| if f { Cell::number(rate) } else { Cell::Empty }),
        );
        rows.push(row);
    }

    let n = view.rows.len();
    let summary = view.summary();
    let mut totals = vec![Cell::text("合计")];
    totals.extend(std::iter::repeat(Cell::Empty).take(MONTH_COUNT_COL - 1));
    totals.push(column_total(MONTH_COUNT_COL, n, summary.total_months as f64));
    totals.push(column_total(GRAND_TOTAL_COL, n, summary.grand_total));
    totals.extend(
        summary
            .month_totals
            .iter()
            .enumerate()
            .map(|(i, (_, value))| column_total(FIRST_MONTH_COL + i, n, *value)),
    );
    rows.push(totals);

    Table { name: STATISTICS_SHEET.into(), rows }
}

/// `年度统计`: per-year subtotals per identity, with a totals row.
pub fn yearly_table(view: &StatisticsView) -> Table {
    const FIRST_YEAR_COL: usize = 3;
    let years = &view.years;
    let width = years.len();
    let total_col = FIRST_YEAR_COL + width;

    let mut header = vec![Cell::text("序号"), Cell::text("姓名"), Cell::text("身份证号")];
    header.extend(years.iter().map(|y| Cell::text(format!("{y}年"))));
    header.push(Cell::text("合计"));

    let mut rows = vec![header];
    for (i, stat) in view.rows.iter().enumerate() {
        let mut row = vec![
            Cell::number((i + 1) as f64),
            Cell::text(stat.identity.name.clone()),
            Cell::text(stat.identity.id.clone()),
        ];
        row.extend(stat.year_totals.iter().map(|&t| Cell::number(t)));
        let sum = stat.year_totals.iter().fold(0.0_f64, |a, &b| a + b);
        row.push(row_formula("SUM", FIRST_YEAR_COL, width, i + 2, sum));
        rows.push(row);
    }

    let n = view.rows.len();
    let summary = view.summary();
    let mut totals = vec![Cell::text("合计"), Cell::Empty, Cell::Empty];
    totals.extend(
        summary
            .year_totals
            .iter()
            .enumerate()
            .map(|(i, (_, value))| column_total(FIRST_YEAR_COL + i, n, *value)),
    );
    totals.push(column_total(total_col, n, summary.grand_total));
    rows.push(totals);

    Table { name: YEARLY_SHEET.into(), rows }
}

// ---------------------------------------------------------------------------
// Company declaration workbook
// ---------------------------------------------------------------------------

/// `填入模板信息`: the declaration template, one row per identity.
pub fn declaration_template(view: &StatisticsView) -> Table {
    let mut rows: Vec<Vec<Cell>> = vec![
        TEMPLATE_CODES.iter().map(|c| Cell::text(*c)).collect(),
        TEMPLATE_LABELS.iter().map(|c| Cell::text(*c)).collect(),
    ];
    for (i, stat) in view.rows.iter().enumerate() {
        rows.push(vec![
            Cell::text((i + 1).to_string()),
            Cell::text(stat.identity.name.clone()),
            Cell::text(""),
            Cell::text(stat.identity.id.clone()),
            Cell::text(""),
            Cell::text(""),
            Cell::text(stat.month_count.to_string()),
        ]);
    }
    rows.push(vec![Cell::text(TEMPLATE_END)]);
    Table { name: TEMPLATE_SHEET.into(), rows }
}

pub fn id_type_reference() -> Table {
    let mut rows = vec![vec!["序号", "身份证件类型代码", "身份证件种类名称", "上级身份证件类型代码"]];
    let ordinals: Vec<String> = (1..=ID_TYPES.len()).map(|i| i.to_string()).collect();
    for (ordinal, (code, label, parent)) in ordinals.iter().zip(ID_TYPES.iter()) {
        rows.push(vec![ordinal.as_str(), code, label, parent]);
    }
    Table::from_text(ID_TYPE_SHEET, rows)
}

pub fn category_reference() -> Table {
    let mut rows = vec![vec!["序号", "类型代码", "类型名称"]];
    let ordinals: Vec<String> = (1..=CATEGORIES.len()).map(|i| i.to_string()).collect();
    for (ordinal, (code, label)) in ordinals.iter().zip(CATEGORIES.iter()) {
        rows.push(vec![ordinal.as_str(), code, label]);
    }
    Table::from_text(CATEGORY_SHEET, rows)
}

/// Declaration template, both reference tables, then the statistics sheet.
pub fn company_document(company: &str, view: &StatisticsView) -> Document {
    Document {
        file_name: document_file_name(company),
        tables: vec![
            declaration_template(view),
            id_type_reference(),
            category_reference(),
            statistics_table(view),
        ],
    }
}

pub fn person_document(label: &str, view: &StatisticsView, yearly: bool) -> Document {
    let mut tables = vec![statistics_table(view)];
    if yearly {
        tables.push(yearly_table(view));
    }
    Document { file_name: document_file_name(label), tables }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
