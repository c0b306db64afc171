// Property-based tests for the fold, filter and export invariants.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use insurstat_core::export::{column_index, column_letter, statistics_table};
use insurstat_core::index::PersonMonthIndex;
use insurstat_core::ingest::{EnrollmentRecord, RowOrigin};
use insurstat_core::roster::Selected;
use insurstat_core::stats::{MonthRange, StatisticsView};
use insurstat_core::{Cell, Identity, Month, OutputPolicy, PersonRoster};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const PEOPLE: [(&str, &str); 6] = [
    ("张三", "110101"),
    ("李四", "110102"),
    ("王五", "110103"),
    ("赵六", "110104"),
    ("钱七", "110105"),
    ("孙八", "110106"),
];

fn person(i: usize) -> Identity {
    let (name, id) = PEOPLE[i % PEOPLE.len()];
    Identity::new(name, id)
}

fn arb_month() -> impl Strategy<Value = Month> {
    (2020i32..2025, 1u32..=12).prop_map(|(y, m)| Month::new(y, m).unwrap())
}

fn arb_record() -> impl Strategy<Value = EnrollmentRecord> {
    (0..PEOPLE.len(), arb_month(), 0usize..3).prop_map(|(p, month, file)| EnrollmentRecord {
        company: None,
        month,
        identity: person(p),
        origin: RowOrigin {
            file: format!("source-{file}.xlsx"),
            sheet: month.canonical(),
            row: Some(2),
        },
    })
}

fn arb_records() -> impl Strategy<Value = Vec<EnrollmentRecord>> {
    proptest::collection::vec(arb_record(), 0..60)
}

fn arb_roster() -> impl Strategy<Value = PersonRoster> {
    proptest::collection::vec(0..PEOPLE.len(), 1..8)
        .prop_map(|picks| PersonRoster::from_identities(picks.into_iter().map(person)))
}

fn fold(records: &[EnrollmentRecord]) -> PersonMonthIndex {
    let mut index = PersonMonthIndex::discovered();
    index.fold(records);
    index
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn fold_is_order_independent(
        (records, shuffled) in arb_records().prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle())),
    ) {
        prop_assert_eq!(fold(&records), fold(&shuffled));
    }

    #[test]
    fn fold_is_idempotent(records in arb_records()) {
        let once = fold(&records);
        let mut twice = fold(&records);
        twice.fold(&records);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn roster_driven_preserves_cardinality(records in arb_records(), roster in arb_roster()) {
        let mut index = PersonMonthIndex::for_roster(&roster);
        index.fold(&records);
        let rows = OutputPolicy::RosterDriven.select(&index, &roster).unwrap();
        prop_assert_eq!(rows.len(), roster.len());
        let order: Vec<&Identity> = rows.iter().map(|r| &r.identity).collect();
        let expected: Vec<&Identity> = roster.iter().collect();
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn source_driven_counts_roster_members_with_months(
        records in arb_records(),
        roster in arb_roster(),
    ) {
        let index = fold(&records);
        let rows = OutputPolicy::SourceDriven.select(&index, &roster).unwrap();
        let seen: BTreeSet<&Identity> = records.iter().map(|r| &r.identity).collect();
        let expected = roster.iter().filter(|p| seen.contains(p)).count();
        prop_assert_eq!(rows.len(), expected);
    }

    #[test]
    fn grand_total_matches_month_cells(records in arb_records(), rate in 0.0..2000.0f64) {
        let index = fold(&records);
        let selection: Vec<Selected> = index
            .iter()
            .map(|(identity, months)| Selected { identity: identity.clone(), months: months.clone() })
            .collect();
        let range = MonthRange::observed(index.observed_months());
        let view = StatisticsView::build(&selection, range, rate);
        let table = statistics_table(&view);

        let data = &table.rows[1..table.rows.len() - 1];
        let cell_sum: f64 = data
            .iter()
            .flat_map(|row| row[9..].iter())
            .filter_map(Cell::numeric)
            .sum();
        let expected: f64 = view.rows.iter().map(|r| r.month_count as f64 * rate).sum();
        prop_assert!((cell_sum - expected).abs() < 1e-6 * expected.max(1.0));

        let totals = table.rows.last().unwrap();
        let cached = totals[8].numeric().unwrap();
        prop_assert!((cached - expected).abs() < 1e-6 * expected.max(1.0));
    }
}

#[test]
fn column_letters_round_trip() {
    let mut previous = String::new();
    for i in 0..=701 {
        let letters = column_letter(i);
        assert_eq!(column_index(&letters), Some(i), "index {i} -> {letters}");
        assert!(letters.len() <= 2);
        assert!(
            previous.len() < letters.len() || previous < letters,
            "{previous} should sort before {letters}"
        );
        previous = letters;
    }
}
