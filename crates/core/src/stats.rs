use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::MonthColumns;
use crate::identity::Identity;
use crate::month::Month;
use crate::roster::Selected;

// ---------------------------------------------------------------------------
// Month range
// ---------------------------------------------------------------------------

/// The month columns shared by every row of a report, sorted and distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthRange {
    months: Vec<Month>,
}

impl MonthRange {
    /// Exactly the months observed.
    pub fn observed(months: impl IntoIterator<Item = Month>) -> Self {
        let set: BTreeSet<Month> = months.into_iter().collect();
        Self { months: set.into_iter().collect() }
    }

    /// Every calendar month from the earliest to the latest observed month.
    pub fn contiguous(months: impl IntoIterator<Item = Month>) -> Self {
        let set: BTreeSet<Month> = months.into_iter().collect();
        let (Some(&first), Some(&last)) = (set.first(), set.last()) else {
            return Self::default();
        };
        let mut filled = vec![first];
        let mut current = first;
        while current < last {
            current = current.succ();
            filled.push(current);
        }
        Self { months: filled }
    }

    pub fn build(columns: MonthColumns, months: impl IntoIterator<Item = Month>) -> Self {
        match columns {
            MonthColumns::Observed => Self::observed(months),
            MonthColumns::Contiguous => Self::contiguous(months),
        }
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Distinct years covered, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.months.iter().map(Month::year).collect();
        years.dedup();
        years
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsRow {
    pub identity: Identity,
    pub first_month: Option<Month>,
    pub last_month: Option<Month>,
    pub month_count: usize,
    /// One flag per column of the shared month range.
    pub month_flags: Vec<bool>,
    /// One total per year of the shared year range.
    pub year_totals: Vec<f64>,
    pub grand_total: f64,
}

impl StatisticsRow {
    pub fn build(selected: &Selected, range: &MonthRange, years: &[i32], unit_rate: f64) -> Self {
        let months = &selected.months;
        let month_count = months.len();

        let month_flags = range.months().iter().map(|m| months.contains(m)).collect();
        let year_totals = years
            .iter()
            .map(|&y| months.iter().filter(|m| m.year() == y).count() as f64 * unit_rate)
            .collect();

        Self {
            identity: selected.identity.clone(),
            first_month: months.first().copied(),
            last_month: months.last().copied(),
            month_count,
            month_flags,
            year_totals,
            grand_total: month_count as f64 * unit_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// View + summary
// ---------------------------------------------------------------------------

/// Per-identity statistics over a shared month range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsView {
    pub unit_rate: f64,
    pub month_range: MonthRange,
    pub years: Vec<i32>,
    pub rows: Vec<StatisticsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub rows: usize,
    pub total_months: usize,
    pub grand_total: f64,
    pub month_totals: Vec<(Month, f64)>,
    pub year_totals: Vec<(i32, f64)>,
}

impl StatisticsView {
    /// Rows in `selection` order.
    pub fn build(selection: &[Selected], month_range: MonthRange, unit_rate: f64) -> Self {
        let years = month_range.years();
        let rows = selection
            .iter()
            .map(|s| StatisticsRow::build(s, &month_range, &years, unit_rate))
            .collect();
        Self { unit_rate, month_range, years, rows }
    }

    pub fn summary(&self) -> StatisticsSummary {
        let month_totals = self
            .month_range
            .months()
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let enrolled = self.rows.iter().filter(|r| r.month_flags[i]).count();
                (m, enrolled as f64 * self.unit_rate)
            })
            .collect();

        let year_totals = self
            .years
            .iter()
            .enumerate()
            .map(|(i, &y)| (y, self.rows.iter().map(|r| r.year_totals[i]).fold(0.0, |a, b| a + b)))
            .collect();

        StatisticsSummary {
            rows: self.rows.len(),
            total_months: self.rows.iter().map(|r| r.month_count).sum(),
            // `f64::sum` of an empty iterator is -0.0
            grand_total: self.rows.iter().map(|r| r.grand_total).fold(0.0, |a, b| a + b),
            month_totals,
            year_totals,
        }
    }
}
