use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use crate::identity::Identity;
use crate::ingest::{EnrollmentRecord, FileBatch};
use crate::month::Month;
use crate::roster::{CompanyRoster, PersonRoster};

/// How entries come into existence in a [`PersonMonthIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Seeding {
    /// One entry per roster identity exists up front; unknown identities are not folded.
    PreSeeded,
    /// Entries are created the first time an identity is observed.
    Discovered,
}

/// identity → set of enrolled months.
///
/// Backed by sorted collections, so the result of a fold does not depend on the order in
/// which files or sheets were folded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonMonthIndex {
    seeding: Seeding,
    entries: BTreeMap<Identity, BTreeSet<Month>>,
}

impl PersonMonthIndex {
    pub fn discovered() -> Self {
        Self { seeding: Seeding::Discovered, entries: BTreeMap::new() }
    }

    pub fn pre_seeded(roster: &PersonRoster) -> Self {
        let entries = roster.iter().map(|p| (p.clone(), BTreeSet::new())).collect();
        Self { seeding: Seeding::PreSeeded, entries }
    }

    /// Pre-seeded when a roster is supplied, discovered otherwise.
    pub fn for_roster(roster: &PersonRoster) -> Self {
        if roster.is_empty() {
            Self::discovered()
        } else {
            Self::pre_seeded(roster)
        }
    }

    pub fn seeding(&self) -> Seeding {
        self.seeding
    }

    /// Record that `identity` was enrolled in `month`. Returns true if the index changed.
    pub fn insert(&mut self, identity: &Identity, month: Month) -> bool {
        match self.entries.get_mut(identity) {
            Some(months) => months.insert(month),
            None => match self.seeding {
                Seeding::PreSeeded => false,
                Seeding::Discovered => {
                    self.entries.insert(identity.clone(), BTreeSet::from([month]));
                    true
                }
            },
        }
    }

    pub fn fold<'a>(&mut self, records: impl IntoIterator<Item = &'a EnrollmentRecord>) {
        for record in records {
            self.insert(&record.identity, record.month);
        }
    }

    /// Fold every batch in one pass.
    pub fn fold_batches(&mut self, batches: &[FileBatch]) {
        for batch in batches {
            self.fold(&batch.records);
        }
        debug!("person index: {} identities after {} file(s)", self.entries.len(), batches.len());
    }

    pub fn get(&self, identity: &Identity) -> Option<&BTreeSet<Month>> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &BTreeSet<Month>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every month held by any identity.
    pub fn observed_months(&self) -> BTreeSet<Month> {
        self.entries.values().flatten().copied().collect()
    }
}

/// company → identity → months. Only companies on the roster are folded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyPersonMonthIndex {
    companies: BTreeMap<String, PersonMonthIndex>,
}

impl CompanyPersonMonthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold records whose company qualifies under `roster`. Records without a company, or
    /// for companies not on the roster, are skipped.
    pub fn fold<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a EnrollmentRecord>,
        roster: &CompanyRoster,
    ) {
        for record in records {
            let Some(ref company) = record.company else { continue };
            if !roster.qualifies(company) {
                continue;
            }
            self.companies
                .entry(company.clone())
                .or_insert_with(PersonMonthIndex::discovered)
                .insert(&record.identity, record.month);
        }
    }

    pub fn fold_batches(&mut self, batches: &[FileBatch], roster: &CompanyRoster) {
        for batch in batches {
            self.fold(&batch.records, roster);
        }
        debug!("company index: {} qualifying companies", self.companies.len());
    }

    pub fn get(&self, company: &str) -> Option<&PersonMonthIndex> {
        self.companies.get(company)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PersonMonthIndex)> {
        self.companies.iter()
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RowOrigin;

    fn record(company: Option<&str>, month: &str, name: &str, id: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            company: company.map(String::from),
            month: Month::parse(month).unwrap(),
            identity: Identity::new(name, id),
            origin: RowOrigin { file: "t.xlsx".into(), sheet: month.into(), row: Some(2) },
        }
    }

    #[test]
    fn duplicate_rows_do_not_inflate() {
        let r = record(None, "202301", "张三", "110101");
        let mut index = PersonMonthIndex::discovered();
        index.fold([&r, &r, &r]);
        assert_eq!(index.get(&r.identity).unwrap().len(), 1);
    }

    #[test]
    fn pre_seeded_keeps_zero_match_and_ignores_strangers() {
        let roster = PersonRoster::from_identities([
            Identity::new("张三", "110101"),
            Identity::new("李四", "110102"),
        ]);
        let mut index = PersonMonthIndex::pre_seeded(&roster);
        index.fold([
            &record(None, "202301", "张三", "110101"),
            &record(None, "202301", "王五", "110103"),
        ]);
        assert_eq!(index.len(), 2);
        assert!(index.get(&Identity::new("李四", "110102")).unwrap().is_empty());
        assert!(!index.contains(&Identity::new("王五", "110103")));
    }

    #[test]
    fn discovered_creates_entries_on_first_sight() {
        let mut index = PersonMonthIndex::discovered();
        assert!(index.insert(&Identity::new("a", "1"), Month::parse("202301").unwrap()));
        assert!(!index.insert(&Identity::new("a", "1"), Month::parse("202301").unwrap()));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn company_fold_requires_roster_membership() {
        let roster = CompanyRoster::from_names(["甲公司"]);
        let mut index = CompanyPersonMonthIndex::new();
        index.fold(
            [
                &record(Some("甲公司"), "202301", "张三", "1"),
                &record(Some("乙公司"), "202301", "李四", "2"),
                &record(None, "202301", "王五", "3"),
            ],
            &roster,
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("甲公司").unwrap().len(), 1);
        assert!(index.get("乙公司").is_none());
    }

    #[test]
    fn empty_company_roster_folds_nothing() {
        let mut index = CompanyPersonMonthIndex::new();
        index.fold([&record(Some("甲公司"), "202301", "张三", "1")], &CompanyRoster::default());
        assert!(index.is_empty());
    }

    #[test]
    fn observed_months_spans_all_identities() {
        let mut index = PersonMonthIndex::discovered();
        index.fold([
            &record(None, "202303", "a", "1"),
            &record(None, "202301", "b", "2"),
            &record(None, "202303", "b", "2"),
        ]);
        let months: Vec<String> = index.observed_months().iter().map(|m| m.canonical()).collect();
        assert_eq!(months, vec!["202301", "202303"]);
    }
}
