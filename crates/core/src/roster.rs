use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{NameNormalization, RosterLayout};
use crate::error::StatError;
use crate::identity::Identity;
use crate::index::PersonMonthIndex;
use crate::ingest::{cell, RawFile};
use crate::month::Month;

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

/// Persons to report on, in first-seen order, without duplicates.
///
/// An empty person roster means "no filter".
#[derive(Debug, Clone, Default)]
pub struct PersonRoster {
    members: Vec<Identity>,
    lookup: HashSet<Identity>,
}

impl PersonRoster {
    pub fn from_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let mut roster = Self::default();
        for identity in identities {
            roster.push(identity);
        }
        roster
    }

    /// Read `[name, id]` rows from the first sheet of a roster file.
    pub fn from_file(file: &RawFile, layout: &RosterLayout, names: NameNormalization) -> Self {
        let mut roster = Self::default();
        let Some(sheet) = file.sheets.first() else { return roster };
        for (_, row) in sheet.data_rows(layout.header_rows) {
            let name = names.apply(cell(row, 0));
            let id = cell(row, 1).to_string();
            if name.is_empty() && id.is_empty() {
                continue;
            }
            roster.push(Identity::new(name, id));
        }
        roster
    }

    /// Add a member; returns false if it was already present.
    pub fn push(&mut self, identity: Identity) -> bool {
        if self.lookup.insert(identity.clone()) {
            self.members.push(identity);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.lookup.contains(identity)
    }

    /// Whether `identity` passes this roster as a filter.
    pub fn permits(&self, identity: &Identity) -> bool {
        self.is_empty() || self.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Companies whose records should be reported.
///
/// Unlike [`PersonRoster`], an empty company roster qualifies nothing.
#[derive(Debug, Clone, Default)]
pub struct CompanyRoster {
    names: BTreeSet<String>,
}

impl CompanyRoster {
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    /// Read company names from column A of the first sheet.
    pub fn from_file(file: &RawFile, layout: &RosterLayout) -> Self {
        let mut names = BTreeSet::new();
        if let Some(sheet) = file.sheets.first() {
            for (_, row) in sheet.data_rows(layout.header_rows) {
                let name = cell(row, 0);
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
        }
        Self { names }
    }

    pub fn qualifies(&self, company: &str) -> bool {
        self.names.contains(company)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Output policies
// ---------------------------------------------------------------------------

/// Which rows make it into a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPolicy {
    /// One row per roster member, in roster order, including members with no months.
    RosterDriven,
    /// One row per indexed identity that passes the roster and has at least one month.
    #[default]
    SourceDriven,
}

impl fmt::Display for OutputPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RosterDriven => write!(f, "roster_driven"),
            Self::SourceDriven => write!(f, "source_driven"),
        }
    }
}

/// One identity selected for reporting, with its months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selected {
    pub identity: Identity,
    pub months: BTreeSet<Month>,
}

impl OutputPolicy {
    pub fn select(
        self,
        index: &PersonMonthIndex,
        roster: &PersonRoster,
    ) -> Result<Vec<Selected>, StatError> {
        match self {
            Self::RosterDriven => roster_driven(index, roster),
            Self::SourceDriven => Ok(source_driven(index, roster)),
        }
    }
}

fn roster_driven(index: &PersonMonthIndex, roster: &PersonRoster) -> Result<Vec<Selected>, StatError> {
    if roster.is_empty() {
        return Err(StatError::MissingPrecondition(
            "roster-driven output needs a person roster".into(),
        ));
    }
    Ok(roster
        .iter()
        .map(|identity| Selected {
            identity: identity.clone(),
            months: index.get(identity).cloned().unwrap_or_default(),
        })
        .collect())
}

fn source_driven(index: &PersonMonthIndex, roster: &PersonRoster) -> Vec<Selected> {
    index
        .iter()
        .filter(|(identity, months)| !months.is_empty() && roster.permits(identity))
        .map(|(identity, months)| Selected { identity: identity.clone(), months: months.clone() })
        .collect()
}
