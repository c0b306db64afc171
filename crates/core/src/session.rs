//! Generation-stamped holder of the current ingestion result.
//!
//! Reads are started with [`LoadSession::begin`] and finish with [`LoadSession::commit`].
//! Starting another load, or calling [`LoadSession::reset`], bumps the generation; a commit
//! carrying an older ticket is rejected instead of overwriting newer state.

use log::{debug, warn};

use crate::config::DEFAULT_ISSUE_LIMIT;
use crate::error::StatError;
use crate::ingest::{FileBatch, IssueLog};

/// Proof that a load was started at a particular generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct LoadSession {
    generation: u64,
    issue_limit: usize,
    batches: Vec<FileBatch>,
    issues: IssueLog,
}

impl Default for LoadSession {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUE_LIMIT)
    }
}

impl LoadSession {
    pub fn new(issue_limit: usize) -> Self {
        Self { generation: 0, issue_limit, batches: Vec::new(), issues: IssueLog::new(issue_limit) }
    }

    /// Start a new load. Any ticket handed out earlier becomes stale.
    pub fn begin(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Install the batches of a finished load, replacing whatever was held before.
    pub fn commit(&mut self, ticket: LoadTicket, batches: Vec<FileBatch>) -> Result<(), StatError> {
        if ticket.0 != self.generation {
            warn!("discarding load #{} (current is #{})", ticket.0, self.generation);
            return Err(StatError::StaleLoad { ticket: ticket.0, current: self.generation });
        }
        let mut issues = IssueLog::new(self.issue_limit);
        for batch in &batches {
            issues.extend(&batch.issues);
        }
        debug!("load #{}: {} file(s), {} issue(s)", ticket.0, batches.len(), issues.total());
        self.batches = batches;
        self.issues = issues;
        Ok(())
    }

    /// Drop all loaded data and invalidate outstanding tickets.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.batches.clear();
        self.issues = IssueLog::new(self.issue_limit);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn batches(&self) -> &[FileBatch] {
        &self.batches
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }
}
