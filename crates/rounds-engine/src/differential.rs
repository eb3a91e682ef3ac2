//! The learner's ranked differential diagnosis.
//!
//! Entries are keyed by diagnosis name and ranked by `order_index`. Every
//! mutating operation leaves the ranks dense (`0..N-1`); the only way to get
//! other values in is [`DifferentialLedger::restore`], which keeps whatever
//! index it is given so a persisted state can be replayed exactly.
//!
//! Ties on `order_index` sort by insertion order.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use rounds_core::models::case::{Diagnosis, DiagnosisCategory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticHypothesis {
    pub diagnosis: Diagnosis,
    pub proposed_at: Timestamp,
    pub notes: String,
    pub order_index: usize,
}

impl DiagnosticHypothesis {
    pub fn name(&self) -> &str {
        &self.diagnosis.name
    }
}

/// Persisted form of one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DifferentialEntry {
    pub name: String,
    pub category: DiagnosisCategory,
    #[serde(default)]
    pub notes: String,
    pub order_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DifferentialAction {
    Add,
    Remove,
    Swap,
    Move,
    Notes,
}

/// One learner edit, kept for the session export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialUpdate {
    pub action: DifferentialAction,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct DifferentialLedger {
    /// Insertion order. Rank lives in `order_index`.
    entries: Vec<DiagnosticHypothesis>,
    updates: Vec<DifferentialUpdate>,
}

impl DifferentialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&DiagnosticHypothesis> {
        self.position(name).map(|pos| &self.entries[pos])
    }

    /// Add a hypothesis, or return the existing one unchanged if `name` is
    /// already present.
    ///
    /// Without `order_index` the entry goes last. With one, it is inserted at
    /// that rank (clamped to the end) and everything at or after it moves
    /// down by one.
    pub fn add(
        &mut self,
        name: &str,
        category: DiagnosisCategory,
        notes: &str,
        order_index: Option<usize>,
    ) -> &DiagnosticHypothesis {
        if let Some(pos) = self.position(name) {
            return &self.entries[pos];
        }

        let mut ranked = self.ranked_positions();
        let rank = order_index.unwrap_or(ranked.len()).min(ranked.len());

        self.entries.push(DiagnosticHypothesis {
            diagnosis: Diagnosis::named(name, category),
            proposed_at: Timestamp::now(),
            notes: notes.to_string(),
            order_index: rank,
        });
        let pos = self.entries.len() - 1;
        ranked.insert(rank, pos);
        self.renumber(&ranked);

        self.log(DifferentialAction::Add, name, Some(category.to_string()));
        debug!(name, rank, "differential entry added");
        &self.entries[pos]
    }

    /// Remove `name` and close the gap it leaves. Returns `false` if absent.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(pos) = self.position(name) else {
            return false;
        };
        self.entries.remove(pos);
        let ranked = self.ranked_positions();
        self.renumber(&ranked);

        self.log(DifferentialAction::Remove, name, None);
        debug!(name, "differential entry removed");
        true
    }

    pub fn update_notes(&mut self, name: &str, notes: &str) -> bool {
        let Some(pos) = self.position(name) else {
            return false;
        };
        self.entries[pos].notes = notes.to_string();
        self.log(DifferentialAction::Notes, name, Some(notes.to_string()));
        true
    }

    /// Exchange the ranks of two entries. No-op unless both are present.
    pub fn swap(&mut self, first: &str, second: &str) -> bool {
        let (Some(a), Some(b)) = (self.position(first), self.position(second)) else {
            return false;
        };
        if a == b {
            return false;
        }

        let rank_a = self.entries[a].order_index;
        self.entries[a].order_index = self.entries[b].order_index;
        self.entries[b].order_index = rank_a;

        self.log(DifferentialAction::Swap, first, Some(second.to_string()));
        debug!(first, second, "differential entries swapped");
        true
    }

    /// Move `name` to rank `new_index` and renumber everything.
    ///
    /// An unknown name or an index past the last entry leaves the ledger
    /// untouched.
    pub fn move_to(&mut self, name: &str, new_index: usize) -> bool {
        let Some(pos) = self.position(name) else {
            return false;
        };
        if new_index >= self.entries.len() {
            return false;
        }

        let mut ranked = self.ranked_positions();
        ranked.retain(|&p| p != pos);
        ranked.insert(new_index, pos);
        self.renumber(&ranked);

        self.log(DifferentialAction::Move, name, Some(new_index.to_string()));
        debug!(name, new_index, "differential entry moved");
        true
    }

    /// Hypotheses in rank order.
    pub fn ranked(&self) -> Vec<&DiagnosticHypothesis> {
        self.ranked_positions()
            .into_iter()
            .map(|pos| &self.entries[pos])
            .collect()
    }

    pub fn ranked_list(&self) -> Vec<&Diagnosis> {
        self.ranked().into_iter().map(|h| &h.diagnosis).collect()
    }

    pub fn export_state(&self) -> Vec<DifferentialEntry> {
        self.ranked()
            .into_iter()
            .map(|h| DifferentialEntry {
                name: h.diagnosis.name.clone(),
                category: h.diagnosis.category,
                notes: h.notes.clone(),
                order_index: h.order_index,
            })
            .collect()
    }

    /// Re-insert a persisted entry if its name is not already present.
    /// The entry's `order_index` is kept as given.
    pub fn restore(&mut self, entry: DifferentialEntry) -> bool {
        if self.contains(&entry.name) {
            return false;
        }
        self.entries.push(DiagnosticHypothesis {
            diagnosis: Diagnosis::named(entry.name, entry.category),
            proposed_at: Timestamp::now(),
            notes: entry.notes,
            order_index: entry.order_index,
        });
        true
    }

    /// Restore a batch, then compact the ranks to `0..N-1`.
    pub fn restore_all(&mut self, entries: impl IntoIterator<Item = DifferentialEntry>) {
        for entry in entries {
            self.restore(entry);
        }
        let ranked = self.ranked_positions();
        self.renumber(&ranked);
    }

    pub fn updates(&self) -> &[DifferentialUpdate] {
        &self.updates
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|h| h.diagnosis.name == name)
    }

    /// Indices into `entries`, sorted by rank. `sort_by_key` is stable, so
    /// equal ranks keep insertion order.
    fn ranked_positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..self.entries.len()).collect();
        positions.sort_by_key(|&pos| self.entries[pos].order_index);
        positions
    }

    fn renumber(&mut self, ranked: &[usize]) {
        for (rank, &pos) in ranked.iter().enumerate() {
            self.entries[pos].order_index = rank;
        }
    }

    fn log(&mut self, action: DifferentialAction, name: &str, detail: Option<String>) {
        self.updates.push(DifferentialUpdate {
            action,
            name: name.to_string(),
            detail,
            at: Timestamp::now(),
        });
    }
}
