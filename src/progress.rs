//! Durable per-grade curriculum progress.
//!
//! A `ProgressRecord` snapshots the topic sequence it was created from so later
//! catalog edits never rewrite history. The engine computes new records; the
//! store is the only thing that touches disk.
use crate::curriculum::{Catalog, Grade, Topic};
use crate::error::CurriculumError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

mod engine;
mod store;

pub use engine::{
    advance_after_run, advance_to_next_topic_explicit, check_run_date, progress_percentage,
    project_week_plan, resolve_today, status_summary, CompletedRun, PlannedDay, StatusSummary,
    DEFAULT_WEEK_DAYS,
};
pub use store::ProgressStore;

pub const PROGRESS_SCHEMA_VERSION: u32 = 1;

/// Persisted progress for one grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: u32,
    pub grade: Grade,
    pub topics_order: Vec<Topic>,
    pub current_topic_index: usize,
    pub days_on_current_topic: u32,
    pub total_days_completed: u32,
    pub history: Vec<HistoryEntry>,
}

/// One successful daily run, appended in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub topic: Topic,
    pub day_number_on_topic: u32,
    pub overall_day: u32,
    #[serde(default)]
    pub artifacts_generated: Vec<ArtifactRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ConceptGuide,
    Worksheet,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::ConceptGuide => f.write_str("concept_guide"),
            ArtifactKind::Worksheet => f.write_str("worksheet"),
        }
    }
}

/// A document produced by a run, referenced by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub path: String,
}

impl ProgressRecord {
    /// Fresh record at the first topic with no history.
    pub fn new(grade: Grade, topics_order: Vec<Topic>) -> Self {
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            grade,
            topics_order,
            current_topic_index: 0,
            days_on_current_topic: 0,
            total_days_completed: 0,
            history: Vec::new(),
        }
    }

    /// Fresh record built from the catalog's current sequence for `grade`.
    pub fn initial(grade: Grade, catalog: &Catalog) -> Result<Self, CurriculumError> {
        Ok(Self::new(grade, catalog.sequence_for(grade)?.to_vec()))
    }

    /// Check structural invariants against the catalog.
    ///
    /// Reports the first violated invariant; never repairs the record.
    pub fn validate(&self, grade: Grade, catalog: &Catalog) -> Result<(), CurriculumError> {
        if self.schema_version != PROGRESS_SCHEMA_VERSION {
            return Err(CurriculumError::corrupt(
                grade,
                format!(
                    "unsupported schema_version {} (expected {PROGRESS_SCHEMA_VERSION})",
                    self.schema_version
                ),
            ));
        }
        if self.grade != grade {
            return Err(CurriculumError::corrupt(
                grade,
                format!("record belongs to {}", self.grade),
            ));
        }
        if self.topics_order.is_empty() {
            return Err(CurriculumError::corrupt(grade, "topics_order is empty"));
        }
        if self.current_topic_index >= self.topics_order.len() {
            return Err(CurriculumError::corrupt(
                grade,
                format!(
                    "current_topic_index {} is out of bounds for {} topics",
                    self.current_topic_index,
                    self.topics_order.len()
                ),
            ));
        }
        let mut seen = BTreeSet::new();
        for topic in &self.topics_order {
            if !catalog.is_valid_topic_for(grade, *topic) {
                return Err(CurriculumError::corrupt(
                    grade,
                    format!("topic {topic} in topics_order is not valid for {grade}"),
                ));
            }
            if !seen.insert(*topic) {
                return Err(CurriculumError::corrupt(
                    grade,
                    format!("topic {topic} appears more than once in topics_order"),
                ));
            }
        }
        for (idx, entry) in self.history.iter().enumerate() {
            if !catalog.is_valid_topic_for(grade, entry.topic) {
                return Err(CurriculumError::corrupt(
                    grade,
                    format!("history entry {idx} has topic {} not valid for {grade}", entry.topic),
                ));
            }
        }
        if let Some(idx) = self
            .history
            .windows(2)
            .position(|pair| pair[1].date < pair[0].date)
        {
            return Err(CurriculumError::corrupt(
                grade,
                format!(
                    "history entry {} dated {} precedes entry {} dated {}",
                    idx + 1,
                    self.history[idx + 1].date,
                    idx,
                    self.history[idx].date
                ),
            ));
        }
        if self.history.len() != self.total_days_completed as usize {
            return Err(CurriculumError::corrupt(
                grade,
                format!(
                    "history has {} entries but total_days_completed is {}",
                    self.history.len(),
                    self.total_days_completed
                ),
            ));
        }
        Ok(())
    }
}
