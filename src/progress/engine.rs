//! Progression rules over `ProgressRecord`.
//!
//! Every transition is a pure function from one record to the next. Day-driven
//! advancement and the operator skip are deliberately separate functions; the
//! week plan reuses the day-driven step without touching the record.
use super::{ArtifactRef, HistoryEntry, ProgressRecord};
use crate::curriculum::{Grade, Topic};
use crate::error::CurriculumError;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;

/// School days shown by default in a week plan.
pub const DEFAULT_WEEK_DAYS: u32 = 5;

const RECENT_HISTORY: usize = 5;

/// Outcome of a successful run, recorded into history.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub date: NaiveDate,
    pub artifacts: Vec<ArtifactRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Focus {
    #[serde(rename = "Concept Introduction")]
    ConceptIntroduction,
    #[serde(rename = "Practice & Reinforcement")]
    PracticeAndReinforcement,
}

impl Focus {
    fn for_day_on_topic(day_on_topic: u32) -> Self {
        if day_on_topic <= 1 {
            Focus::ConceptIntroduction
        } else {
            Focus::PracticeAndReinforcement
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Focus::ConceptIntroduction => f.write_str("Concept Introduction"),
            Focus::PracticeAndReinforcement => f.write_str("Practice & Reinforcement"),
        }
    }
}

/// One projected future day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDay {
    pub day_number: u32,
    pub topic: Topic,
    /// 1-based position of the topic in the sequence.
    pub topic_position: usize,
    pub day_on_topic: u32,
    pub days_per_topic: u32,
    pub focus: Focus,
}

/// Derived, read-only view of a record for status output.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub grade: Grade,
    pub current_topic: Topic,
    pub current_topic_index: usize,
    pub total_topics: usize,
    pub days_on_current_topic: u32,
    pub total_days_completed: u32,
    pub topics_remaining: usize,
    pub progress_percentage: f64,
    pub recent_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    index: usize,
    days: u32,
}

impl Position {
    fn of(record: &ProgressRecord) -> Result<Self, CurriculumError> {
        check_index(record)?;
        Ok(Self {
            index: record.current_topic_index,
            days: record.days_on_current_topic,
        })
    }

    /// Count one completed day and apply the threshold rule.
    ///
    /// The final topic never advances; its day counter restarts instead.
    fn step(self, len: usize, days_per_topic: NonZeroU32) -> Self {
        let days = self.days.saturating_add(1);
        if days < days_per_topic.get() {
            return Self { days, ..self };
        }
        let index = if self.index + 1 < len {
            self.index + 1
        } else {
            self.index
        };
        Self { index, days: 0 }
    }
}

fn check_index(record: &ProgressRecord) -> Result<(), CurriculumError> {
    let len = record.topics_order.len();
    if record.current_topic_index >= len {
        return Err(CurriculumError::IndexOutOfRange {
            index: record.current_topic_index,
            len,
        });
    }
    Ok(())
}

/// The topic active for the next run.
pub fn resolve_today(record: &ProgressRecord) -> Result<Topic, CurriculumError> {
    check_index(record)?;
    Ok(record.topics_order[record.current_topic_index])
}

/// Reject a run dated before the last recorded one; history stays chronological.
pub fn check_run_date(record: &ProgressRecord, date: NaiveDate) -> Result<(), CurriculumError> {
    match record.history.last() {
        Some(last) if date < last.date => Err(CurriculumError::OutOfOrderRun {
            date,
            last: last.date,
        }),
        _ => Ok(()),
    }
}

/// Record one successful run and apply day-threshold advancement.
pub fn advance_after_run(
    record: &ProgressRecord,
    days_per_topic: NonZeroU32,
    run: CompletedRun,
) -> Result<ProgressRecord, CurriculumError> {
    let position = Position::of(record)?;
    check_run_date(record, run.date)?;
    let topic = record.topics_order[position.index];
    let next_position = position.step(record.topics_order.len(), days_per_topic);

    let mut next = record.clone();
    next.total_days_completed = record.total_days_completed.saturating_add(1);
    next.history.push(HistoryEntry {
        date: run.date,
        topic,
        day_number_on_topic: position.days.saturating_add(1),
        overall_day: next.total_days_completed,
        artifacts_generated: run.artifacts,
    });
    next.current_topic_index = next_position.index;
    next.days_on_current_topic = next_position.days;
    Ok(next)
}

/// Operator skip to the next topic, ignoring the day threshold.
///
/// Returns `None` when the record is already on its final topic.
pub fn advance_to_next_topic_explicit(
    record: &ProgressRecord,
) -> Result<Option<ProgressRecord>, CurriculumError> {
    check_index(record)?;
    if record.current_topic_index + 1 >= record.topics_order.len() {
        return Ok(None);
    }
    let mut next = record.clone();
    next.current_topic_index += 1;
    next.days_on_current_topic = 0;
    Ok(Some(next))
}

/// Simulate `num_days` successful runs from the record's current position.
pub fn project_week_plan(
    record: &ProgressRecord,
    days_per_topic: NonZeroU32,
    num_days: u32,
) -> Result<Vec<PlannedDay>, CurriculumError> {
    let len = record.topics_order.len();
    let mut position = Position::of(record)?;
    let mut plan = Vec::with_capacity(num_days as usize);
    for day_number in 1..=num_days {
        let day_on_topic = position.days.saturating_add(1);
        plan.push(PlannedDay {
            day_number,
            topic: record.topics_order[position.index],
            topic_position: position.index + 1,
            day_on_topic,
            days_per_topic: days_per_topic.get(),
            focus: Focus::for_day_on_topic(day_on_topic),
        });
        position = position.step(len, days_per_topic);
    }
    Ok(plan)
}

/// Share of the sequence already moved past, in percent.
pub fn progress_percentage(record: &ProgressRecord) -> f64 {
    let len = record.topics_order.len();
    if len == 0 {
        return 100.0;
    }
    (record.current_topic_index as f64 / len as f64 * 100.0).clamp(0.0, 100.0)
}

pub fn status_summary(record: &ProgressRecord) -> Result<StatusSummary, CurriculumError> {
    let current_topic = resolve_today(record)?;
    let total_topics = record.topics_order.len();
    let recent_start = record.history.len().saturating_sub(RECENT_HISTORY);
    Ok(StatusSummary {
        grade: record.grade,
        current_topic,
        current_topic_index: record.current_topic_index,
        total_topics,
        days_on_current_topic: record.days_on_current_topic,
        total_days_completed: record.total_days_completed,
        topics_remaining: total_topics - record.current_topic_index,
        progress_percentage: progress_percentage(record),
        recent_history: record.history[recent_start..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ArtifactKind;

    fn days(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero")
    }

    fn record(topics: &[Topic]) -> ProgressRecord {
        ProgressRecord::new(Grade::Grade3, topics.to_vec())
    }

    fn run(day: u32) -> CompletedRun {
        CompletedRun {
            date: NaiveDate::from_ymd_opt(2026, 10, day).expect("date"),
            artifacts: vec![ArtifactRef {
                kind: ArtifactKind::Worksheet,
                path: format!("grade_3/day{day}.md"),
            }],
        }
    }

    #[test]
    fn dwells_then_advances_by_threshold() {
        let topics = [Topic::Addition, Topic::Subtraction, Topic::Fractions];
        let mut current = record(&topics);
        let mut seen = Vec::new();
        for day in 1..=4 {
            seen.push((resolve_today(&current).expect("topic"), current.days_on_current_topic + 1));
            current = advance_after_run(&current, days(2), run(day)).expect("advance");
        }
        assert_eq!(
            seen,
            vec![
                (Topic::Addition, 1),
                (Topic::Addition, 2),
                (Topic::Subtraction, 1),
                (Topic::Subtraction, 2),
            ]
        );
        assert_eq!(current.current_topic_index, 2);
        assert_eq!(current.days_on_current_topic, 0);
        assert_eq!(current.total_days_completed, 4);
        let logged: Vec<_> = current
            .history
            .iter()
            .map(|entry| (entry.topic, entry.day_number_on_topic, entry.overall_day))
            .collect();
        assert_eq!(
            logged,
            vec![
                (Topic::Addition, 1, 1),
                (Topic::Addition, 2, 2),
                (Topic::Subtraction, 1, 3),
                (Topic::Subtraction, 2, 4),
            ]
        );
    }

    #[test]
    fn back_dated_run_is_rejected() {
        let current = advance_after_run(&record(&[Topic::Time, Topic::Money]), days(1), run(20))
            .expect("advance");
        assert_eq!(
            advance_after_run(&current, days(1), run(5)),
            Err(CurriculumError::OutOfOrderRun {
                date: NaiveDate::from_ymd_opt(2026, 10, 5).expect("date"),
                last: NaiveDate::from_ymd_opt(2026, 10, 20).expect("date"),
            })
        );
        let same_day = advance_after_run(&current, days(1), run(20)).expect("same day");
        assert_eq!(same_day.history.len(), 2);
    }

    #[test]
    fn default_threshold_advances_every_run() {
        let current = record(&[Topic::Time, Topic::Money]);
        let next = advance_after_run(&current, days(1), run(1)).expect("advance");
        assert_eq!(next.current_topic_index, 1);
        assert_eq!(next.days_on_current_topic, 0);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.history[0].topic, Topic::Time);
    }

    #[test]
    fn final_topic_is_practiced_indefinitely() {
        let mut current = record(&[Topic::Time, Topic::Money]);
        current = advance_after_run(&current, days(1), run(1)).expect("advance");
        for day in 2..=5 {
            current = advance_after_run(&current, days(1), run(day)).expect("advance");
            assert_eq!(current.current_topic_index, 1);
            assert_eq!(current.days_on_current_topic, 0);
        }
        assert_eq!(current.total_days_completed, 5);
        assert!(current.history[1..]
            .iter()
            .all(|entry| entry.topic == Topic::Money && entry.day_number_on_topic == 1));
    }

    #[test]
    fn final_topic_restarts_day_count_in_chunks() {
        let mut current = record(&[Topic::Geometry]);
        for day in 1..=5 {
            current = advance_after_run(&current, days(2), run(day)).expect("advance");
        }
        let day_numbers: Vec<_> = current
            .history
            .iter()
            .map(|entry| entry.day_number_on_topic)
            .collect();
        assert_eq!(day_numbers, vec![1, 2, 1, 2, 1]);
        assert_eq!(current.current_topic_index, 0);
        assert_eq!(current.days_on_current_topic, 1);
    }

    #[test]
    fn explicit_skip_resets_days_without_history() {
        let mut current = record(&[Topic::Addition, Topic::Subtraction, Topic::Money]);
        current = advance_after_run(&current, days(3), run(1)).expect("advance");
        assert_eq!(current.days_on_current_topic, 1);

        let skipped = advance_to_next_topic_explicit(&current)
            .expect("skip")
            .expect("advanced");
        assert_eq!(skipped.current_topic_index, 1);
        assert_eq!(skipped.days_on_current_topic, 0);
        assert_eq!(skipped.history, current.history);
        assert_eq!(skipped.total_days_completed, current.total_days_completed);
    }

    #[test]
    fn explicit_skip_at_last_topic_is_noop() {
        let mut current = record(&[Topic::Addition, Topic::Subtraction]);
        current.current_topic_index = 1;
        assert_eq!(advance_to_next_topic_explicit(&current), Ok(None));
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mut current = record(&[Topic::Addition]);
        current.current_topic_index = 3;
        let expected = CurriculumError::IndexOutOfRange { index: 3, len: 1 };
        assert_eq!(resolve_today(&current), Err(expected.clone()));
        assert_eq!(
            advance_after_run(&current, days(1), run(1)).map(|_| ()),
            Err(expected.clone())
        );
        assert_eq!(project_week_plan(&current, days(1), 5), Err(expected));
    }

    #[test]
    fn week_plan_walks_the_same_rule() {
        let mut current = record(&[Topic::Multiplication, Topic::Division, Topic::Fractions]);
        current.days_on_current_topic = 1;
        let plan = project_week_plan(&current, days(2), 5).expect("plan");
        let summary: Vec<_> = plan
            .iter()
            .map(|day| (day.day_number, day.topic, day.day_on_topic, day.focus))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, Topic::Multiplication, 2, Focus::PracticeAndReinforcement),
                (2, Topic::Division, 1, Focus::ConceptIntroduction),
                (3, Topic::Division, 2, Focus::PracticeAndReinforcement),
                (4, Topic::Fractions, 1, Focus::ConceptIntroduction),
                (5, Topic::Fractions, 2, Focus::PracticeAndReinforcement),
            ]
        );
        assert_eq!(plan[3].topic_position, 3);
    }

    #[test]
    fn week_plan_matches_actual_runs() {
        let topics = [Topic::Counting, Topic::Addition, Topic::Patterns];
        let start = record(&topics);
        let plan = project_week_plan(&start, days(2), 7).expect("plan");
        let mut current = start.clone();
        for (day, planned) in (1..).zip(&plan) {
            assert_eq!(resolve_today(&current).expect("topic"), planned.topic);
            current = advance_after_run(&current, days(2), run(day)).expect("advance");
            assert_eq!(current.history.last().map(|e| e.day_number_on_topic), Some(planned.day_on_topic));
        }
    }

    #[test]
    fn week_plan_leaves_record_untouched() {
        let current = record(&[Topic::Addition, Topic::Subtraction]);
        let before = current.clone();
        let _ = project_week_plan(&current, days(1), 10).expect("plan");
        assert_eq!(current, before);
    }

    #[test]
    fn percentage_is_derived_from_index() {
        let mut current = record(&[Topic::Addition, Topic::Subtraction, Topic::Time, Topic::Money]);
        assert_eq!(progress_percentage(&current), 0.0);
        current.current_topic_index = 3;
        assert_eq!(progress_percentage(&current), 75.0);
        assert_eq!(progress_percentage(&current), 75.0);
    }

    #[test]
    fn status_summary_keeps_last_five_entries() {
        let mut current = record(&[Topic::Addition, Topic::Subtraction]);
        for day in 1..=7 {
            current = advance_after_run(&current, days(4), run(day)).expect("advance");
        }
        let summary = status_summary(&current).expect("summary");
        assert_eq!(summary.recent_history.len(), 5);
        assert_eq!(summary.recent_history[0].overall_day, 3);
        assert_eq!(summary.current_topic, Topic::Subtraction);
        assert_eq!(summary.topics_remaining, 1);
        assert_eq!(summary.total_days_completed, 7);
    }
}
