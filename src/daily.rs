//! One daily run per grade: resolve today's topic, generate and render its
//! documents, then record the day.
//!
//! The record is only written after every document exists. A failed or
//! interrupted run leaves the stored record exactly as it was, so retrying
//! tomorrow (or in five minutes) never skips a day.
//!
//! On-demand lessons reuse the same generator and renderer but never read or
//! write progress.
use crate::content::{ContentGenerator, ContentRequest};
use crate::curriculum::{Grade, Topic};
use crate::error::CurriculumError;
use crate::progress::{
    advance_after_run, advance_to_next_topic_explicit, check_run_date, progress_percentage,
    resolve_today, ArtifactRef, CompletedRun, ProgressRecord, ProgressStore,
};
use crate::render::{DocumentRenderer, LessonDay, RenderContext};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::num::NonZeroU32;

/// Per-invocation knobs for a daily run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub days_per_topic: NonZeroU32,
    pub num_problems: u32,
    pub concept_guide: bool,
    pub worksheet: bool,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRunSummary {
    pub grade: Grade,
    pub date: NaiveDate,
    pub topic: Topic,
    pub topic_position: usize,
    pub total_topics: usize,
    pub day_on_topic: u32,
    pub overall_day: u32,
    pub artifacts: Vec<ArtifactRef>,
    pub next_topic: Topic,
    pub progress_percentage: f64,
}

/// A one-off lesson for any topic the grade allows.
#[derive(Debug, Clone, Copy)]
pub struct OnDemandRequest {
    pub grade: Grade,
    pub topic: Topic,
    /// Overrides the grade's default difficulty.
    pub difficulty: Option<u8>,
    pub num_problems: u32,
    pub concept_guide: bool,
    pub worksheet: bool,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnDemandSummary {
    pub grade: Grade,
    pub topic: Topic,
    pub date: NaiveDate,
    pub difficulty: u8,
    pub artifacts: Vec<ArtifactRef>,
}

/// Result of an operator skip.
#[derive(Debug, Clone)]
pub enum SkipOutcome {
    Advanced(ProgressRecord),
    AlreadyAtLastTopic(ProgressRecord),
}

pub struct DailyRunner<'a> {
    store: &'a ProgressStore,
    generator: &'a dyn ContentGenerator,
    renderer: &'a DocumentRenderer,
}

impl<'a> DailyRunner<'a> {
    pub fn new(
        store: &'a ProgressStore,
        generator: &'a dyn ContentGenerator,
        renderer: &'a DocumentRenderer,
    ) -> Self {
        Self {
            store,
            generator,
            renderer,
        }
    }

    /// Run today's lesson for one grade.
    pub fn run_today(&self, grade: Grade, options: &RunOptions) -> Result<DailyRunSummary> {
        let _lock = self.store.lock(grade)?;
        let record = self.store.load(grade)?;
        let topic = resolve_today(&record)?;
        check_run_date(&record, options.date)?;
        let day = LessonDay {
            overall: record.total_days_completed.saturating_add(1),
            on_topic: record.days_on_current_topic.saturating_add(1),
        };
        let ctx = RenderContext {
            grade,
            topic,
            date: options.date,
            lesson_day: Some(day),
        };
        tracing::info!(
            grade = %grade,
            topic = %topic,
            day_on_topic = day.on_topic,
            "run start"
        );

        let request = ContentRequest {
            grade,
            topic,
            concept_guide: options.concept_guide,
            worksheet: options.worksheet,
            num_problems: options.num_problems,
            difficulty: grade.difficulty(),
        };
        let content = self.generator.generate(&request)?;
        tracing::info!(grade = %grade, topic = %topic, "content generated");
        let artifacts = self
            .renderer
            .render(&ctx, &content)
            .with_context(|| format!("render documents for {grade}"))?;

        let next = advance_after_run(
            &record,
            options.days_per_topic,
            CompletedRun {
                date: options.date,
                artifacts: artifacts.clone(),
            },
        )?;
        self.store.save(grade, &next)?;

        Ok(DailyRunSummary {
            grade,
            date: options.date,
            topic,
            topic_position: record.current_topic_index + 1,
            total_topics: record.topics_order.len(),
            day_on_topic: day.on_topic,
            overall_day: day.overall,
            artifacts,
            next_topic: resolve_today(&next)?,
            progress_percentage: progress_percentage(&next),
        })
    }

    /// Generate a lesson for any allowed topic without touching progress.
    pub fn generate_on_demand(&self, request: &OnDemandRequest) -> Result<OnDemandSummary> {
        let catalog = self.store.catalog();
        catalog.sequence_for(request.grade)?;
        if !catalog.is_valid_topic_for(request.grade, request.topic) {
            return Err(CurriculumError::TopicNotInGrade {
                topic: request.topic.id().to_string(),
                grade: request.grade.id().to_string(),
            }
            .into());
        }
        let difficulty = request.difficulty.unwrap_or_else(|| request.grade.difficulty());
        tracing::info!(
            grade = %request.grade,
            topic = %request.topic,
            difficulty,
            "on-demand lesson start"
        );
        let content = self.generator.generate(&ContentRequest {
            grade: request.grade,
            topic: request.topic,
            concept_guide: request.concept_guide,
            worksheet: request.worksheet,
            num_problems: request.num_problems,
            difficulty,
        })?;
        let ctx = RenderContext {
            grade: request.grade,
            topic: request.topic,
            date: request.date,
            lesson_day: None,
        };
        let artifacts = self
            .renderer
            .render(&ctx, &content)
            .with_context(|| format!("render on-demand documents for {}", request.grade))?;
        Ok(OnDemandSummary {
            grade: request.grade,
            topic: request.topic,
            date: request.date,
            difficulty,
            artifacts,
        })
    }

    /// Run each grade independently; one grade failing does not stop the rest.
    pub fn run_grades(
        &self,
        grades: &[Grade],
        options: &RunOptions,
    ) -> Vec<(Grade, Result<DailyRunSummary>)> {
        grades
            .iter()
            .map(|&grade| {
                let outcome = self.run_today(grade, options);
                if let Err(err) = &outcome {
                    tracing::warn!(grade = %grade, error = %format!("{err:#}"), "daily run failed");
                }
                (grade, outcome)
            })
            .collect()
    }
}

/// Move a grade to its next topic without generating anything.
pub fn skip_to_next_topic(store: &ProgressStore, grade: Grade) -> Result<SkipOutcome> {
    let _lock = store.lock(grade)?;
    let record = store.load(grade)?;
    match advance_to_next_topic_explicit(&record)? {
        Some(next) => {
            store.save(grade, &next)?;
            Ok(SkipOutcome::Advanced(next))
        }
        None => Ok(SkipOutcome::AlreadyAtLastTopic(record)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{GeneratedContent, Problem, Worksheet};
    use crate::curriculum::Catalog;
    use crate::error::curriculum_error;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct FakeGenerator {
        fail: bool,
        calls: Cell<usize>,
        difficulty: Cell<u8>,
    }

    impl FakeGenerator {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: Cell::new(0),
                difficulty: Cell::new(0),
            }
        }
    }

    impl ContentGenerator for FakeGenerator {
        fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, CurriculumError> {
            self.calls.set(self.calls.get() + 1);
            self.difficulty.set(request.difficulty);
            if self.fail {
                return Err(CurriculumError::GenerationFailure("upstream timeout".to_string()));
            }
            Ok(GeneratedContent {
                concept_guide: None,
                worksheet: request.worksheet.then(|| Worksheet {
                    problems: vec![Problem {
                        prompt: format!("Practice {}", request.topic),
                        hint: String::new(),
                        answer: "42".to_string(),
                    }],
                }),
            })
        }
    }

    struct Harness {
        dir: TempDir,
        store: ProgressStore,
        renderer: DocumentRenderer,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().expect("temp dir");
        let store = ProgressStore::new(
            dir.path().to_path_buf(),
            Catalog::builtin().expect("catalog"),
        );
        let renderer = DocumentRenderer::new(dir.path().to_path_buf());
        Harness {
            dir,
            store,
            renderer,
        }
    }

    fn options(day: u32, days_per_topic: u32) -> RunOptions {
        RunOptions {
            days_per_topic: NonZeroU32::new(days_per_topic).expect("non-zero"),
            num_problems: 1,
            concept_guide: false,
            worksheet: true,
            date: NaiveDate::from_ymd_opt(2026, 10, day).expect("date"),
        }
    }

    #[test]
    fn successful_run_records_the_day() {
        let h = harness();
        let generator = FakeGenerator::new(false);
        let runner = DailyRunner::new(&h.store, &generator, &h.renderer);

        let summary = runner.run_today(Grade::Kindergarten, &options(19, 1)).expect("run");
        assert_eq!(summary.topic, Topic::Counting);
        assert_eq!(summary.day_on_topic, 1);
        assert_eq!(summary.next_topic, Topic::Addition);
        assert_eq!(summary.progress_percentage, 20.0);
        assert_eq!(summary.artifacts.len(), 1);
        assert!(h.dir.path().join(&summary.artifacts[0].path).is_file());

        let stored = h.store.load(Grade::Kindergarten).expect("load");
        assert_eq!(stored.current_topic_index, 1);
        assert_eq!(stored.total_days_completed, 1);
        assert_eq!(stored.history[0].artifacts_generated, summary.artifacts);
    }

    #[test]
    fn failed_generation_leaves_record_byte_identical() {
        let h = harness();
        let ok = FakeGenerator::new(false);
        DailyRunner::new(&h.store, &ok, &h.renderer)
            .run_today(Grade::Grade3, &options(19, 2))
            .expect("first run");
        let path = h.store.progress_path(Grade::Grade3);
        let before = fs::read(&path).expect("read");

        let failing = FakeGenerator::new(true);
        let err = DailyRunner::new(&h.store, &failing, &h.renderer)
            .run_today(Grade::Grade3, &options(20, 2))
            .expect_err("generation fails");
        assert!(matches!(
            curriculum_error(&err),
            Some(CurriculumError::GenerationFailure(_))
        ));
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn failed_first_run_creates_no_record() {
        let h = harness();
        let failing = FakeGenerator::new(true);
        assert!(DailyRunner::new(&h.store, &failing, &h.renderer)
            .run_today(Grade::Grade1, &options(19, 1))
            .is_err());
        assert!(!h.store.progress_path(Grade::Grade1).exists());
    }

    #[test]
    fn corrupt_record_blocks_generation() {
        let h = harness();
        fs::write(h.store.progress_path(Grade::Grade4), "[]").expect("write");
        let generator = FakeGenerator::new(false);
        let err = DailyRunner::new(&h.store, &generator, &h.renderer)
            .run_today(Grade::Grade4, &options(19, 1))
            .expect_err("corrupt");
        assert!(matches!(
            curriculum_error(&err),
            Some(CurriculumError::CorruptProgressState { .. })
        ));
        assert_eq!(generator.calls.get(), 0);
    }

    #[test]
    fn consecutive_runs_observe_prior_commits() {
        let h = harness();
        let generator = FakeGenerator::new(false);
        let runner = DailyRunner::new(&h.store, &generator, &h.renderer);
        let topics: Vec<_> = (19..=22)
            .map(|day| {
                let summary = runner.run_today(Grade::Grade2, &options(day, 2)).expect("run");
                (summary.topic, summary.day_on_topic)
            })
            .collect();
        assert_eq!(
            topics,
            vec![
                (Topic::Addition, 1),
                (Topic::Addition, 2),
                (Topic::Subtraction, 1),
                (Topic::Subtraction, 2),
            ]
        );
        let stored = h.store.load(Grade::Grade2).expect("load");
        assert_eq!((stored.current_topic_index, stored.days_on_current_topic), (2, 0));
        assert_eq!(stored.total_days_completed, 4);
    }

    #[test]
    fn back_dated_run_is_refused_before_generation() {
        let h = harness();
        let generator = FakeGenerator::new(false);
        let runner = DailyRunner::new(&h.store, &generator, &h.renderer);
        runner.run_today(Grade::Grade4, &options(20, 1)).expect("first run");
        let before = fs::read(h.store.progress_path(Grade::Grade4)).expect("read");

        let err = runner
            .run_today(Grade::Grade4, &options(5, 1))
            .expect_err("back-dated");
        assert!(matches!(
            curriculum_error(&err),
            Some(CurriculumError::OutOfOrderRun { .. })
        ));
        assert_eq!(generator.calls.get(), 1);
        assert_eq!(fs::read(h.store.progress_path(Grade::Grade4)).expect("read"), before);
    }

    fn on_demand(topic: Topic) -> OnDemandRequest {
        OnDemandRequest {
            grade: Grade::Grade3,
            topic,
            difficulty: None,
            num_problems: 1,
            concept_guide: false,
            worksheet: true,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"),
        }
    }

    #[test]
    fn on_demand_lesson_leaves_progress_alone() {
        let h = harness();
        let generator = FakeGenerator::new(false);
        let runner = DailyRunner::new(&h.store, &generator, &h.renderer);

        let summary = runner
            .generate_on_demand(&on_demand(Topic::Money))
            .expect("generate");
        assert_eq!(summary.difficulty, 3);
        assert_eq!(generator.difficulty.get(), 3);
        assert_eq!(summary.artifacts.len(), 1);
        assert!(h.dir.path().join(&summary.artifacts[0].path).is_file());
        assert!(!h.store.progress_path(Grade::Grade3).exists());

        let harder = OnDemandRequest {
            difficulty: Some(5),
            ..on_demand(Topic::Fractions)
        };
        assert_eq!(runner.generate_on_demand(&harder).expect("generate").difficulty, 5);
        assert_eq!(generator.difficulty.get(), 5);
    }

    #[test]
    fn on_demand_rejects_topic_outside_grade() {
        let h = harness();
        let generator = FakeGenerator::new(false);
        let err = DailyRunner::new(&h.store, &generator, &h.renderer)
            .generate_on_demand(&on_demand(Topic::Ratios))
            .expect_err("ratios is grade 5 only");
        assert_eq!(
            curriculum_error(&err),
            Some(&CurriculumError::TopicNotInGrade {
                topic: "ratios".to_string(),
                grade: "grade_3".to_string(),
            })
        );
        assert_eq!(generator.calls.get(), 0);
    }

    #[test]
    fn all_grades_run_independently() {
        let h = harness();
        fs::write(h.store.progress_path(Grade::Grade1), "{").expect("write");
        let generator = FakeGenerator::new(false);
        let runner = DailyRunner::new(&h.store, &generator, &h.renderer);
        let outcomes = runner.run_grades(&Grade::ALL, &options(19, 1));
        assert_eq!(outcomes.len(), 6);
        for (grade, outcome) in &outcomes {
            assert_eq!(outcome.is_ok(), *grade != Grade::Grade1, "{grade}");
        }
    }

    #[test]
    fn skip_moves_forward_until_last_topic() {
        let h = harness();
        for _ in 0..4 {
            assert!(matches!(
                skip_to_next_topic(&h.store, Grade::Kindergarten).expect("skip"),
                SkipOutcome::Advanced(_)
            ));
        }
        match skip_to_next_topic(&h.store, Grade::Kindergarten).expect("skip") {
            SkipOutcome::AlreadyAtLastTopic(record) => {
                assert_eq!(record.current_topic_index, 4);
                assert!(record.history.is_empty());
            }
            other => panic!("expected last topic, got {other:?}"),
        }
    }
}
