//! CLI argument parsing for the daily curriculum workflow.
//!
//! Each subcommand maps to one progression operation; policy lives in the
//! library modules, not here.
use crate::config::MAX_NUM_PROBLEMS;
use crate::curriculum::{Grade, Topic};
use crate::progress::DEFAULT_WEEK_DAYS;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::num::NonZeroU32;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "dmath",
    version,
    about = "Daily elementary math lessons that advance through a grade's curriculum",
    after_help = "Examples:\n  dmath run --grade grade_3\n  dmath run --all-grades --num-problems 15\n  dmath status --grade grade_2 --json\n  dmath week-plan --grade grade_4 --days-per-topic 2\n  dmath next-topic --grade grade_1\n  dmath reset --grade grade_1\n  dmath generate --grade grade_3 --topic fractions --no-concept-guide",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Directory holding progress files and generated documents
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log progress decisions and LM calls to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Status(StatusArgs),
    WeekPlan(WeekPlanArgs),
    /// Discard a grade's progress and start its curriculum over
    Reset(GradeArgs),
    /// Move a grade to its next topic without generating anything
    NextTopic(GradeArgs),
    Topics(TopicsArgs),
    Generate(GenerateArgs),
}

pub fn parse_grade(raw: &str) -> Result<Grade, crate::error::CurriculumError> {
    raw.parse()
}

pub fn parse_topic(raw: &str) -> Result<Topic, crate::error::CurriculumError> {
    raw.parse()
}

fn problem_count() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_NUM_PROBLEMS))
}

/// LM backend overrides shared by generating commands.
#[derive(Parser, Debug)]
pub struct LmArgs {
    /// LM command receiving the prompt on stdin
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// OpenAI-compatible API base URL (selects the HTTP backend)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Model name for the HTTP backend
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Generate today's documents and advance progress.
#[derive(Parser, Debug)]
#[command(about = "Generate today's concept guide and worksheet, then record the day")]
pub struct RunArgs {
    /// Target grade (kindergarten, grade_1 ... grade_5)
    #[arg(
        long,
        value_parser = parse_grade,
        required_unless_present = "all_grades",
        conflicts_with = "all_grades"
    )]
    pub grade: Option<Grade>,

    /// Run every grade, one after another
    #[arg(long)]
    pub all_grades: bool,

    /// Problems per worksheet
    #[arg(long, value_name = "N", value_parser = problem_count())]
    pub num_problems: Option<u32>,

    /// Successful runs spent on each topic before advancing
    #[arg(long, value_name = "N")]
    pub days_per_topic: Option<NonZeroU32>,

    /// Skip the concept guide
    #[arg(long, conflicts_with = "no_worksheet")]
    pub no_concept_guide: bool,

    /// Skip the practice worksheet
    #[arg(long)]
    pub no_worksheet: bool,

    /// Date recorded for this run (defaults to today; never before the last run)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    #[command(flatten)]
    pub lm: LmArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show a grade's position in its curriculum")]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: GradeArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Week plan command inputs.
#[derive(Parser, Debug)]
#[command(about = "Preview upcoming days without changing progress")]
pub struct WeekPlanArgs {
    #[command(flatten)]
    pub target: GradeArgs,

    /// Number of days to project
    #[arg(long, value_name = "N", default_value_t = DEFAULT_WEEK_DAYS)]
    pub days: u32,

    /// Successful runs spent on each topic before advancing
    #[arg(long, value_name = "N")]
    pub days_per_topic: Option<NonZeroU32>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Single-grade target.
#[derive(Parser, Debug)]
pub struct GradeArgs {
    /// Target grade (kindergarten, grade_1 ... grade_5)
    #[arg(long, value_parser = parse_grade)]
    pub grade: Grade,
}

/// One-off lesson inputs.
#[derive(Parser, Debug)]
#[command(about = "Generate a lesson for any topic of a grade without recording progress")]
pub struct GenerateArgs {
    /// Target grade (kindergarten, grade_1 ... grade_5)
    #[arg(long, value_parser = parse_grade)]
    pub grade: Grade,

    /// Topic id, as listed by `dmath topics --grade G`
    #[arg(long, value_parser = parse_topic)]
    pub topic: Topic,

    /// Problems per worksheet
    #[arg(long, value_name = "N", value_parser = problem_count())]
    pub num_problems: Option<u32>,

    /// Difficulty from 1 to 5 (defaults to the grade's level)
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulty: Option<u8>,

    /// Skip the concept guide
    #[arg(long, conflicts_with = "no_worksheet")]
    pub no_concept_guide: bool,

    /// Skip the practice worksheet
    #[arg(long)]
    pub no_worksheet: bool,

    #[command(flatten)]
    pub lm: LmArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Catalog listing inputs.
#[derive(Parser, Debug)]
#[command(about = "List grades, or the topic sequence for one grade")]
pub struct TopicsArgs {
    /// Show the ordered topics for this grade
    #[arg(long, value_parser = parse_grade)]
    pub grade: Option<Grade>,
}
