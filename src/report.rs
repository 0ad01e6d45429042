//! Human-readable and JSON output for CLI commands.
use crate::curriculum::{learning_goal, Catalog, Grade};
use crate::daily::{DailyRunSummary, OnDemandSummary};
use crate::progress::{PlannedDay, StatusSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

const RULE: &str = "============================================================";

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

pub fn status_text(summary: &StatusSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{RULE}\nCURRICULUM PROGRESS: {}\n{RULE}\n", summary.grade.id().to_uppercase()));
    out.push_str(&format!("Current Topic: {}\n", summary.current_topic.display_name()));
    out.push_str(&format!(
        "Topic {} of {}\n",
        summary.current_topic_index + 1,
        summary.total_topics
    ));
    out.push_str(&format!("Days On Topic: {}\n", summary.days_on_current_topic));
    out.push_str(&format!("Days Completed: {}\n", summary.total_days_completed));
    out.push_str(&format!("Progress: {:.1}%\n", summary.progress_percentage));
    out.push_str(&format!("Topics Remaining: {}\n", summary.topics_remaining));
    if !summary.recent_history.is_empty() {
        out.push_str("\nRecent History:\n");
        for entry in &summary.recent_history {
            out.push_str(&format!(
                "  Day {} ({}): {} (day {} on topic)\n",
                entry.overall_day,
                entry.date.format("%Y-%m-%d"),
                entry.topic.display_name(),
                entry.day_number_on_topic
            ));
            for artifact in &entry.artifacts_generated {
                out.push_str(&format!("    {}: {}\n", artifact.kind, artifact.path));
            }
        }
    }
    out.push_str(RULE);
    out
}

pub fn week_plan_text(grade: Grade, plan: &[PlannedDay]) -> String {
    let mut out = format!("{RULE}\nWEEKLY PLAN: {}\n{RULE}\n", grade.display_name().to_uppercase());
    for day in plan {
        out.push_str(&format!(
            "\nDay {}: {}\n  Topic {} of sequence\n  Day {} of {}\n  Focus: {}\n",
            day.day_number,
            day.topic.display_name(),
            day.topic_position,
            day.day_on_topic,
            day.days_per_topic,
            day.focus
        ));
    }
    out.push_str(RULE);
    out
}

pub fn run_text(summary: &DailyRunSummary, output_dir: &Path) -> String {
    let mut out = format!(
        "{RULE}\nDAILY CONTENT GENERATED: {}\n{RULE}\n",
        summary.grade.display_name().to_uppercase()
    );
    out.push_str(&format!("Date: {}\n", summary.date.format("%Y-%m-%d")));
    out.push_str(&format!("Day: {}\n", summary.overall_day));
    out.push_str(&format!(
        "Topic: {} (day {} on topic)\n",
        summary.topic.display_name(),
        summary.day_on_topic
    ));
    out.push_str(&format!(
        "Topic Progress: {} of {}\n",
        summary.topic_position, summary.total_topics
    ));
    for artifact in &summary.artifacts {
        out.push_str(&format!(
            "{}: {}\n",
            artifact.kind,
            output_dir.join(&artifact.path).display()
        ));
    }
    out.push_str(&format!(
        "Next: {} ({:.1}% through the sequence)\n",
        summary.next_topic.display_name(),
        summary.progress_percentage
    ));
    out.push_str(RULE);
    out
}

pub fn on_demand_text(summary: &OnDemandSummary, output_dir: &Path) -> String {
    let mut out = format!(
        "{RULE}\nEXTRA PRACTICE: {}\n{RULE}\n",
        summary.grade.display_name().to_uppercase()
    );
    out.push_str(&format!("Date: {}\n", summary.date.format("%Y-%m-%d")));
    out.push_str(&format!(
        "Topic: {} (difficulty {} of 5)\n",
        summary.topic.display_name(),
        summary.difficulty
    ));
    for artifact in &summary.artifacts {
        out.push_str(&format!(
            "{}: {}\n",
            artifact.kind,
            output_dir.join(&artifact.path).display()
        ));
    }
    out.push_str("Progress was not changed.\n");
    out.push_str(RULE);
    out
}

pub fn topics_text(catalog: &Catalog, grade: Option<Grade>) -> Result<String> {
    let mut out = String::new();
    match grade {
        None => {
            out.push_str("Grades:\n");
            for grade in catalog.grades() {
                let count = catalog.sequence_for(grade)?.len();
                out.push_str(&format!("  {:<14} {} ({count} topics)\n", grade.id(), grade.display_name()));
            }
        }
        Some(grade) => {
            out.push_str(&format!("{} sequence:\n", grade.display_name()));
            for (idx, topic) in catalog.sequence_for(grade)?.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>2}. {:<24} {}\n",
                    idx + 1,
                    topic.id(),
                    learning_goal(*topic, grade)
                ));
            }
        }
    }
    Ok(out.trim_end().to_string())
}
