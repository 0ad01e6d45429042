//! Markdown documents for concept guides and worksheets.
//!
//! Daily documents land under `<output_dir>/<grade>/` and on-demand ones
//! under `<output_dir>/<grade>/on_demand/`; history stores paths relative to
//! the output directory.
use crate::content::{ConceptGuide, GeneratedContent, Worksheet};
use crate::curriculum::{learning_goal, Grade, Topic};
use crate::progress::{ArtifactKind, ArtifactRef};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

/// Where and for which day a run's documents are written.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub grade: Grade,
    pub topic: Topic,
    pub date: NaiveDate,
    /// `None` for documents generated outside the daily progression.
    pub lesson_day: Option<LessonDay>,
}

/// Position of a daily run in the grade's progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonDay {
    pub overall: u32,
    pub on_topic: u32,
}

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    root: PathBuf,
}

impl DocumentRenderer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Output-relative path for one artifact of a run.
    pub fn artifact_rel_path(ctx: &RenderContext, kind: ArtifactKind) -> String {
        let date = ctx.date.format("%Y%m%d");
        match ctx.lesson_day {
            Some(day) => format!(
                "{grade}/{grade}_{topic}_{kind}_day{overall}_{date}.md",
                grade = ctx.grade,
                topic = ctx.topic,
                overall = day.overall,
            ),
            None => format!(
                "{grade}/on_demand/{grade}_{topic}_{kind}_{date}.md",
                grade = ctx.grade,
                topic = ctx.topic,
            ),
        }
    }

    /// Write every generated document and return references to them.
    pub fn render(&self, ctx: &RenderContext, content: &GeneratedContent) -> Result<Vec<ArtifactRef>> {
        let mut artifacts = Vec::new();
        if let Some(guide) = &content.concept_guide {
            let text = concept_markdown(ctx, guide);
            artifacts.push(self.write(ctx, ArtifactKind::ConceptGuide, &text)?);
        }
        if let Some(worksheet) = &content.worksheet {
            let text = worksheet_markdown(ctx, worksheet);
            artifacts.push(self.write(ctx, ArtifactKind::Worksheet, &text)?);
        }
        Ok(artifacts)
    }

    fn write(&self, ctx: &RenderContext, kind: ArtifactKind, text: &str) -> Result<ArtifactRef> {
        let rel = Self::artifact_rel_path(ctx, kind);
        let path = self.root.join(&rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        tracing::info!(kind = %kind, path = %path.display(), "document written");
        Ok(ArtifactRef { kind, path: rel })
    }
}

fn concept_markdown(ctx: &RenderContext, guide: &ConceptGuide) -> String {
    let mut out = String::new();
    let title = if guide.title.trim().is_empty() {
        ctx.topic.display_name().to_string()
    } else {
        guide.title.trim().to_string()
    };
    append_header(&mut out, &title, "Concept Guide", ctx);
    out.push_str(&format!(
        "**Learning goal:** {}\n\n",
        learning_goal(ctx.topic, ctx.grade)
    ));
    out.push_str("## Understanding the Idea\n\n");
    out.push_str(guide.explanation.trim());
    out.push_str("\n\n");
    append_list_section(&mut out, "Key Points", &guide.key_points);
    append_list_section(&mut out, "Examples", &guide.examples);
    out
}

fn worksheet_markdown(ctx: &RenderContext, worksheet: &Worksheet) -> String {
    let mut out = String::new();
    append_header(&mut out, ctx.topic.display_name(), "Practice Worksheet", ctx);
    out.push_str("Name: ______________________    Date: ______________\n\n");
    out.push_str("## Problems\n\n");
    for (idx, problem) in worksheet.problems.iter().enumerate() {
        out.push_str(&format!("{}. {}\n\n   Answer: ____________\n\n", idx + 1, problem.prompt.trim()));
    }
    let hints: Vec<_> = worksheet
        .problems
        .iter()
        .enumerate()
        .filter(|(_, problem)| !problem.hint.trim().is_empty())
        .collect();
    if !hints.is_empty() {
        out.push_str("## Hints\n\n");
        for (idx, problem) in hints {
            out.push_str(&format!("{}. {}\n", idx + 1, problem.hint.trim()));
        }
        out.push('\n');
    }
    out.push_str("## Answer Key\n\n");
    for (idx, problem) in worksheet.problems.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, problem.answer.trim()));
    }
    out
}

fn append_header(out: &mut String, title: &str, kind: &str, ctx: &RenderContext) {
    out.push_str(&format!("# {title}\n\n"));
    let day = match ctx.lesson_day {
        Some(day) => format!("Day {} on this topic", day.on_topic),
        None => "Extra practice".to_string(),
    };
    out.push_str(&format!(
        "_{kind} · {} · {} · {day} · {}_\n\n",
        ctx.grade.display_name(),
        ctx.topic.display_name(),
        ctx.date.format("%Y-%m-%d"),
    ));
}

fn append_list_section(out: &mut String, heading: &str, items: &[String]) {
    let items: Vec<_> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {heading}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}
