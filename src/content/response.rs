//! Parse LM replies into concept guides and worksheets.
use super::{ConceptGuide, Worksheet};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fence regex")
    })
}

/// Pull the JSON object out of a reply that may carry fences or prose.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    if let Some(captures) = fence_regex().captures(text) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub(crate) fn parse_concept(text: &str) -> Result<ConceptGuide> {
    let json = extract_json(text).ok_or_else(|| anyhow!("reply contains no JSON object"))?;
    let guide: ConceptGuide = serde_json::from_str(json).context("parse concept guide JSON")?;
    if guide.explanation.trim().is_empty() {
        return Err(anyhow!("concept guide explanation is empty"));
    }
    Ok(guide)
}

/// Parse a worksheet, keeping at most `wanted` problems.
pub(crate) fn parse_worksheet(text: &str, wanted: usize) -> Result<Worksheet> {
    let json = extract_json(text).ok_or_else(|| anyhow!("reply contains no JSON object"))?;
    let mut worksheet: Worksheet = serde_json::from_str(json).context("parse worksheet JSON")?;
    worksheet
        .problems
        .retain(|problem| !problem.prompt.trim().is_empty() && !problem.answer.trim().is_empty());
    if worksheet.problems.is_empty() {
        return Err(anyhow!("worksheet has no complete problems"));
    }
    if worksheet.problems.len() < wanted {
        tracing::warn!(
            requested = wanted,
            received = worksheet.problems.len(),
            "worksheet shorter than requested"
        );
    }
    worksheet.problems.truncate(wanted.max(1));
    Ok(worksheet)
}
