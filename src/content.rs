//! Content generation for daily runs.
//!
//! `ContentGenerator` is the seam the daily run depends on. The shipped
//! implementation asks a language model for JSON through a `Completion`
//! backend (a local command or an OpenAI-compatible HTTP endpoint).
use crate::curriculum::{learning_goal, Grade, Topic};
use crate::error::CurriculumError;
use serde::{Deserialize, Serialize};
use std::time::Instant;

mod backend;
mod response;

pub use backend::{CommandBackend, HttpBackend};

/// Maximum number of retry attempts after an unusable LM response.
const MAX_LM_RETRIES: usize = 2;

const CONCEPT_PROMPT: &str = include_str!("../prompts/concept.md");
const WORKSHEET_PROMPT: &str = include_str!("../prompts/worksheet.md");
const RETRY_PROMPT: &str = include_str!("../prompts/retry.md");

/// What a daily run asks the generator for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub grade: Grade,
    pub topic: Topic,
    pub concept_guide: bool,
    pub worksheet: bool,
    pub num_problems: u32,
    /// 1-5; daily runs use the grade's own level.
    pub difficulty: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptGuide {
    #[serde(default)]
    pub title: String,
    pub explanation: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub hint: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedContent {
    pub concept_guide: Option<ConceptGuide>,
    pub worksheet: Option<Worksheet>,
}

/// Produces concept guides and worksheets for a topic.
pub trait ContentGenerator {
    fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, CurriculumError>;
}

/// Text-in, text-out access to a language model.
pub trait Completion {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// `ContentGenerator` backed by a language model.
#[derive(Debug)]
pub struct LmContentGenerator<B> {
    backend: B,
}

impl<B: Completion> LmContentGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Run one prompt, retrying with the parse error when the reply is unusable.
    ///
    /// Backend failures are not retried; they usually mean misconfiguration.
    fn ask<T>(
        &self,
        label: &str,
        prompt: &str,
        parse: impl Fn(&str) -> anyhow::Result<T>,
    ) -> Result<T, CurriculumError> {
        let mut last_error = String::new();
        for attempt in 0..=MAX_LM_RETRIES {
            let prompt = if attempt == 0 {
                prompt.to_string()
            } else {
                tracing::warn!(label, attempt, max = MAX_LM_RETRIES, "LM retry");
                format!("{prompt}{}", RETRY_PROMPT.replace("{error}", &last_error))
            };
            let start = Instant::now();
            let text = self
                .backend
                .complete(&prompt)
                .map_err(|err| CurriculumError::GenerationFailure(format!("{label}: {err:#}")))?;
            tracing::info!(
                label,
                elapsed_ms = start.elapsed().as_millis() as u64,
                prompt_bytes = prompt.len(),
                response_bytes = text.len(),
                "lm invoke complete"
            );
            match parse(&text) {
                Ok(value) => return Ok(value),
                Err(err) => last_error = format!("{err:#}"),
            }
        }
        Err(CurriculumError::GenerationFailure(format!(
            "{label}: no usable response after {} attempts; last error: {last_error}",
            MAX_LM_RETRIES + 1
        )))
    }
}

impl<B: Completion> ContentGenerator for LmContentGenerator<B> {
    fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, CurriculumError> {
        let mut content = GeneratedContent::default();
        if request.concept_guide {
            let prompt = fill_prompt(CONCEPT_PROMPT, request);
            content.concept_guide = Some(self.ask("concept guide", &prompt, response::parse_concept)?);
        }
        if request.worksheet {
            let prompt = fill_prompt(WORKSHEET_PROMPT, request);
            let wanted = request.num_problems as usize;
            content.worksheet = Some(self.ask("worksheet", &prompt, |text| {
                response::parse_worksheet(text, wanted)
            })?);
        }
        Ok(content)
    }
}

fn fill_prompt(template: &str, request: &ContentRequest) -> String {
    template
        .replace("{grade}", request.grade.display_name())
        .replace("{topic}", request.topic.display_name())
        .replace("{description}", &learning_goal(request.topic, request.grade))
        .replace("{difficulty}", &request.difficulty.to_string())
        .replace("{num_problems}", &request.num_problems.to_string())
}
