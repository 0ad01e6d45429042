//! Completion backends: a user-configured local command, or an
//! OpenAI-compatible chat completions endpoint.
use super::Completion;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "Return a single JSON object only. No prose or code fences.";

/// Runs an LM command with the prompt on stdin and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    /// The command to invoke (parsed via shell-words).
    command: String,
}

impl CommandBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Completion for CommandBackend {
    fn complete(&self, prompt: &str) -> Result<String> {
        let args = shell_words::split(&self.command)
            .with_context(|| format!("parse LM command: {}", self.command))?;
        let Some((program, rest)) = args.split_first() else {
            return Err(anyhow!("LM command is empty"));
        };
        let resolved = which::which(program)
            .with_context(|| format!("LM command not found on PATH: {program}"))?;

        let mut child = Command::new(&resolved)
            .args(rest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn LM command: {program}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .context("write prompt to LM stdin")?;
        }

        let output = child.wait_with_output().context("wait for LM command")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Calls `POST {base_url}/chat/completions`.
pub struct HttpBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
            agent,
        }
    }
}

impl Completion for HttpBackend {
    fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let mut request = self.agent.post(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }
        let mut response = request
            .send_json(&body)
            .with_context(|| format!("POST {}", self.endpoint))?;
        let reply: ChatResponse = response
            .body_mut()
            .read_json()
            .context("decode chat completion response")?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("chat completion returned no content"))
    }
}
