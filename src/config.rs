//! Per-invocation settings.
//!
//! Every value resolves as: CLI flag, then environment, then
//! `<output_dir>/config.json`, then the built-in default. Nothing is cached
//! between invocations.
use crate::content::{CommandBackend, ContentGenerator, HttpBackend, LmContentGenerator};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_OUTPUT_DIR: &str = "DMATH_OUTPUT_DIR";
pub const ENV_LM_COMMAND: &str = "DMATH_LM_COMMAND";
pub const ENV_API_URL: &str = "DMATH_API_URL";
pub const ENV_API_KEY: &str = "DMATH_API_KEY";
pub const ENV_MODEL: &str = "DMATH_MODEL";

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_LM_COMMAND: &str = "claude -p --model haiku";
pub const DEFAULT_HTTP_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_NUM_PROBLEMS: u32 = 10;
pub const MAX_NUM_PROBLEMS: u32 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Optional `config.json` in the output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub lm_command: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub days_per_topic: Option<NonZeroU32>,
    #[serde(default)]
    pub num_problems: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Load `config.json` from the output directory; absent means defaults.
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(CONFIG_FILE_NAME);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
    }

    pub fn days_per_topic(&self, explicit: Option<NonZeroU32>) -> NonZeroU32 {
        explicit.or(self.days_per_topic).unwrap_or(NonZeroU32::MIN)
    }

    pub fn num_problems(&self, explicit: Option<u32>) -> Result<u32> {
        let count = explicit.or(self.num_problems).unwrap_or(DEFAULT_NUM_PROBLEMS);
        if !(1..=MAX_NUM_PROBLEMS).contains(&count) {
            return Err(anyhow!(
                "num_problems must be between 1 and {MAX_NUM_PROBLEMS}, got {count}"
            ));
        }
        Ok(count)
    }
}

/// Resolve the output directory: explicit > env > platform data dir.
pub fn resolve_output_dir(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env(ENV_OUTPUT_DIR).filter(|value| !value.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.local/share/dmath
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(data_dir.join("dmath"))
}

/// Which LM backend a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LmBackend {
    Command(String),
    Http {
        api_url: String,
        model: String,
        api_key: Option<String>,
    },
}

/// CLI-provided LM overrides.
#[derive(Debug, Clone, Default)]
pub struct LmOverrides {
    pub lm_command: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub backend: LmBackend,
    pub timeout: Duration,
}

impl GenerationSettings {
    /// An API URL from any layer selects HTTP; otherwise the command backend.
    pub fn resolve(
        overrides: &LmOverrides,
        file: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |explicit: &Option<String>, var: &str, file_value: &Option<String>| {
            explicit
                .clone()
                .or_else(|| env(var))
                .or_else(|| file_value.clone())
                .filter(|value| !value.trim().is_empty())
        };
        let backend = match pick(&overrides.api_url, ENV_API_URL, &file.api_url) {
            Some(api_url) => LmBackend::Http {
                api_url,
                model: pick(&overrides.model, ENV_MODEL, &file.model)
                    .unwrap_or_else(|| DEFAULT_HTTP_MODEL.to_string()),
                api_key: env(ENV_API_KEY).filter(|key| !key.is_empty()),
            },
            None => LmBackend::Command(
                pick(&overrides.lm_command, ENV_LM_COMMAND, &file.lm_command)
                    .unwrap_or_else(|| DEFAULT_LM_COMMAND.to_string()),
            ),
        };
        Self {
            backend,
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn generator(&self) -> Box<dyn ContentGenerator> {
        match &self.backend {
            LmBackend::Command(command) => {
                Box::new(LmContentGenerator::new(CommandBackend::new(command.clone())))
            }
            LmBackend::Http {
                api_url,
                model,
                api_key,
            } => Box::new(LmContentGenerator::new(HttpBackend::new(
                api_url,
                model.clone(),
                api_key.clone(),
                self.timeout,
            ))),
        }
    }
}

/// Process environment lookup for the resolvers above.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
