//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Reply that satisfies both the concept guide and worksheet prompts.
const MOCK_REPLY: &str = r#"{
  "title": "Mock Lesson",
  "explanation": "We practice one idea at a time.",
  "key_points": ["Count carefully", "Check your work"],
  "examples": ["2 + 3 = 5"],
  "problems": [
    {"prompt": "What is 1 + 1?", "hint": "Use your fingers.", "answer": "2"},
    {"prompt": "What is 2 + 2?", "answer": "4"},
    {"prompt": "What is 3 + 3?", "answer": "6"}
  ]
}"#;

/// Isolated output directory plus mock LM scripts for driving `dmath`.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let workspace = Self { dir };
        workspace.write_script(
            "mock-lm.sh",
            &format!("cat >/dev/null\ncat <<'JSON'\n{MOCK_REPLY}\nJSON\n"),
        );
        workspace.write_script(
            "failing-lm.sh",
            "cat >/dev/null\necho 'backend offline' >&2\nexit 3\n",
        );
        workspace
    }

    fn write_script(&self, name: &str, body: &str) {
        fs::write(self.scripts_dir().join(name), body).expect("write mock script");
    }

    fn scripts_dir(&self) -> PathBuf {
        let dir = self.dir.path().join("scripts");
        fs::create_dir_all(&dir).expect("create scripts dir");
        dir
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn mock_lm(&self) -> String {
        format!("sh '{}'", self.scripts_dir().join("mock-lm.sh").display())
    }

    pub fn failing_lm(&self) -> String {
        format!("sh '{}'", self.scripts_dir().join("failing-lm.sh").display())
    }

    pub fn progress_path(&self, grade: &str) -> PathBuf {
        self.output_dir()
            .join(format!("curriculum_progress_{grade}.json"))
    }

    /// Run `dmath` against this workspace with a scrubbed environment.
    pub fn dmath(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dmath"))
            .args(args)
            .arg("--output-dir")
            .arg(self.output_dir())
            .env_remove("DMATH_OUTPUT_DIR")
            .env_remove("DMATH_LM_COMMAND")
            .env_remove("DMATH_API_URL")
            .env_remove("DMATH_API_KEY")
            .env_remove("DMATH_MODEL")
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn dmath")
    }

    /// `dmath run` for one grade with the mock LM.
    pub fn run_grade(&self, grade: &str, date: &str, extra: &[&str]) -> Output {
        let lm = self.mock_lm();
        let mut args = vec!["run", "--grade", grade, "--date", date, "--lm", lm.as_str()];
        args.extend_from_slice(extra);
        self.dmath(&args)
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "dmath failed: {}",
        stderr(output)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read json")).expect("parse json")
}
