//! On-disk progress records, one JSON file per grade.
//!
//! Writes land in a temp file beside the target and are renamed into place, so
//! a reader sees either the previous record or the new one. A per-grade lock
//! file serializes load/advance/save sequences across processes.
use super::ProgressRecord;
use crate::curriculum::{Catalog, Grade};
use crate::error::CurriculumError;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// Exclusive hold on one grade's progress file; released on drop.
#[derive(Debug)]
pub struct GradeLock {
    grade: Grade,
    _file: File,
}

impl Drop for GradeLock {
    fn drop(&mut self) {
        tracing::debug!(grade = %self.grade, "progress lock released");
    }
}

/// Progress persistence rooted at an output directory.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    root: PathBuf,
    catalog: Catalog,
}

impl ProgressStore {
    pub fn new(root: PathBuf, catalog: Catalog) -> Self {
        Self { root, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Return the `curriculum_progress_<grade>.json` path.
    pub fn progress_path(&self, grade: Grade) -> PathBuf {
        self.root.join(format!("curriculum_progress_{grade}.json"))
    }

    fn lock_path(&self, grade: Grade) -> PathBuf {
        self.root.join(format!(".curriculum_progress_{grade}.lock"))
    }

    /// Block until this process holds the grade's lock.
    ///
    /// Not reentrant: `reset` takes the lock itself, so do not call it while
    /// holding a `GradeLock` for the same grade.
    pub fn lock(&self, grade: Grade) -> Result<GradeLock> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create {}", self.root.display()))?;
        let path = self.lock_path(grade);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("open lock {}", path.display()))?;
        lock_exclusive(&file).with_context(|| format!("lock {}", path.display()))?;
        tracing::debug!(grade = %grade, "progress lock acquired");
        Ok(GradeLock { grade, _file: file })
    }

    /// Load and validate a grade's record.
    ///
    /// A missing file yields a fresh record that is not written until `save`.
    pub fn load(&self, grade: Grade) -> Result<ProgressRecord> {
        let path = self.progress_path(grade);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(grade = %grade, "no progress file; starting fresh");
                return Ok(ProgressRecord::initial(grade, &self.catalog)?);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read progress {}", path.display()));
            }
        };
        let record: ProgressRecord = serde_json::from_slice(&bytes).map_err(|err| {
            CurriculumError::corrupt(grade, format!("{} is not a valid record: {err}", path.display()))
        })?;
        record.validate(grade, &self.catalog)?;
        Ok(record)
    }

    /// Atomically replace a grade's record.
    pub fn save(&self, grade: Grade, record: &ProgressRecord) -> Result<()> {
        if record.grade != grade {
            return Err(CurriculumError::corrupt(
                grade,
                format!("refusing to save a record for {} as {grade}", record.grade),
            )
            .into());
        }
        let path = self.progress_path(grade);
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create {}", self.root.display()))?;
        let mut text = serde_json::to_string_pretty(record).context("serialize progress record")?;
        text.push('\n');

        // The temp file is removed on drop unless it is persisted.
        let mut staged = tempfile::NamedTempFile::new_in(&self.root)
            .with_context(|| format!("stage progress in {}", self.root.display()))?;
        staged
            .write_all(text.as_bytes())
            .with_context(|| format!("write staged progress for {grade}"))?;
        staged
            .as_file()
            .sync_all()
            .with_context(|| format!("sync staged progress for {grade}"))?;
        staged
            .persist(&path)
            .with_context(|| format!("publish progress {}", path.display()))?;
        tracing::info!(
            grade = %grade,
            topic_index = record.current_topic_index,
            total_days = record.total_days_completed,
            "progress saved"
        );
        Ok(())
    }

    /// Discard any existing record, corrupt or not, and persist a fresh one.
    pub fn reset(&self, grade: Grade) -> Result<ProgressRecord> {
        let _lock = self.lock(grade)?;
        let record = ProgressRecord::initial(grade, &self.catalog)?;
        self.save(grade, &record)?;
        tracing::info!(grade = %grade, "progress reset");
        Ok(record)
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}
