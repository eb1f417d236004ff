// ── Run context ──
//
// Per-run state handed to every component that needs it: a unique run
// token and a scratch directory owned exclusively by this run. The scratch
// directory is removed when the context drops, on success and on error.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;

const TRANSCRIPT_FILE: &str = "wp-cli.log";

#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    dry_run: bool,
    scratch: TempDir,
}

impl RunContext {
    /// Create the scratch area under the system temp directory.
    pub fn new(dry_run: bool) -> Result<Self, CoreError> {
        Self::new_in(std::env::temp_dir(), dry_run)
    }

    /// Create the scratch area under `parent`.
    pub fn new_in(parent: impl AsRef<Path>, dry_run: bool) -> Result<Self, CoreError> {
        let run_id = Uuid::new_v4();
        let scratch = tempfile::Builder::new()
            .prefix(&format!("wpmigrate-{}-", run_id.simple()))
            .tempdir_in(parent)?;
        debug!(%run_id, scratch = %scratch.path().display(), dry_run, "run context created");
        Ok(Self {
            run_id,
            dry_run,
            scratch,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Where the WP-CLI adapter appends its invocation log.
    pub fn transcript_path(&self) -> PathBuf {
        self.scratch.path().join(TRANSCRIPT_FILE)
    }

    /// Copy the transcript out of the scratch area before it is removed.
    /// Returns `false` when nothing was recorded.
    pub fn keep_transcript(&self, destination: &Path) -> Result<bool, CoreError> {
        let source = self.transcript_path();
        if !source.exists() {
            return Ok(false);
        }
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, destination)?;
        Ok(true)
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        debug!(run_id = %self.run_id, scratch = %self.scratch.path().display(), "removing scratch area");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let ctx = RunContext::new_in(parent.path(), false).unwrap();
        let scratch = ctx.scratch_dir().to_path_buf();
        std::fs::write(ctx.transcript_path(), "x").unwrap();
        assert!(scratch.exists());
        drop(ctx);
        assert!(!scratch.exists());
    }

    #[test]
    fn scratch_is_removed_on_error_paths() {
        fn failing(parent: &Path) -> Result<(), CoreError> {
            let ctx = RunContext::new_in(parent, true)?;
            std::fs::write(ctx.transcript_path(), "x")?;
            Err(CoreError::configuration("boom"))
        }
        let parent = tempfile::tempdir().unwrap();
        assert!(failing(parent.path()).is_err());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn run_ids_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let a = RunContext::new_in(parent.path(), false).unwrap();
        let b = RunContext::new_in(parent.path(), false).unwrap();
        assert_ne!(a.run_id(), b.run_id());
        assert_ne!(a.scratch_dir(), b.scratch_dir());
    }

    #[test]
    fn keep_transcript_copies_when_present() {
        let parent = tempfile::tempdir().unwrap();
        let ctx = RunContext::new_in(parent.path(), false).unwrap();
        let out = parent.path().join("kept").join("transcript.log");
        assert!(!ctx.keep_transcript(&out).unwrap());
        std::fs::write(ctx.transcript_path(), "wp db prefix").unwrap();
        assert!(ctx.keep_transcript(&out).unwrap());
        assert_eq!(std::fs::read_to_string(out).unwrap(), "wp db prefix");
    }
}
