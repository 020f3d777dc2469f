use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::TempPath;
use tracing::{debug, warn};

/// A resume written to the upload directory for the lifetime of one request.
///
/// The backing `TempPath` removes the file when dropped, so every exit path
/// (early `?` return, validation failure, panic) reclaims it. `cleanup` is
/// the explicit, logged variant used once the pipeline is done with it.
#[derive(Debug)]
pub struct StoredResume {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    path: TempPath,
}

impl StoredResume {
    pub fn new(original_name: String, mime_type: String, size_bytes: u64, path: TempPath) -> Self {
        Self {
            original_name,
            mime_type,
            size_bytes,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file now. Consuming `self` guarantees it happens once.
    pub fn cleanup(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(path = %shown, "temp upload removed"),
            Err(e) => warn!(path = %shown, "failed to remove temp upload: {e}"),
        }
    }
}

/// Raw form contents as they came off the wire. Any field may be absent.
#[derive(Debug, Default)]
pub struct IntakeForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub resume: Option<StoredResume>,
}

/// A validated application, scoped to a single request and never persisted.
#[derive(Debug)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub position: String,
    pub resume: StoredResume,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(dir: &tempfile::TempDir) -> StoredResume {
        let path = tempfile::NamedTempFile::new_in(dir.path())
            .unwrap()
            .into_temp_path();
        StoredResume::new("cv.pdf".to_string(), "application/pdf".to_string(), 0, path)
    }

    #[test]
    fn test_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let resume = stored(&dir);
        let on_disk = resume.path().to_path_buf();
        assert!(on_disk.exists());

        resume.cleanup();
        assert!(!on_disk.exists());
    }

    #[test]
    fn test_cleanup_of_already_removed_file_only_logs() {
        let dir = tempfile::tempdir().unwrap();
        let resume = stored(&dir);
        std::fs::remove_file(resume.path()).unwrap();

        resume.cleanup();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dropping_resume_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let resume = stored(&dir);
        let on_disk = resume.path().to_path_buf();

        drop(resume);
        assert!(!on_disk.exists());
    }
}
