//! Opt-in exclusive lock for corpus apply passes.
//!
//! The engines themselves are lock-free; serializing concurrent runs
//! against one corpus is the caller's job. CLI apply paths hold this guard
//! for the duration of a write pass.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn corpus_lock_path(root: &Path) -> PathBuf {
    root.join(".canonry.lock")
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("corpus lock busy: {lock_path}")]
    Busy { lock_path: String },

    #[error("failed to acquire corpus lock {lock_path}: {message}")]
    Io { lock_path: String, message: String },
}

/// Exclusive-create lock file, removed on drop.
#[derive(Debug)]
pub struct CorpusLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl CorpusLockGuard {
    pub fn acquire(root: &Path) -> Result<Self, LockError> {
        let lock_path = corpus_lock_path(root);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LockError::Io {
                lock_path: lock_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Err(LockError::Busy {
                lock_path: lock_path.display().to_string(),
            }),
            Err(err) => Err(LockError::Io {
                lock_path: lock_path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

impl Drop for CorpusLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
