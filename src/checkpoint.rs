// SPDX-License-Identifier: Apache-2.0

//! Progress record for callers that persist where a tailer got to.
//!
//! The tailer reports `position` with every line but never stores anything
//! itself. Callers that want to resume after a restart keep a [`Checkpoint`]
//! next to the position, including the identity of the file it refers to, and
//! ask it for a safe start position before building the next tailer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::input::{FileId, inode};

/// Persistable `(path, position, file identity)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Followed path
    pub path: PathBuf,
    /// Offset just past the last line that was handled
    pub position: u64,
    /// Device ID (Unix) or volume serial (Windows)
    pub dev: u64,
    /// Inode number (Unix) or file index (Windows)
    pub ino: u64,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>, position: u64, file_id: FileId) -> Self {
        Self {
            path: path.into(),
            position,
            dev: file_id.dev(),
            ino: file_id.ino(),
        }
    }

    /// Record the current identity of `path` together with `position`.
    pub fn capture(path: impl AsRef<Path>, position: u64) -> crate::Result<Self> {
        let path = path.as_ref();
        let file_id = inode(path)?;
        Ok(Self::new(path, position, file_id))
    }

    pub fn file_id(&self) -> FileId {
        FileId::new(self.dev, self.ino)
    }

    /// Position to start a new tailer from.
    ///
    /// The stored position if `path` still resolves to the same file, 0 if the
    /// file was replaced (or is missing) since the checkpoint was taken.
    pub fn resume_position(&self) -> u64 {
        match inode(&self.path) {
            Ok(current) if current == self.file_id() => self.position,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resume_same_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"a\nb\n").unwrap();

        let checkpoint = Checkpoint::capture(&path, 2).unwrap();
        assert_eq!(checkpoint.resume_position(), 2);
    }

    #[test]
    fn test_resume_after_rotation_starts_over() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"a\nb\n").unwrap();
        let checkpoint = Checkpoint::capture(&path, 4).unwrap();

        std::fs::rename(&path, dir.path().join("app.log.1")).unwrap();
        std::fs::write(&path, b"c\n").unwrap();

        assert_eq!(checkpoint.resume_position(), 0);
    }

    #[test]
    fn test_resume_missing_file() {
        let dir = TempDir::new().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("gone.log"), 10, FileId::new(1, 2));
        assert_eq!(checkpoint.resume_position(), 0);
    }

    #[test]
    fn test_checkpoint_serde() {
        let checkpoint = Checkpoint::new("/var/log/app.log", 4096, FileId::new(64769, 42));
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert_eq!(
            json,
            r#"{"path":"/var/log/app.log","position":4096,"dev":64769,"ino":42}"#
        );

        let loaded: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.file_id(), FileId::new(64769, 42));
    }
}
