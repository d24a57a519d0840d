// SPDX-License-Identifier: Apache-2.0

//! Platform-independent file identity based on inode (Unix) or file index (Windows).
//!
//! The identity behind a path changes when a log rotator renames the old file away
//! and creates a new one under the same name, which is what the rotation detector
//! keys on. Equality is the only property the tailer relies on.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// A platform-independent unique identifier for a file.
///
/// On Unix systems, this is the device ID + inode number.
/// On Windows, this is the volume serial number + file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    /// Device ID (Unix) or volume serial number (Windows)
    dev: u64,
    /// Inode number (Unix) or file index (Windows)
    ino: u64,
}

impl FileId {
    /// Create a FileId from raw device and inode values.
    /// Used when comparing against a persisted checkpoint.
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Identity of the file behind an open handle.
    #[cfg(unix)]
    pub fn from_file(file: &File) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = file.metadata()?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Identity of the file behind an open handle.
    #[cfg(windows)]
    pub fn from_file(file: &File) -> io::Result<Self> {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::Foundation::HANDLE;
        use windows_sys::Win32::Storage::FileSystem::{
            BY_HANDLE_FILE_INFORMATION, GetFileInformationByHandle,
        };

        let handle = file.as_raw_handle() as HANDLE;
        let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };

        let result = unsafe { GetFileInformationByHandle(handle, &mut info) };
        if result == 0 {
            return Err(io::Error::last_os_error());
        }

        let file_index = ((info.nFileIndexHigh as u64) << 32) | (info.nFileIndexLow as u64);

        Ok(Self {
            dev: info.dwVolumeSerialNumber as u64,
            ino: file_index,
        })
    }

    /// Identity of the file a path resolves to. Symlinks are followed, so a
    /// swapped symlink target shows up as an identity change.
    #[cfg(unix)]
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Identity of the file a path resolves to.
    #[cfg(windows)]
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    /// Get the device ID (Unix) or volume serial number (Windows).
    pub fn dev(&self) -> u64 {
        self.dev
    }

    /// Get the inode number (Unix) or file index (Windows).
    pub fn ino(&self) -> u64 {
        self.ino
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

/// Probe the identity of the file currently bound to `path`.
///
/// `path` is expected to be absolute; relative paths resolve against the process
/// working directory, which can change underneath a long-running tailer.
/// Any stat failure is reported as [`Error::ProbeFailed`], which the tailer
/// treats the same as the file not being there.
pub fn inode(path: impl AsRef<Path>) -> Result<FileId> {
    let path = path.as_ref();
    FileId::from_path(path).map_err(|source| Error::ProbeFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Get the current path of an open file handle.
///
/// After a rename-style rotation this is where the drained file now lives.
/// If the file was deleted but the handle is still open, this returns an error
/// or a path marked as deleted.
#[cfg(target_os = "linux")]
pub fn get_path_from_file(file: &File) -> io::Result<std::path::PathBuf> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let link_path = format!("/proc/self/fd/{}", fd);
    std::fs::read_link(&link_path)
}

/// Get the current path of an open file handle.
#[cfg(target_os = "macos")]
pub fn get_path_from_file(file: &File) -> io::Result<std::path::PathBuf> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();

    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    let result = unsafe { libc::fcntl(fd, libc::F_GETPATH, buf.as_mut_ptr()) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let path_str = std::str::from_utf8(&buf[..len])
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(std::path::PathBuf::from(path_str))
}

/// Get the current path of an open file handle.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn get_path_from_file(_file: &File) -> io::Result<std::path::PathBuf> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "resolving the path of an open handle is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_file_id_from_file_matches_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"test content").unwrap();
        file.flush().unwrap();

        let f = file.reopen().unwrap();
        let by_handle = FileId::from_file(&f).unwrap();
        let by_path = FileId::from_path(file.path()).unwrap();

        assert_eq!(by_handle, by_path);
        assert!(by_handle.dev() > 0 || by_handle.ino() > 0);
    }

    #[test]
    fn test_file_id_different_files() {
        let file1 = NamedTempFile::new().unwrap();
        let file2 = NamedTempFile::new().unwrap();

        let id1 = FileId::from_path(file1.path()).unwrap();
        let id2 = FileId::from_path(file2.path()).unwrap();

        assert_ne!(id1, id2);
    }

    #[test]
    fn test_inode_stable_across_append() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let id1 = inode(&path).unwrap();
        {
            let mut f = std::fs::OpenOptions::new()
                .append(true)
                .open(&path)
                .unwrap();
            f.write_all(b"more content\n").unwrap();
        }
        let id2 = inode(&path).unwrap();

        assert_eq!(id1, id2);
    }

    #[test]
    fn test_inode_changes_on_rename_and_recreate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"old\n").unwrap();

        let before = inode(&path).unwrap();
        std::fs::rename(&path, dir.path().join("app.log.1")).unwrap();
        std::fs::write(&path, b"new\n").unwrap();
        let after = inode(&path).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_inode_missing_path_is_probe_failure() {
        let dir = TempDir::new().unwrap();
        let err = inode(dir.path().join("missing.log")).unwrap_err();

        assert!(matches!(err, Error::ProbeFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_inode_follows_symlink() {
        let dir = TempDir::new().unwrap();
        let target_a = dir.path().join("a.log");
        let target_b = dir.path().join("b.log");
        let link = dir.path().join("current.log");
        std::fs::write(&target_a, b"a\n").unwrap();
        std::fs::write(&target_b, b"b\n").unwrap();

        std::os::unix::fs::symlink(&target_a, &link).unwrap();
        assert_eq!(inode(&link).unwrap(), inode(&target_a).unwrap());

        std::fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink(&target_b, &link).unwrap();
        assert_eq!(inode(&link).unwrap(), inode(&target_b).unwrap());
    }

    #[test]
    fn test_file_id_serde() {
        let id = FileId::new(64769, 1234567);
        let json = serde_json::to_string(&id).unwrap();
        let id2: FileId = serde_json::from_str(&json).unwrap();

        assert_eq!(id, id2);
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_get_path_from_file_after_rename() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let rotated = dir.path().join("app.log.1");
        std::fs::write(&path, b"content\n").unwrap();

        let f = File::open(&path).unwrap();
        std::fs::rename(&path, &rotated).unwrap();

        let retrieved = get_path_from_file(&f).unwrap();
        assert_eq!(
            rotated.canonicalize().unwrap(),
            retrieved.canonicalize().unwrap_or(retrieved)
        );
    }

    #[test]
    fn test_file_id_display() {
        let id = FileId { dev: 123, ino: 456 };
        assert_eq!(format!("{}", id), "123:456");
    }
}
