// SPDX-License-Identifier: Apache-2.0

//! The tailer loop.
//!
//! A [`Tailer`] follows one path on a single thread:
//! - open the path, retrying while it does not exist
//! - each tick, sample the open handle and the path and ask the rotation
//!   detector what happened
//! - drain new bytes through the line framer into the listener
//! - on rotation, drain what is left of the old file, signal the rotation and
//!   switch to the new file once it has content
//!
//! The only state touched from other threads is the pair of control flags behind
//! [`TailerHandle`].

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info, trace, warn};

use crate::config::{RotationStrategy, TailerConfig};
use crate::control::TailerHandle;
use crate::error::{Error, Result};
use crate::input::{FileId, LineFramer, get_path_from_file, inode};
use crate::listener::{Line, TailerListener};
use crate::rotation::{self, Baseline, Observation, Verdict};

/// The file currently being read, with the identity recorded when it was opened
struct TrackedFile {
    file: File,
    file_id: FileId,
}

/// Follows a single file and reports its lines to a listener.
pub struct Tailer<L: TailerListener> {
    path: PathBuf,
    listener: L,
    handle: TailerHandle,
    delay: Duration,
    strategy: RotationStrategy,
    reopen: bool,
    framer: LineFramer,
    /// Offset up to which complete lines were delivered on the current file
    position: u64,
    /// Modification time marker, set at first open unless configured
    last_modified: Option<SystemTime>,
    /// `file_rotated` was signalled but the successor is not open yet
    rotation_pending: bool,
}

impl<L: TailerListener> std::fmt::Debug for Tailer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tailer")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("delay", &self.delay)
            .field("strategy", &self.strategy)
            .field("reopen", &self.reopen)
            .field("position", &self.position)
            .field("last_modified", &self.last_modified)
            .field("rotation_pending", &self.rotation_pending)
            .finish()
    }
}

impl<L: TailerListener> Tailer<L> {
    /// Create a tailer for `path`. The listener's `init` is called before this
    /// returns.
    pub fn new(path: impl Into<PathBuf>, mut listener: L, config: &TailerConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let handle = TailerHandle::new();
        listener.init(handle.clone());

        Ok(Self {
            path: path.into(),
            listener,
            handle,
            delay: config.delay(),
            strategy: config.strategy,
            reopen: config.reopen,
            framer: LineFramer::new(config.buffer_size),
            position: config.start_position,
            last_modified: config.last_modified(),
            rotation_pending: false,
        })
    }

    /// Get the followed path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the polling interval
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Offset up to which lines have been delivered on the current file
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get a handle for controlling the tailer once it runs.
    pub fn handle(&self) -> TailerHandle {
        self.handle.clone()
    }

    /// Ask the tailer to exit after its current step. See [`TailerHandle::stop`].
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Stop reading until [`resume`](Self::resume) is called. The file stays open.
    pub fn pause(&self) {
        self.handle.pause();
    }

    /// Continue reading after a [`pause`](Self::pause).
    pub fn resume(&self) {
        self.handle.resume();
    }

    /// Run the tailer on a dedicated OS thread.
    pub fn spawn(self) -> io::Result<(TailerHandle, JoinHandle<Result<()>>)>
    where
        L: 'static,
    {
        let handle = self.handle.clone();
        let thread = std::thread::Builder::new()
            .name("rotel-tailer".to_string())
            .spawn(move || self.run())?;
        Ok((handle, thread))
    }

    /// Follow the file until stopped or until a fatal error.
    ///
    /// Blocks the calling thread. On a graceful stop the listener's `stop` is
    /// called and `Ok(())` returned. On a fatal error the listener's
    /// `handle_error` is called instead and the error returned. The file handle is
    /// closed on both paths.
    pub fn run(mut self) -> Result<()> {
        info!(
            path = ?self.path,
            position = self.position,
            delay = ?self.delay,
            strategy = ?self.strategy,
            "Starting tailer"
        );

        match self.follow() {
            Ok(()) => {
                self.listener.stop();
                info!(path = ?self.path, position = self.position, "Tailer stopped");
                Ok(())
            }
            Err(e) => {
                error!(path = ?self.path, position = self.position, "Tailer failed: {}", e);
                self.listener.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Main loop. The tracked file lives in this frame so it is closed on every
    /// way out.
    fn follow(&mut self) -> Result<()> {
        let Some(mut current) = self.open_initial()? else {
            return Ok(());
        };

        // Set when a diverged tick drained nothing
        let mut stalled = false;

        while self.handle.is_running() {
            if self.handle.is_paused() {
                self.handle.sleep(self.delay);
                continue;
            }

            let obs = self.observe(&current)?;
            let baseline = Baseline {
                position: self.position,
                file_id: current.file_id,
                last_modified: self.last_modified.unwrap_or(SystemTime::UNIX_EPOCH),
            };
            let verdict = rotation::detect(self.strategy, &baseline, &obs);

            trace!(
                ?verdict,
                position = self.position,
                channel_size = obs.channel_size,
                path_length = ?obs.path_length,
                "Tick"
            );

            let mut progressed = false;
            if verdict.needs_drain() {
                let before = self.position;
                self.drain(&mut current)?;
                progressed = self.position > before;
            }

            let was_stalled = std::mem::take(&mut stalled);

            match verdict {
                Verdict::SameGrew => {
                    self.last_modified = Some(SystemTime::now());
                }
                Verdict::GrewDiverged if progressed => {
                    debug!(path = ?self.path, "Path no longer matches open file, draining");
                    continue;
                }
                Verdict::GrewDiverged => {
                    // Only an unterminated tail is left on the open handle. Without
                    // identities a second such tick means the name moved on.
                    if was_stalled && self.strategy == RotationStrategy::SizeAndMtime {
                        debug!(
                            path = ?self.path,
                            position = self.position,
                            "Open file no longer grows while the path differs, treating as rotated"
                        );
                        self.rotate(&mut current)?;
                        continue;
                    }
                    stalled = true;
                }
                Verdict::SameUnchanged => {}
                Verdict::AmbiguousSameSize => {
                    debug!(
                        path = ?self.path,
                        position = self.position,
                        "Modified without size change, waiting for further changes"
                    );
                    self.last_modified = Some(SystemTime::now());
                }
                Verdict::RotatedWithResidual | Verdict::Rotated | Verdict::Truncated => {
                    self.rotate(&mut current)?;
                    continue;
                }
                Verdict::NotFound => {
                    self.listener.file_not_found();
                }
            }

            self.handle.sleep(self.delay);

            if self.reopen {
                self.reopen_same(&mut current)?;
            }
        }

        Ok(())
    }

    /// Open the path, retrying until it exists. Returns `None` if stopped first.
    fn open_initial(&mut self) -> Result<Option<TrackedFile>> {
        while self.handle.is_running() {
            match File::open(&self.path) {
                Ok(mut file) => {
                    file.seek(SeekFrom::Start(self.position))?;
                    let file_id = FileId::from_file(&file)?;
                    if self.last_modified.is_none() {
                        self.last_modified = Some(modified_time(&file)?);
                    }

                    debug!(path = ?self.path, file_id = %file_id, position = self.position, "Opened file");
                    return Ok(Some(TrackedFile { file, file_id }));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.listener.file_not_found();
                    self.handle.sleep(self.delay);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(None)
    }

    fn observe(&self, current: &TrackedFile) -> Result<Observation> {
        let file_id = match self.strategy {
            RotationStrategy::Inode => match inode(&self.path) {
                Ok(id) => Some(id),
                Err(e) => {
                    trace!("Identity probe failed: {}", e);
                    None
                }
            },
            RotationStrategy::SizeAndMtime => None,
        };

        let channel_size = current.file.metadata()?.len();

        let (path_length, path_modified) = match fs::metadata(&self.path) {
            Ok(metadata) => (Some(metadata.len()), metadata.modified().ok()),
            Err(_) => (None, None),
        };

        Ok(Observation {
            file_id,
            channel_size,
            path_length,
            path_modified,
        })
    }

    /// Deliver every complete line from the current position onwards.
    fn drain(&mut self, current: &mut TrackedFile) -> Result<()> {
        let modified = modified_time(&current.file)?;
        let start = self.position;

        let handle = &self.handle;
        let listener = &mut self.listener;
        self.position = self.framer.read_lines(
            &mut current.file,
            start,
            || handle.is_running(),
            |bytes, position| listener.handle_line(Line::new(bytes, position, modified)),
        )?;

        trace!(
            file_id = %current.file_id,
            start_position = start,
            end_position = self.position,
            bytes_read = self.position - start,
            "Drained file"
        );
        Ok(())
    }

    /// Signal the rotation, wait for the new file to have content, then switch
    /// to it. If the new file cannot be opened the old one is kept and the
    /// rotation stays pending, so the next attempt does not signal it again.
    fn rotate(&mut self, current: &mut TrackedFile) -> Result<()> {
        if !self.rotation_pending {
            self.signal_rotation(current);
        }

        loop {
            if !self.handle.is_running() {
                return Ok(());
            }
            match fs::metadata(&self.path) {
                Ok(metadata) if metadata.len() > 0 => break,
                _ => self.handle.sleep(self.delay),
            }
        }

        self.switch_to_successor(current)
    }

    fn signal_rotation(&mut self, current: &TrackedFile) {
        match get_path_from_file(&current.file) {
            Ok(old_path) => info!(
                path = ?self.path,
                rotated_to = ?old_path,
                file_id = %current.file_id,
                position = self.position,
                "File rotation detected"
            ),
            Err(_) => info!(
                path = ?self.path,
                file_id = %current.file_id,
                position = self.position,
                "File rotation detected"
            ),
        }

        self.listener.file_rotated();
        self.rotation_pending = true;
    }

    fn switch_to_successor(&mut self, current: &mut TrackedFile) -> Result<()> {
        match File::open(&self.path) {
            Ok(file) => {
                let file_id = FileId::from_file(&file)?;
                // Replacing drops, and so closes, the old handle
                *current = TrackedFile { file, file_id };
                self.position = 0;
                self.rotation_pending = false;
                info!(path = ?self.path, file_id = %file_id, "Reopened file after rotation");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = ?self.path,
                    "File disappeared before it could be reopened, keeping previous file"
                );
                self.listener.file_not_found();
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// Swap in a fresh handle on the same file. A different file behind the path
    /// is left for the detector to find through the old handle.
    fn reopen_same(&mut self, current: &mut TrackedFile) -> Result<()> {
        match File::open(&self.path) {
            Ok(mut file) => {
                if FileId::from_file(&file)? == current.file_id {
                    file.seek(SeekFrom::Start(self.position))?;
                    current.file = file;
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn modified_time(file: &File) -> Result<SystemTime> {
    let metadata = file.metadata()?;
    // Platforms without mtime support fall back to the epoch
    Ok(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}
