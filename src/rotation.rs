// SPDX-License-Identifier: Apache-2.0

//! Rotation detection.
//!
//! Each polling tick the tailer samples the followed path and its open handle and
//! asks [`detect`] whether it is still looking at the same file. The decision is
//! a pure function of the previous tick's [`Baseline`] and this tick's
//! [`Observation`] so it can be exercised without a filesystem.
//!
//! `channel_size` (queried through the open handle) and `path_length` (queried
//! through the name) are kept apart on purpose: between a writer renaming the old
//! file away and creating the new one they disagree, and that disagreement is
//! one of the signals used here.

use std::time::SystemTime;

use crate::config::RotationStrategy;
use crate::input::FileId;

/// Classification of one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Same file, new bytes appended.
    SameGrew,
    /// The handle has new bytes but the name now reports a different size: a new
    /// file has probably taken the name. Drain the handle and look again at once.
    GrewDiverged,
    /// Nothing to do.
    SameUnchanged,
    /// Same identity and size, newer modification time. Treated as unchanged;
    /// the tailer moves its modification marker forward.
    AmbiguousSameSize,
    /// The name points at a new file and the old handle still has unread bytes.
    RotatedWithResidual,
    /// The name points at a new file.
    Rotated,
    /// The file is shorter than what has already been read.
    Truncated,
    /// The name does not resolve this tick.
    NotFound,
}

impl Verdict {
    /// Whether the old handle must be drained before anything else happens.
    pub fn needs_drain(&self) -> bool {
        matches!(
            self,
            Verdict::SameGrew | Verdict::GrewDiverged | Verdict::RotatedWithResidual
        )
    }
}

/// What the tailer recorded about the file it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    /// Offset up to which complete lines have been delivered
    pub position: u64,
    /// Identity recorded when the handle was opened
    pub file_id: FileId,
    /// Modification time marker
    pub last_modified: SystemTime,
}

/// Samples taken in the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Identity currently bound to the path, `None` when the probe failed or
    /// was not taken
    pub file_id: Option<FileId>,
    /// Bytes reachable through the open handle
    pub channel_size: u64,
    /// Size reported by a fresh stat of the path, `None` when the stat failed
    pub path_length: Option<u64>,
    /// Modification time reported by the same stat
    pub path_modified: Option<SystemTime>,
}

impl Observation {
    fn is_newer_than(&self, marker: SystemTime) -> bool {
        self.path_modified.is_some_and(|modified| modified > marker)
    }
}

/// Classify the current tick.
pub fn detect(strategy: RotationStrategy, baseline: &Baseline, obs: &Observation) -> Verdict {
    match strategy {
        RotationStrategy::Inode => detect_by_inode(baseline, obs),
        RotationStrategy::SizeAndMtime => detect_by_size(baseline, obs),
    }
}

fn detect_by_inode(baseline: &Baseline, obs: &Observation) -> Verdict {
    let (Some(current_id), Some(path_length)) = (obs.file_id, obs.path_length) else {
        return Verdict::NotFound;
    };

    if current_id != baseline.file_id {
        return if obs.channel_size > baseline.position {
            Verdict::RotatedWithResidual
        } else {
            Verdict::Rotated
        };
    }

    grew_or_idle(baseline, obs, path_length, Verdict::AmbiguousSameSize)
}

fn detect_by_size(baseline: &Baseline, obs: &Observation) -> Verdict {
    let Some(path_length) = obs.path_length else {
        return Verdict::NotFound;
    };

    // Without identities a newer file of the same size is indistinguishable
    // from a rotation.
    grew_or_idle(baseline, obs, path_length, Verdict::Rotated)
}

fn grew_or_idle(
    baseline: &Baseline,
    obs: &Observation,
    path_length: u64,
    newer_same_size: Verdict,
) -> Verdict {
    if obs.channel_size < baseline.position {
        return Verdict::Truncated;
    }

    if obs.channel_size > baseline.position {
        return if path_length != obs.channel_size {
            Verdict::GrewDiverged
        } else {
            Verdict::SameGrew
        };
    }

    if obs.is_newer_than(baseline.last_modified) {
        return newer_same_size;
    }

    Verdict::SameUnchanged
}
