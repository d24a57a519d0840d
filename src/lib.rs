// SPDX-License-Identifier: Apache-2.0

//! Rotation-aware tailing of a single append-only log file.
//!
//! A [`Tailer`] follows one path and hands every newly appended line to a
//! [`TailerListener`], together with the byte offset just past the line so the
//! caller can checkpoint and later resume from exactly that point.
//!
//! Features:
//! - Inode-based detection of rename-and-recreate and symlink swaps, with a
//!   size and modification time fallback
//! - Truncate-and-reuse detection
//! - Draining of bytes left in the old file before switching to its successor
//! - Pause, resume and stop from any thread
//!
//! ```no_run
//! use rotel_tailer::{ChannelListener, TailerEvent};
//!
//! let (listener, events) = ChannelListener::new(1024);
//! let tailer = rotel_tailer::create_at("/var/log/app.log", listener, 0)?;
//! let (handle, thread) = tailer.spawn()?;
//!
//! while let Some(event) = events.recv_blocking() {
//!     if let TailerEvent::Line { bytes, position, .. } = event {
//!         println!("{} @ {}", String::from_utf8_lossy(&bytes), position);
//!     }
//! #   break;
//! }
//!
//! handle.stop();
//! thread.join().expect("tailer thread panicked")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bounded_channel;
pub mod checkpoint;
pub mod config;
pub mod control;
pub mod error;
pub mod factory;
pub mod input;
pub mod listener;
pub mod rotation;
pub mod tailer;

pub use checkpoint::Checkpoint;
pub use config::{RotationStrategy, TailerConfig};
pub use control::TailerHandle;
pub use error::{Error, Result};
pub use factory::{create, create_at, create_from_config, create_with};
pub use input::{FileId, LineFramer, inode};
pub use listener::{ChannelListener, Line, TailerEvent, TailerListener};
pub use rotation::Verdict;
pub use tailer::Tailer;
