// SPDX-License-Identifier: Apache-2.0

//! Helpers for creating a tailer with defaults applied.

use std::path::PathBuf;

use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_DELAY_MS, TailerConfig};
use crate::error::Result;
use crate::listener::TailerListener;
use crate::tailer::Tailer;

/// Create a tailer that starts at the beginning of the file, polling every 100ms.
pub fn create<L: TailerListener>(path: impl Into<PathBuf>, listener: L) -> Result<Tailer<L>> {
    create_at(path, listener, 0)
}

/// Create a tailer that starts at `position`, polling every 100ms.
pub fn create_at<L: TailerListener>(
    path: impl Into<PathBuf>,
    listener: L,
    position: u64,
) -> Result<Tailer<L>> {
    create_with(path, listener, position, DEFAULT_DELAY_MS, DEFAULT_BUFFER_SIZE)
}

/// Create a tailer with every parameter given.
///
/// Fails with [`Error::Config`](crate::Error::Config) when `buffer_size` is below
/// 16 bytes or `delay_ms` is zero.
pub fn create_with<L: TailerListener>(
    path: impl Into<PathBuf>,
    listener: L,
    position: u64,
    delay_ms: u64,
    buffer_size: usize,
) -> Result<Tailer<L>> {
    let config = TailerConfig {
        delay_ms,
        buffer_size,
        start_position: position,
        ..Default::default()
    };
    create_from_config(path, listener, &config)
}

/// Create a tailer from a full configuration.
pub fn create_from_config<L: TailerListener>(
    path: impl Into<PathBuf>,
    listener: L,
    config: &TailerConfig,
) -> Result<Tailer<L>> {
    Tailer::new(path, listener, config)
}
