// SPDX-License-Identifier: Apache-2.0

//! Configuration for a tailer.

use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::input::MIN_BUFFER_SIZE;

/// Default polling interval in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 100;

/// Default framer buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Which observations the rotation detector uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// File identity (device + inode) is the primary signal, with size and
    /// modification time corroborating it.
    #[default]
    Inode,
    /// Size and modification time only. Use this where file identities are not
    /// stable. A successor that happens to match the old file's size is not read
    /// until it is modified again.
    SizeAndMtime,
}

impl std::str::FromStr for RotationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inode" => Ok(RotationStrategy::Inode),
            "size_and_mtime" | "size" | "mtime" => Ok(RotationStrategy::SizeAndMtime),
            _ => Err(format!(
                "Invalid rotation strategy '{}'. Valid options: inode, size_and_mtime",
                s
            )),
        }
    }
}

/// Configuration for following a single file
#[derive(Debug, Clone, Deserialize)]
pub struct TailerConfig {
    /// How often to poll the file for changes (in milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Size of the read buffer (in bytes)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Byte offset to start reading from, usually a persisted checkpoint
    #[serde(default)]
    pub start_position: u64,

    /// Modification time marker for the first check (milliseconds since the epoch).
    /// When unset, the modification time of the file at first open is used.
    #[serde(default)]
    pub last_modified_ms: Option<u64>,

    /// Close and reopen the file between polls
    #[serde(default)]
    pub reopen: bool,

    /// Rotation detection strategy
    #[serde(default)]
    pub strategy: RotationStrategy,
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            buffer_size: default_buffer_size(),
            start_position: 0,
            last_modified_ms: None,
            reopen: false,
            strategy: RotationStrategy::default(),
        }
    }
}

impl TailerConfig {
    /// Get the polling interval as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Get the configured modification time marker, if any
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified_ms
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(format!(
                "buffer_size must be at least {} bytes, got {}",
                MIN_BUFFER_SIZE, self.buffer_size
            ));
        }

        if self.delay_ms < 1 {
            return Err("delay_ms must be at least 1ms, got 0ms".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TailerConfig::default();
        assert_eq!(config.delay_ms, 100);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.start_position, 0);
        assert_eq!(config.strategy, RotationStrategy::Inode);
        assert!(!config.reopen);
        assert!(config.last_modified().is_none());
        assert_eq!(config.delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TailerConfig::default();

        config.buffer_size = 15;
        assert!(config.validate().is_err());

        config.buffer_size = 16;
        assert!(config.validate().is_ok());

        config.delay_ms = 0;
        assert!(config.validate().is_err());

        config.delay_ms = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: TailerConfig =
            serde_json::from_str(r#"{"start_position": 1024, "strategy": "size_and_mtime"}"#)
                .unwrap();
        assert_eq!(config.start_position, 1024);
        assert_eq!(config.strategy, RotationStrategy::SizeAndMtime);
        assert_eq!(config.delay_ms, DEFAULT_DELAY_MS);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_last_modified_conversion() {
        let config = TailerConfig {
            last_modified_ms: Some(1_500),
            ..Default::default()
        };
        assert_eq!(
            config.last_modified(),
            Some(UNIX_EPOCH + Duration::from_millis(1_500))
        );
    }

    #[test]
    fn test_rotation_strategy_from_str() {
        assert_eq!(
            "inode".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::Inode
        );
        assert_eq!(
            "SIZE_AND_MTIME".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::SizeAndMtime
        );
        assert!("checksum".parse::<RotationStrategy>().is_err());
    }
}
