// SPDX-License-Identifier: Apache-2.0

//! Callbacks through which a tailer reports progress.
//!
//! All callbacks run on the tailer's own thread, in order. A slow listener
//! stalls tailing; hand the work to another thread (see [`ChannelListener`])
//! when that matters.

use std::borrow::Cow;
use std::time::SystemTime;

use tracing::debug;

use crate::bounded_channel::{self, BoundedReceiver, BoundedSender};
use crate::control::TailerHandle;
use crate::error::Error;

/// One line read from the followed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    bytes: &'a [u8],
    position: u64,
    modified: SystemTime,
}

impl<'a> Line<'a> {
    pub fn new(bytes: &'a [u8], position: u64, modified: SystemTime) -> Self {
        Self {
            bytes,
            position,
            modified,
        }
    }

    /// Line content without its terminator.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Offset just past this line's terminator. Restarting a tailer at this
    /// position resumes with the next line.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Modification time of the file the line was read from.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Line content as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.bytes)
    }
}

/// Receives a tailer's events.
///
/// Only [`handle_line`](TailerListener::handle_line) is required.
pub trait TailerListener: Send {
    /// Called once, when the tailer is constructed.
    fn init(&mut self, _handle: TailerHandle) {}

    /// The followed path does not resolve. May repeat while it stays missing.
    fn file_not_found(&mut self) {}

    /// A rotation was detected. Every line of the previous file that could be read
    /// has been delivered; lines that follow come from the new file.
    fn file_rotated(&mut self) {}

    /// A complete line. Positions increase strictly within one file.
    fn handle_line(&mut self, line: Line<'_>);

    /// A fatal error; the tailer exits right after without calling `stop`.
    fn handle_error(&mut self, _error: &Error) {}

    /// The tailer stopped because it was asked to.
    fn stop(&mut self) {}
}

impl<L: TailerListener + ?Sized> TailerListener for Box<L> {
    fn init(&mut self, handle: TailerHandle) {
        (**self).init(handle)
    }

    fn file_not_found(&mut self) {
        (**self).file_not_found()
    }

    fn file_rotated(&mut self) {
        (**self).file_rotated()
    }

    fn handle_line(&mut self, line: Line<'_>) {
        (**self).handle_line(line)
    }

    fn handle_error(&mut self, error: &Error) {
        (**self).handle_error(error)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Owned form of a listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailerEvent {
    Line {
        bytes: Vec<u8>,
        position: u64,
        modified: SystemTime,
    },
    FileNotFound,
    FileRotated,
    Error(String),
    Stopped,
}

/// Listener that forwards every callback into a bounded channel.
///
/// Sending blocks while the channel is full. Once the receiving side is dropped
/// the tailer is stopped, since nobody is left to consume its output.
pub struct ChannelListener {
    tx: BoundedSender<TailerEvent>,
    handle: Option<TailerHandle>,
}

impl ChannelListener {
    /// Create a listener and the receiver its events arrive on.
    pub fn new(capacity: usize) -> (Self, BoundedReceiver<TailerEvent>) {
        let (tx, rx) = bounded_channel::bounded(capacity);
        (Self { tx, handle: None }, rx)
    }

    /// Control handle of the tailer this listener was attached to.
    pub fn handle(&self) -> Option<&TailerHandle> {
        self.handle.as_ref()
    }

    fn send(&mut self, event: TailerEvent) {
        if self.tx.send_blocking(event).is_err() {
            debug!("Event receiver dropped, stopping tailer");
            if let Some(handle) = &self.handle {
                handle.stop();
            }
        }
    }
}

impl TailerListener for ChannelListener {
    fn init(&mut self, handle: TailerHandle) {
        self.handle = Some(handle);
    }

    fn file_not_found(&mut self) {
        self.send(TailerEvent::FileNotFound);
    }

    fn file_rotated(&mut self) {
        self.send(TailerEvent::FileRotated);
    }

    fn handle_line(&mut self, line: Line<'_>) {
        self.send(TailerEvent::Line {
            bytes: line.as_bytes().to_vec(),
            position: line.position(),
            modified: line.modified(),
        });
    }

    fn handle_error(&mut self, error: &Error) {
        self.send(TailerEvent::Error(error.to_string()));
    }

    fn stop(&mut self) {
        self.send(TailerEvent::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_accessors() {
        let modified = SystemTime::UNIX_EPOCH;
        let line = Line::new(b"hello \xffworld", 13, modified);

        assert_eq!(line.as_bytes(), b"hello \xffworld");
        assert_eq!(line.position(), 13);
        assert_eq!(line.modified(), modified);
        assert_eq!(line.to_string_lossy(), "hello \u{fffd}world");
    }

    #[test]
    fn test_channel_listener_forwards_events() {
        let (mut listener, rx) = ChannelListener::new(8);
        let handle = TailerHandle::new();
        listener.init(handle);

        listener.file_not_found();
        listener.handle_line(Line::new(b"a", 2, SystemTime::UNIX_EPOCH));
        listener.file_rotated();
        listener.stop();

        assert_eq!(rx.try_recv(), Some(TailerEvent::FileNotFound));
        assert_eq!(
            rx.try_recv(),
            Some(TailerEvent::Line {
                bytes: b"a".to_vec(),
                position: 2,
                modified: SystemTime::UNIX_EPOCH,
            })
        );
        assert_eq!(rx.try_recv(), Some(TailerEvent::FileRotated));
        assert_eq!(rx.try_recv(), Some(TailerEvent::Stopped));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_channel_listener_stops_tailer_when_receiver_dropped() {
        let (mut listener, rx) = ChannelListener::new(1);
        let handle = TailerHandle::new();
        listener.init(handle.clone());
        drop(rx);

        listener.handle_line(Line::new(b"lost", 5, SystemTime::UNIX_EPOCH));

        assert!(!handle.is_running());
    }

    #[test]
    fn test_boxed_listener_delegates() {
        let (listener, rx) = ChannelListener::new(4);
        let mut boxed: Box<dyn TailerListener> = Box::new(listener);

        boxed.file_rotated();
        boxed.handle_error(&Error::Config("bad".to_string()));

        assert_eq!(rx.try_recv(), Some(TailerEvent::FileRotated));
        assert_eq!(
            rx.try_recv(),
            Some(TailerEvent::Error("Configuration error: bad".to_string()))
        );
    }
}
