// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read, Seek, SeekFrom};

/// Smallest buffer the framer accepts.
pub const MIN_BUFFER_SIZE: usize = 16;

/// Splits the bytes of a positioned handle into lines.
///
/// Lines end at either `\n` or `\r`. A `\n` always emits, even an empty line.
/// A `\r` with nothing accumulated in front of it (the second half of `\n\r`, or
/// a leading `\r`) only moves the cursor. So `\r\n` yields the line followed by an
/// empty one. Everything else is line content; no decoding is applied.
///
/// The framer owns a fixed read buffer and a line accumulator, both reused across
/// calls so that steady-state polling does not allocate.
pub struct LineFramer {
    buffer: Vec<u8>,
    line: Vec<u8>,
}

impl LineFramer {
    /// Create a framer with a read buffer of `buffer_size` bytes.
    /// Sizes below [`MIN_BUFFER_SIZE`] are rounded up.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer: vec![0u8; buffer_size.max(MIN_BUFFER_SIZE)],
            line: Vec::new(),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Read every complete line between `position` and the current end of `reader`.
    ///
    /// `reader` must already be positioned at `position`. Each complete line is
    /// passed to `on_line` together with the offset just past its terminator.
    /// `is_running` is checked before each buffer fill; once it returns false the
    /// framer stops after the buffer in hand.
    ///
    /// On return the reader is seeked back to the offset right after the last
    /// terminator seen, so an unterminated tail is read again in full next time.
    /// That offset is returned. On a read error the lines already handed out stay
    /// delivered and the error is returned as is.
    pub fn read_lines<R, C, F>(
        &mut self,
        reader: &mut R,
        position: u64,
        is_running: C,
        mut on_line: F,
    ) -> io::Result<u64>
    where
        R: Read + Seek,
        C: Fn() -> bool,
        F: FnMut(&[u8], u64),
    {
        self.line.clear();

        let mut pos = position;
        let mut re_read = position;

        while is_running() {
            let num = match reader.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.line.clear();
                    return Err(e);
                }
            };

            for (i, &ch) in self.buffer[..num].iter().enumerate() {
                let after = pos + i as u64 + 1;
                match ch {
                    b'\n' => {
                        on_line(&self.line, after);
                        self.line.clear();
                        re_read = after;
                    }
                    b'\r' => {
                        if !self.line.is_empty() {
                            on_line(&self.line, after);
                            self.line.clear();
                        }
                        re_read = after;
                    }
                    _ => self.line.push(ch),
                }
            }

            pos += num as u64;
        }

        self.line.clear();
        reader.seek(SeekFrom::Start(re_read))?;
        Ok(re_read)
    }
}
