//! Newline-delimited JSON framing
//!
//! Every frame is one compact JSON document terminated by `\n`. The [`Framer`]
//! accumulates raw socket bytes and yields complete documents regardless of how
//! reads split or coalesce them. Bytes after the last terminator stay buffered
//! until the next [`Framer::feed`].
//!
//! "Not enough bytes yet" (`Ok(None)`) and "a complete frame that is not JSON"
//! ([`FrameError::InvalidJson`]) are distinct outcomes.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::constants::{DEFAULT_MAX_FRAME_SIZE, FRAME_DELIMITER, READ_CHUNK_SIZE};
use crate::error::{Error, ProtocolError, Result};

/// Framing errors. Both are terminal for the connection.
#[derive(Debug, Error)]
pub enum FrameError {
    /// No terminator within the frame size limit
    #[error("frame exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit
        limit: usize,
    },

    /// A fully received frame is not valid JSON
    #[error("invalid JSON frame: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Incremental decoder for newline-delimited JSON
#[derive(Debug)]
pub struct Framer {
    buf: BytesMut,
    /// Offset up to which `buf` is known to hold no terminator
    scan_from: usize,
    max_frame_size: usize,
}

impl Framer {
    /// Create a framer with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a framer with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            scan_from: 0,
            max_frame_size,
        }
    }

    /// Append raw bytes to the buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed as frames
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete frame
    ///
    /// Returns `Ok(None)` when the buffer holds at most a partial frame. Blank
    /// lines are skipped.
    pub fn next_frame(&mut self) -> std::result::Result<Option<Value>, FrameError> {
        loop {
            let offset = self.buf[self.scan_from..]
                .iter()
                .position(|b| *b == FRAME_DELIMITER);

            let Some(offset) = offset else {
                self.scan_from = self.buf.len();
                if self.buf.len() > self.max_frame_size {
                    return Err(FrameError::TooLarge {
                        limit: self.max_frame_size,
                    });
                }
                return Ok(None);
            };

            let end = self.scan_from + offset;
            let line = self.buf.split_to(end + 1);
            self.scan_from = 0;

            let payload = line[..end].trim_ascii();
            if payload.is_empty() {
                continue;
            }
            if payload.len() > self.max_frame_size {
                return Err(FrameError::TooLarge {
                    limit: self.max_frame_size,
                });
            }

            return serde_json::from_slice(payload)
                .map(Some)
                .map_err(FrameError::InvalidJson);
        }
    }

    /// Iterate over every complete frame currently buffered
    ///
    /// The iterator ends when only a partial frame remains, or right after
    /// yielding an error. Call again after the next [`feed`](Self::feed).
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            framer: self,
            failed: false,
        }
    }

    /// Decode whatever remains once the peer has stopped sending
    ///
    /// An unterminated trailing document is accepted as the final frame.
    pub fn finish(&mut self) -> std::result::Result<Option<Value>, FrameError> {
        if let Some(frame) = self.next_frame()? {
            return Ok(Some(frame));
        }

        let rest = self.buf.split();
        self.scan_from = 0;

        let payload = rest.trim_ascii();
        if payload.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(payload)
            .map(Some)
            .map_err(FrameError::InvalidJson)
    }

    /// Read from `reader` until one frame is available
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Option<Value>>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = self.next_frame().map_err(ProtocolError::from)? {
                return Ok(Some(frame));
            }

            self.buf.reserve(READ_CHUNK_SIZE);
            let n = reader.read_buf(&mut self.buf).await?;
            if n == 0 {
                return self
                    .finish()
                    .map_err(|e| Error::Protocol(ProtocolError::from(e)));
            }
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over buffered frames, see [`Framer::frames`]
pub struct Frames<'a> {
    framer: &'a mut Framer,
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = std::result::Result<Value, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.framer.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Serialize a message as one frame
pub fn encode_frame<T: Serialize + ?Sized>(
    message: &T,
) -> std::result::Result<Bytes, serde_json::Error> {
    let mut buf = BytesMut::with_capacity(256);
    serde_json::to_writer((&mut buf).writer(), message)?;
    buf.put_u8(FRAME_DELIMITER);
    Ok(buf.freeze())
}
