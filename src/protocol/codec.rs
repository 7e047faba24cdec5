//! Frame codec
//!
//! Encoding and decoding of length-prefixed frames.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ Len (4, BE)  │     Payload (Len bytes)     │
//! └──────────────┴─────────────────────────────┘
//! ```
//!
//! A closed stream, whether between frames or part way through one, is an
//! orderly end of stream and reads as `Ok(None)`.

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RelayError, Result};

/// Length prefix size
pub const HEADER_SIZE: usize = 4;

/// Default cap for inbound frames (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Bytes pulled from the transport per read call
const READ_CHUNK: usize = 8 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a payload into a frame
///
/// Format: payload_len (4) + payload
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let len = u32::try_from(payload.len()).map_err(|_| RelayError::Encoding {
        size: payload.len(),
    })?;

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(len);
    frame.put_slice(payload);

    Ok(frame.freeze())
}

/// Write a payload as one frame to a stream
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).map_err(RelayError::from_io)?;
    writer.flush().map_err(RelayError::from_io)?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Split one complete frame off the front of `buf`
///
/// Returns `Ok(None)` and leaves `buf` untouched while the frame is
/// incomplete.
pub fn decode_frame(buf: &mut BytesMut, max_size: usize) -> Result<Option<Bytes>> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    // Validate before waiting on (or allocating for) the payload
    if payload_len > max_size {
        return Err(RelayError::FrameTooLarge {
            size: payload_len,
            max: max_size,
        });
    }

    if buf.len() < HEADER_SIZE + payload_len {
        buf.reserve(HEADER_SIZE + payload_len - buf.len());
        return Ok(None);
    }

    buf.advance(HEADER_SIZE);
    Ok(Some(buf.split_to(payload_len).freeze()))
}

/// Read exactly one frame from a stream, capped at [`MAX_FRAME_SIZE`]
///
/// Blocks until the full frame has arrived. Short reads are retried; the
/// reader is never asked for bytes past the end of this frame.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    read_frame_limited(reader, MAX_FRAME_SIZE)
}

/// [`read_frame`] with a caller-chosen cap
///
/// A length prefix above `max_size` fails with [`RelayError::FrameTooLarge`]
/// before the payload buffer is allocated.
pub fn read_frame_limited<R: Read>(reader: &mut R, max_size: usize) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; HEADER_SIZE];
    if !read_full(reader, &mut header)? {
        return Ok(None);
    }

    let payload_len = u32::from_be_bytes(header) as usize;
    if payload_len > max_size {
        return Err(RelayError::FrameTooLarge {
            size: payload_len,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; payload_len];
    if !read_full(reader, &mut payload)? {
        return Ok(None);
    }

    Ok(Some(payload))
}

/// Fill `buf` completely. `Ok(false)` means the stream closed first.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(RelayError::from_io(e)),
        }
    }
    Ok(true)
}

// =============================================================================
// Buffered Reader
// =============================================================================

/// Buffered frame reader that survives read deadlines
///
/// Bytes received before a deadline expires stay buffered, so the next call
/// resumes the same frame instead of losing alignment.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame_size: usize,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader with the default frame cap
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_size(inner, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            max_frame_size,
        }
    }

    /// Read the next frame
    ///
    /// `Ok(None)` on end of stream. A deadline expiry surfaces as
    /// [`RelayError::Timeout`] with any partial frame kept for the next call.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.max_frame_size)? {
                return Ok(Some(frame));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    if !self.buf.is_empty() {
                        tracing::debug!(
                            "Stream closed with {} bytes of an incomplete frame buffered",
                            self.buf.len()
                        );
                    }
                    return Ok(None);
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(RelayError::from_io(e)),
            }
        }
    }

    /// Bytes received but not yet returned as a frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}
