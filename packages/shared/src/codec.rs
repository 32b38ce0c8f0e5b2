//! Newline framing for the chat protocol.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Port the reference deployment listens on.
pub const DEFAULT_PORT: u16 = 8818;

/// Longest inbound line the server accepts, in bytes, excluding the newline.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// One decoded unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Line(String),
    /// A line longer than the limit. Its bytes are skipped up to the next newline.
    Oversized,
}

/// `\n`-delimited UTF-8 lines with a length cap.
///
/// Wraps [`LinesCodec`] so that an overlong line surfaces as
/// [`Frame::Oversized`] instead of an error. `FramedRead` ends the stream
/// after a decoder error, and one bad line must not end the session.
#[derive(Debug, Clone)]
pub struct LineCodec {
    inner: LinesCodec,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

fn into_frame(
    decoded: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Frame>, LinesCodecError> {
    match decoded {
        Ok(line) => Ok(line.map(Frame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
        Err(e) => Err(e),
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        into_frame(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        into_frame(self.inner.decode_eof(src))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), LinesCodecError> {
        self.inner.encode(line, dst)
    }
}
