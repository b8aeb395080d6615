use bytes::BytesMut;
use std::fmt;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// End of transmission
pub const EOT: u8 = 0x04;
/// Carriage return
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;
/// Group separator, delimits fields inside a result
pub const GS: u8 = 0x1D;
/// Record separator
pub const RS: u8 = 0x1E;

/// Inbound frames longer than this without a terminator are treated as garbage
const MAX_FRAME_LEN: usize = 64 * 1024;

/// Commands understood by the camera controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    /// Run one capture/decode cycle
    Trigger,
    /// Switch the aiming light on
    AimOn,
    /// Switch the aiming light off
    AimOff,
}

impl CameraCommand {
    pub fn aim(enabled: bool) -> Self {
        if enabled {
            CameraCommand::AimOn
        } else {
            CameraCommand::AimOff
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraCommand::Trigger => "< >",
            CameraCommand::AimOn => "<l1>",
            CameraCommand::AimOff => "<l0>",
        }
    }

    /// Wire form, terminated with CRLF
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.as_str().len() + 2);
        frame.extend_from_slice(self.as_str().as_bytes());
        frame.extend_from_slice(b"\r\n");
        frame
    }
}

impl fmt::Display for CameraCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes that may pad the end of a result frame
pub fn is_trailer_byte(byte: u8) -> bool {
    matches!(byte, EOT | CR | LF | RS)
}

/// Encodes commands and splits the camera's inbound byte stream into result frames.
///
/// A frame ends at LF or EOT. The camera may also send a result with no
/// terminator at all, so the reader calls [`CameraCodec::flush`] once the
/// line goes quiet. Frames made only of control bytes or whitespace (for
/// example the EOT that follows a CRLF-terminated result) are dropped.
#[derive(Debug, Default)]
pub struct CameraCodec;

impl CameraCodec {
    fn is_filler(frame: &[u8]) -> bool {
        frame
            .iter()
            .all(|b| is_trailer_byte(*b) || b.is_ascii_whitespace())
    }

    /// Take everything still buffered as one frame, unless it is only filler
    pub fn flush(&mut self, src: &mut BytesMut) -> Option<Vec<u8>> {
        let rest = src.split();
        if rest.is_empty() || Self::is_filler(&rest) {
            None
        } else {
            Some(rest.to_vec())
        }
    }
}

impl Decoder for CameraCodec {
    type Item = Vec<u8>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(end) = src.iter().position(|b| *b == LF || *b == EOT) else {
                if src.len() > MAX_FRAME_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("result frame exceeds {} bytes", MAX_FRAME_LEN),
                    ));
                }
                return Ok(None);
            };

            let frame = src.split_to(end + 1);
            if Self::is_filler(&frame) {
                continue;
            }
            return Ok(Some(frame.to_vec()));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        Ok(self.flush(src))
    }
}

impl Encoder<CameraCommand> for CameraCodec {
    type Error = io::Error;

    fn encode(&mut self, item: CameraCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_frame());
        Ok(())
    }
}
