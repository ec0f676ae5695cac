use std::fmt::{Debug, Display};

use common::Color;
use log::debug;
use thiserror::Error;

use self::pack::{CheckSum, ColorPack};

pub mod pack;

/// Leading byte of every command frame
pub const FRAME_MARKER: u8 = b'U';

/// `U` followed by four hex-encoded bytes
pub const FRAME_LEN: usize = 1 + 4 * 2;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("expected 9 bytes, got {0}")]
    Length(usize),
    #[error("frame does not start with `U`")]
    Marker,
    #[error("byte {0} is not a hex digit")]
    Digit(usize),
    #[error("checksum mismatch: frame carries {carried:#04x}, payload needs {expected:#04x}")]
    Checksum { carried: u8, expected: u8 },
}

/// The ASCII command that sets the device color.
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct CommandFrame([u8; FRAME_LEN]);

impl CommandFrame {
    /// Build the frame for a color. Total over every input.
    pub fn encode(color: Color) -> Self {
        let bytes = ColorPack {
            red: color.r.into(),
            green: color.g.into(),
            blue: color.b.into(),
            ..Default::default()
        }
        .checksum_pack();

        let mut frame = [FRAME_MARKER; FRAME_LEN];
        for (i, byte) in bytes.iter().enumerate() {
            frame[1 + i * 2] = HEX_DIGITS[(byte >> 4) as usize];
            frame[2 + i * 2] = HEX_DIGITS[(byte & 0x0f) as usize];
        }

        let frame = CommandFrame(frame);
        debug!("Encoded {:?} as {}", color, frame);
        frame
    }

    /// Validate a received frame and return the color it carries.
    ///
    /// Hex digits are accepted in either case.
    pub fn decode(bytes: &[u8]) -> Result<Color, FrameError> {
        if bytes.len() != FRAME_LEN {
            return Err(FrameError::Length(bytes.len()));
        }
        if bytes[0] != FRAME_MARKER {
            return Err(FrameError::Marker);
        }

        let mut payload = [0u8; 4];
        for (i, value) in payload.iter_mut().enumerate() {
            let high = hex_value(bytes, 1 + i * 2)?;
            let low = hex_value(bytes, 2 + i * 2)?;
            *value = (high << 4) | low;
        }

        let [red, green, blue, carried] = payload;
        let expected = ColorPack::default().calculate_checksum(&[red, green, blue]);
        if carried != expected {
            return Err(FrameError::Checksum { carried, expected });
        }

        Ok(Color::new(red, green, blue))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from `U` and lowercase hex digits
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

fn hex_value(bytes: &[u8], index: usize) -> Result<u8, FrameError> {
    match bytes[index] {
        b @ b'0'..=b'9' => Ok(b - b'0'),
        b @ b'a'..=b'f' => Ok(b - b'a' + 10),
        b @ b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(FrameError::Digit(index)),
    }
}

/// Build the frame for a color.
pub fn encode(color: Color) -> CommandFrame {
    CommandFrame::encode(color)
}

impl From<Color> for CommandFrame {
    fn from(color: Color) -> Self {
        CommandFrame::encode(color)
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Display for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Debug for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandFrame({:?})", self.as_str())
    }
}
