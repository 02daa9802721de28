//! Binary wire protocol for the ground link.
//!
//! Two frame types cross the TCP link, both little-endian and guarded by a
//! single-byte XOR checksum:
//!
//! Command (ground → satellite), 17 bytes:
//! `[0xAA][cmd:u8][length:u16=12][param1:u32][param2:u32][fparam:f32][checksum:u8]`
//!
//! Telemetry (satellite → ground), 41 bytes:
//! `[0xBB][id:u8=0x01][payload_len:u8=37][timestamp:u32][attitude:3xf32]`
//! `[position:3xf32][temperature:u32][power:u32][status:u8][checksum:u8]`
//!
//! The command checksum covers the 16 bytes before it; the telemetry checksum
//! covers everything from the 0xBB header through the status byte.
//! `payload_len` counts the payload bytes after the length byte and before
//! the checksum, and both ends enforce that definition.

use heapless::Vec;
use thiserror::Error;

pub const CMD_HEADER: u8 = 0xAA;
pub const CMD_FRAME_LEN: usize = 17;
pub const CMD_PAYLOAD_LEN: u16 = 12;

pub const TLM_HEADER: u8 = 0xBB;
pub const TLM_FRAME_ID: u8 = 0x01;
pub const TLM_FRAME_LEN: usize = 41;
pub const TLM_PAYLOAD_LEN: u8 = 37;

/// Accumulation capacity for the stream deframers. Large enough to hold a
/// partial frame plus one full socket read.
const DEFRAME_BUF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid frame header byte 0x{found:02X}")]
    InvalidHeader { found: u8 },
    #[error("truncated frame: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("invalid declared payload length {declared}")]
    InvalidLength { declared: u16 },
    #[error("checksum mismatch: frame carried 0x{expected:02X}, computed 0x{computed:02X}")]
    InvalidChecksum { expected: u8, computed: u8 },
    #[error("unknown command code {0}")]
    UnknownCommandCode(u8),
}

/// XOR of every byte in `data`.
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    Nop = 0,
    Reset = 1,
    AdcsSet = 2,
    GetTelemetry = 3,
    SetParam = 4,
    Shutdown = 5,
}

impl TryFrom<u8> for CommandCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandCode::Nop),
            1 => Ok(CommandCode::Reset),
            2 => Ok(CommandCode::AdcsSet),
            3 => Ok(CommandCode::GetTelemetry),
            4 => Ok(CommandCode::SetParam),
            5 => Ok(CommandCode::Shutdown),
            other => Err(ProtocolError::UnknownCommandCode(other)),
        }
    }
}

/// A decoded ground command. Immutable once decoded, consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub code: CommandCode,
    pub param1: u32,
    pub param2: u32,
    pub fparam: f32,
}

impl Command {
    pub fn new(code: CommandCode) -> Self {
        Self {
            code,
            param1: 0,
            param2: 0,
            fparam: 0.0,
        }
    }

    pub fn encode(&self) -> [u8; CMD_FRAME_LEN] {
        let mut frame = [0u8; CMD_FRAME_LEN];
        frame[0] = CMD_HEADER;
        frame[1] = self.code as u8;
        frame[2..4].copy_from_slice(&CMD_PAYLOAD_LEN.to_le_bytes());
        frame[4..8].copy_from_slice(&self.param1.to_le_bytes());
        frame[8..12].copy_from_slice(&self.param2.to_le_bytes());
        frame[12..16].copy_from_slice(&self.fparam.to_le_bytes());
        frame[16] = xor_checksum(&frame[..16]);
        frame
    }

    /// Decodes one command frame from the front of `buf`.
    ///
    /// Validation order: header byte, frame length, declared payload length,
    /// checksum, command code. The checksum is verified before the code is
    /// interpreted, so a corrupted code byte surfaces as `InvalidChecksum`
    /// rather than `UnknownCommandCode`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.is_empty() {
            return Err(ProtocolError::Truncated {
                needed: CMD_FRAME_LEN,
                got: 0,
            });
        }
        if buf[0] != CMD_HEADER {
            return Err(ProtocolError::InvalidHeader { found: buf[0] });
        }
        if buf.len() < CMD_FRAME_LEN {
            return Err(ProtocolError::Truncated {
                needed: CMD_FRAME_LEN,
                got: buf.len(),
            });
        }
        let declared = u16::from_le_bytes([buf[2], buf[3]]);
        if declared != CMD_PAYLOAD_LEN {
            return Err(ProtocolError::InvalidLength { declared });
        }
        let expected = buf[16];
        let computed = xor_checksum(&buf[..16]);
        if expected != computed {
            return Err(ProtocolError::InvalidChecksum { expected, computed });
        }
        let code = CommandCode::try_from(buf[1])?;

        Ok(Self {
            code,
            param1: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            param2: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            fparam: f32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }
}

/// One encoded snapshot of satellite physical state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryFrame {
    pub timestamp: u32,
    pub attitude: [f32; 3],
    pub position: [f32; 3],
    pub temperature: u32,
    pub power: u32,
    pub status: u8,
}

impl TelemetryFrame {
    pub fn encode(&self) -> [u8; TLM_FRAME_LEN] {
        let mut frame = [0u8; TLM_FRAME_LEN];
        frame[0] = TLM_HEADER;
        frame[1] = TLM_FRAME_ID;
        frame[2] = TLM_PAYLOAD_LEN;
        frame[3..7].copy_from_slice(&self.timestamp.to_le_bytes());
        for (i, axis) in self.attitude.iter().enumerate() {
            let offset = 7 + i * 4;
            frame[offset..offset + 4].copy_from_slice(&axis.to_le_bytes());
        }
        for (i, axis) in self.position.iter().enumerate() {
            let offset = 19 + i * 4;
            frame[offset..offset + 4].copy_from_slice(&axis.to_le_bytes());
        }
        frame[31..35].copy_from_slice(&self.temperature.to_le_bytes());
        frame[35..39].copy_from_slice(&self.power.to_le_bytes());
        frame[39] = self.status;
        frame[40] = xor_checksum(&frame[..40]);
        frame
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.is_empty() {
            return Err(ProtocolError::Truncated {
                needed: TLM_FRAME_LEN,
                got: 0,
            });
        }
        if buf[0] != TLM_HEADER {
            return Err(ProtocolError::InvalidHeader { found: buf[0] });
        }
        if buf.len() < TLM_FRAME_LEN {
            return Err(ProtocolError::Truncated {
                needed: TLM_FRAME_LEN,
                got: buf.len(),
            });
        }
        if buf[1] != TLM_FRAME_ID {
            return Err(ProtocolError::InvalidHeader { found: buf[1] });
        }
        if buf[2] != TLM_PAYLOAD_LEN {
            return Err(ProtocolError::InvalidLength {
                declared: u16::from(buf[2]),
            });
        }
        let expected = buf[40];
        let computed = xor_checksum(&buf[..40]);
        if expected != computed {
            return Err(ProtocolError::InvalidChecksum { expected, computed });
        }

        let read_f32 = |offset: usize| {
            f32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };
        let read_u32 = |offset: usize| {
            u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };

        Ok(Self {
            timestamp: read_u32(3),
            attitude: [read_f32(7), read_f32(11), read_f32(15)],
            position: [read_f32(19), read_f32(23), read_f32(27)],
            temperature: read_u32(31),
            power: read_u32(35),
            status: buf[39],
        })
    }
}

/// Incremental deframer for one direction of a byte stream.
///
/// TCP gives no record boundaries, and a garbled stream has no natural
/// recovery point, so resynchronization is explicit: bytes ahead of the next
/// header byte are discarded (reported once as `InvalidHeader`), and a frame
/// that fails validation is dropped whole.
#[derive(Debug, Default)]
struct Deframer {
    buf: Vec<u8, DEFRAME_BUF_LEN>,
}

impl Deframer {
    fn extend(&mut self, bytes: &[u8]) {
        if self.buf.extend_from_slice(bytes).is_err() {
            // A peer that only ever sends garbage can fill the buffer
            // without a header byte in it; start over.
            self.buf.clear();
            let _ = self.buf.extend_from_slice(bytes);
        }
    }

    fn consume(&mut self, n: usize) {
        let remaining = self.buf.len() - n;
        self.buf.copy_within(n.., 0);
        self.buf.truncate(remaining);
    }

    /// Drops bytes ahead of the next `header` byte. Returns the error to
    /// report when garbage was skipped.
    fn resync(&mut self, header: u8) -> Option<ProtocolError> {
        if self.buf.is_empty() || self.buf[0] == header {
            return None;
        }
        let found = self.buf[0];
        match self.buf.iter().position(|&b| b == header) {
            Some(pos) => self.consume(pos),
            None => self.buf.clear(),
        }
        Some(ProtocolError::InvalidHeader { found })
    }

    fn next_frame<T>(
        &mut self,
        header: u8,
        frame_len: usize,
        decode: impl Fn(&[u8]) -> Result<T, ProtocolError>,
    ) -> Option<Result<T, ProtocolError>> {
        if let Some(err) = self.resync(header) {
            return Some(Err(err));
        }
        if self.buf.len() < frame_len {
            return None;
        }
        let result = decode(&self.buf[..frame_len]);
        self.consume(frame_len);
        Some(result)
    }
}

/// Deframes inbound command frames on the satellite side.
#[derive(Debug, Default)]
pub struct CommandDeframer {
    inner: Deframer,
}

impl CommandDeframer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.inner.extend(bytes);
    }

    /// Returns the next complete frame, a decode error for a dropped frame,
    /// or `None` when more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Result<Command, ProtocolError>> {
        self.inner
            .next_frame(CMD_HEADER, CMD_FRAME_LEN, Command::decode)
    }
}

/// Deframes inbound telemetry frames on the ground side.
#[derive(Debug, Default)]
pub struct TelemetryDeframer {
    inner: Deframer,
}

impl TelemetryDeframer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.inner.extend(bytes);
    }

    pub fn next_frame(&mut self) -> Option<Result<TelemetryFrame, ProtocolError>> {
        self.inner
            .next_frame(TLM_HEADER, TLM_FRAME_LEN, TelemetryFrame::decode)
    }
}
