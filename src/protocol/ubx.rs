//! UBX binary frame codec.
//!
//! Implements the receiver's native binary control protocol:
//!
//! ```text
//! ┌──────┬──────┬───────┬────────┬──────────┬─────────┬──────┬──────┐
//! │ 0xB5 │ 0x62 │ class │ msg id │ length   │ payload │ CK_A │ CK_B │
//! │ 1B   │ 1B   │ 1B    │ 1B     │ 2B LE    │ N bytes │ 1B   │ 1B   │
//! └──────┴──────┴───────┴────────┴──────────┴─────────┴──────┴──────┘
//! ```
//!
//! The checksum is the 8-bit Fletcher algorithm over class id, message id,
//! both length bytes, and the payload.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{GnssError, Result};
use crate::stream::TimedStream;

/// First synchronization byte.
pub const SYNC1: u8 = 0xB5;
/// Second synchronization byte.
pub const SYNC2: u8 = 0x62;

/// Upper bound on a sane payload length. A length field above this is
/// treated as framing corruption rather than a frame to buffer.
pub const MAX_UBX_PAYLOAD: usize = 2048;

/// A decoded UBX frame: addressing plus raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    /// Message class.
    pub class_id: u8,
    /// Message id within the class.
    pub message_id: u8,
    /// Payload bytes; length is implicit.
    pub payload: Bytes,
}

impl UbxFrame {
    /// Create a frame from parts.
    pub fn new(class_id: u8, message_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            class_id,
            message_id,
            payload: payload.into(),
        }
    }

    /// Encode to wire bytes, including sync marker and checksum.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len() as u16;
        let mut out = Vec::with_capacity(8 + self.payload.len());
        out.push(SYNC1);
        out.push(SYNC2);
        out.push(self.class_id);
        out.push(self.message_id);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.payload);
        let (ck_a, ck_b) = checksum(self.class_id, self.message_id, &self.payload);
        out.push(ck_a);
        out.push(ck_b);
        out
    }
}

/// 8-bit Fletcher checksum over class, id, length bytes, and payload.
pub fn checksum(class_id: u8, message_id: u8, payload: &[u8]) -> (u8, u8) {
    let len = payload.len() as u16;
    let header = [class_id, message_id, (len & 0xFF) as u8, (len >> 8) as u8];

    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;
    for &b in header.iter().chain(payload.iter()) {
        ck_a = ck_a.wrapping_add(b);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Read one complete UBX frame from the stream.
///
/// Expects the stream to be positioned at the sync marker. Consumes the
/// whole frame on success. Fails with [`GnssError::FrameSync`] if the
/// marker is absent or the length field is implausible,
/// [`GnssError::ChecksumMismatch`] if the trailing checksum disagrees, and
/// propagates `Timeout`/`Closed` from the stream.
pub async fn read_frame<R, W>(stream: &mut TimedStream<R, W>) -> Result<UbxFrame>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if stream.read_byte().await? != SYNC1 {
        return Err(GnssError::FrameSync);
    }
    if stream.read_byte().await? != SYNC2 {
        return Err(GnssError::FrameSync);
    }

    let class_id = stream.read_byte().await?;
    let message_id = stream.read_byte().await?;

    let mut len_bytes = [0u8; 2];
    stream.read_exact(&mut len_bytes).await?;
    let len = u16::from_le_bytes(len_bytes) as usize;
    if len > MAX_UBX_PAYLOAD {
        return Err(GnssError::FrameSync);
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;

    let mut ck = [0u8; 2];
    stream.read_exact(&mut ck).await?;

    let (ck_a, ck_b) = checksum(class_id, message_id, &payload);
    if ck != [ck_a, ck_b] {
        return Err(GnssError::ChecksumMismatch {
            expected: u16::from_be_bytes(ck),
            computed: u16::from_be_bytes([ck_a, ck_b]),
        });
    }

    Ok(UbxFrame::new(class_id, message_id, payload))
}
