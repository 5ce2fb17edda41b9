//! Packet-line framing
//!
//! The smart-HTTP wire format frames each payload with a 4-character
//! lowercase-hex length prefix that counts itself: a 5-byte payload becomes
//! `0009<payload>`. The special frame `0000` is a flush packet marking the
//! end of a section; it is distinct from `0004`, an empty payload line.

use crate::errors::TransferError;
use bytes::Bytes;

const PREFIX_LEN: usize = 4;
const FLUSH: &[u8; 4] = b"0000";

/// One parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// `0000` section terminator, carries no payload.
    Flush,
    Line(Bytes),
}

impl Packet {
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Packet::Flush => None,
            Packet::Line(payload) => Some(payload),
        }
    }
}

/// Frame a payload. The empty payload encodes as a flush packet.
pub fn encode(payload: &[u8]) -> Bytes {
    if payload.is_empty() {
        return Bytes::from_static(FLUSH);
    }

    let mut framed = Vec::with_capacity(PREFIX_LEN + payload.len());
    framed.extend_from_slice(format!("{:04x}", PREFIX_LEN + payload.len()).as_bytes());
    framed.extend_from_slice(payload);
    Bytes::from(framed)
}

/// Parse the next frame at `cursor`, advancing past it.
///
/// Returns `None` at the end of the buffer. A prefix that is not hex, or a
/// frame that claims more bytes than the buffer holds, is a protocol
/// violation.
pub fn read_packet(data: &[u8], cursor: &mut usize) -> Result<Option<Packet>, TransferError> {
    if *cursor >= data.len() {
        return Ok(None);
    }

    let prefix = data
        .get(*cursor..*cursor + PREFIX_LEN)
        .ok_or_else(|| TransferError::Protocol("truncated packet length prefix".to_string()))?;
    let prefix = std::str::from_utf8(prefix)
        .ok()
        .and_then(|hex| usize::from_str_radix(hex, 16).ok())
        .ok_or_else(|| {
            TransferError::Protocol(format!("packet length prefix is not hex: {prefix:?}"))
        })?;
    *cursor += PREFIX_LEN;

    if prefix == 0 {
        return Ok(Some(Packet::Flush));
    }
    if prefix < PREFIX_LEN {
        return Err(TransferError::Protocol(format!(
            "packet length {prefix} is shorter than its own prefix"
        )));
    }

    let payload_len = prefix - PREFIX_LEN;
    let payload = data
        .get(*cursor..*cursor + payload_len)
        .ok_or_else(|| {
            TransferError::Protocol(format!(
                "packet claims {payload_len} payload bytes but the stream ends early"
            ))
        })?;
    *cursor += payload_len;

    Ok(Some(Packet::Line(Bytes::copy_from_slice(payload))))
}
