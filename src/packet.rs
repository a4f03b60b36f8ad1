//! Wire-format definitions for protocol packets.
//!
//! Every datagram exchanged with the receiver is one packet.  This module is
//! responsible for:
//! - Defining the on-wire framing (type tag, sequence field, payload, checksum).
//! - Serialising an outbound packet into a byte buffer ready for transmission.
//! - Deserialising a raw datagram back into its fields, returning errors for
//!   corrupted or malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! A packet is four fields joined by `|`:
//!
//! ```text
//! <type> '|' <seqfield> '|' <payload> '|' <checksum>
//! ```
//!
//! - `type` — one of `syn`, `dat`, `ack`, `fin`.  The sender emits the first
//!   three and consumes `ack`.
//! - `seqfield` — ASCII decimal sequence number on outbound packets.  On
//!   inbound acks it carries the cumulative ack value, and in SACK mode the
//!   form `<cum>;<s1>,<s2>,...`.  Interpreting the ack field is the
//!   [`crate::ack`] module's job; here it is an opaque string.
//! - `payload` — raw bytes, empty for syn/fin/ack.  The payload may itself
//!   contain `|`: decoding splits on the first two delimiters and the *last*
//!   one, never inside the payload.
//! - `checksum` — ASCII decimal CRC-32C over everything up to and including
//!   the final `|`.

use std::fmt;

/// Largest payload carried by a single `dat` packet, in bytes.
pub const MAX_PAYLOAD: usize = 1400;

/// Packet type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Opens the connection; consumes sequence number 0.
    Syn,
    /// Carries up to [`MAX_PAYLOAD`] bytes of application data.
    Dat,
    /// Acknowledgement from the receiver (never sent by this crate).
    Ack,
    /// Marks end of stream; consumes the final sequence number.
    Fin,
}

impl PacketKind {
    fn tag(self) -> &'static str {
        match self {
            PacketKind::Syn => "syn",
            PacketKind::Dat => "dat",
            PacketKind::Ack => "ack",
            PacketKind::Fin => "fin",
        }
    }

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"syn" => Some(PacketKind::Syn),
            b"dat" => Some(PacketKind::Dat),
            b"ack" => Some(PacketKind::Ack),
            b"fin" => Some(PacketKind::Fin),
            _ => None,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded inbound datagram.
///
/// The sequence field is kept as text because its shape depends on the ack
/// mode; see the module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub kind: PacketKind,
    /// Raw sequence/ack field between the first and second delimiter.
    pub field: String,
    pub payload: Vec<u8>,
}

/// Errors that can arise when parsing a raw datagram.
///
/// The first two variants mean the datagram could not be validated at all;
/// the control loop treats both as packet loss and keeps going.  The last
/// two mean a packet that *passed* checksum validation is structurally
/// broken, which is a protocol-format error.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than three delimiters; no complete frame present.
    Truncated,
    /// The trailing checksum is non-numeric or does not match the
    /// recomputed CRC.
    ChecksumMismatch,
    /// Type tag is not one of `syn`/`dat`/`ack`/`fin`.
    UnknownType,
    /// Sequence field is not valid text.
    BadFieldEncoding,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "datagram too short to contain a frame"),
            DecodeError::ChecksumMismatch => write!(f, "checksum verification failed"),
            DecodeError::UnknownType => write!(f, "unknown packet type tag"),
            DecodeError::BadFieldEncoding => write!(f, "malformed header field"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Serialise an outbound packet into a newly allocated byte vector.
///
/// The checksum is computed over the full `type|seq|payload|` prefix and
/// appended as decimal text.
pub fn encode(kind: PacketKind, seqno: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 24);
    buf.extend_from_slice(kind.tag().as_bytes());
    buf.push(b'|');
    buf.extend_from_slice(seqno.to_string().as_bytes());
    buf.push(b'|');
    buf.extend_from_slice(payload);
    buf.push(b'|');
    let csum = crc32c::crc32c(&buf);
    buf.extend_from_slice(csum.to_string().as_bytes());
    buf
}

/// Parse an inbound datagram.
///
/// Splits on the first two `|` and the last `|`, verifies the CRC, and
/// returns the decoded fields.  Validation order matters: the checksum is
/// checked *before* any field is interpreted, so corrupted packets always
/// surface as [`DecodeError::ChecksumMismatch`] no matter how mangled their
/// contents are.
pub fn decode(buf: &[u8]) -> Result<Inbound, DecodeError> {
    let first = find_byte(buf, 0, b'|').ok_or(DecodeError::Truncated)?;
    let second = find_byte(buf, first + 1, b'|').ok_or(DecodeError::Truncated)?;
    let last = buf
        .iter()
        .rposition(|&b| b == b'|')
        .ok_or(DecodeError::Truncated)?;
    if last <= second {
        return Err(DecodeError::Truncated);
    }

    // An unparseable trailing field cannot be validated, which is the same
    // outcome as a failed validation.
    let stored: u32 = std::str::from_utf8(&buf[last + 1..])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(DecodeError::ChecksumMismatch)?;
    if crc32c::crc32c(&buf[..=last]) != stored {
        return Err(DecodeError::ChecksumMismatch);
    }

    let kind = PacketKind::from_tag(&buf[..first]).ok_or(DecodeError::UnknownType)?;
    let field = std::str::from_utf8(&buf[first + 1..second])
        .map_err(|_| DecodeError::BadFieldEncoding)?
        .to_owned();

    Ok(Inbound {
        kind,
        field,
        payload: buf[second + 1..last].to_vec(),
    })
}

/// Index of the first `needle` at or after `from`.
fn find_byte(buf: &[u8], from: usize, needle: u8) -> Option<usize> {
    buf.iter()
        .skip(from)
        .position(|&b| b == needle)
        .map(|i| i + from)
}
