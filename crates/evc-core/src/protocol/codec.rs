//! Binary codec: payload field writer, fragmentation and datagram framing.
//!
//! Wire format of every datagram:
//! ```text
//! ["XBMC":4][major:1][minor:1][type:2][seq:4][total:4][frag_len:2][token:4][reserved:10][payload:N]
//! ```
//! Header size: 32 bytes, `N <= 992`. All multi-byte integers are big-endian.
//! A payload longer than 992 bytes is cut into consecutive slices, one per
//! datagram, numbered from 1.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{
    PacketType, HEADER_SIZE, MAJOR_VERSION, MAX_PAYLOAD_SIZE, MINOR_VERSION, RESERVED_SIZE,
    SIGNATURE,
};
use crate::protocol::packets::Packet;
use crate::protocol::token::ClientToken;

/// Errors that can occur while encoding packets or parsing datagram headers.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A fragment was requested outside `1..=total`.
    #[error("sequence {sequence} out of range: packet has {total} fragment(s)")]
    SequenceOutOfRange { sequence: u32, total: u32 },

    /// An integer does not fit its wire field and the policy is `Reject`.
    #[error("{field} value {value} does not fit in {max}")]
    FieldOverflow {
        field: &'static str,
        value: i64,
        max: i64,
    },

    /// A string contains a NUL byte and the policy is `Reject`.
    #[error("{field} contains an embedded NUL byte")]
    EmbeddedNul { field: &'static str },

    /// The datagram is shorter than the fixed header.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first four bytes are not `"XBMC"`.
    #[error("bad signature: {0:02X?}")]
    BadSignature([u8; 4]),

    /// The header carries a protocol version other than 2.x.
    #[error("unsupported protocol version: {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// The packet type field is not a known code.
    #[error("unknown packet type: 0x{0:04X}")]
    UnknownPacketType(u16),

    /// The declared fragment length differs from the bytes that follow the header.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

// ── Overflow policy ───────────────────────────────────────────────────────────

/// What the encoder does with a value that does not fit its wire field.
///
/// `Truncate` matches what existing hosts accept: integers wrap to
/// the field width and strings end at the first NUL.  `Reject` fails the
/// encode so nothing malformed ever reaches the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Truncate,
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(format!("unknown overflow policy: {other}")),
        }
    }
}

// ── Payload writer ────────────────────────────────────────────────────────────

/// Growing payload buffer that appends typed fields in network byte order.
#[derive(Debug, Clone, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
    policy: OverflowPolicy,
}

impl PayloadWriter {
    /// Creates an empty writer using `policy` for the checked field methods.
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            buf: Vec::new(),
            policy,
        }
    }

    /// Appends a UTF-8 string followed by one `0x00` terminator.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EmbeddedNul`] under [`OverflowPolicy::Reject`]
    /// when `value` contains a NUL byte.  Under `Truncate` the string is cut
    /// at the first NUL, which is what the host would read anyway.
    pub fn put_str(&mut self, field: &'static str, value: &str) -> Result<(), ProtocolError> {
        let bytes = value.as_bytes();
        let end = match bytes.iter().position(|&b| b == 0) {
            Some(_) if self.policy == OverflowPolicy::Reject => {
                return Err(ProtocolError::EmbeddedNul { field });
            }
            Some(nul) => nul,
            None => bytes.len(),
        };
        self.buf.extend_from_slice(&bytes[..end]);
        self.buf.push(0x00);
        Ok(())
    }

    /// Appends a single byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Appends raw bytes verbatim.
    pub fn put_bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    /// Appends a big-endian 16-bit integer.
    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Appends a big-endian 32-bit integer.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Appends a wider integer into a 16-bit field according to the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldOverflow`] under [`OverflowPolicy::Reject`]
    /// when `value` is outside `0..=65535`.
    pub fn put_u16_checked(&mut self, field: &'static str, value: i64) -> Result<(), ProtocolError> {
        let narrowed = match u16::try_from(value) {
            Ok(v) => v,
            Err(_) if self.policy == OverflowPolicy::Reject => {
                return Err(ProtocolError::FieldOverflow {
                    field,
                    value,
                    max: i64::from(u16::MAX),
                });
            }
            // Two's-complement wrap, same as a C cast.
            Err(_) => value as u16,
        };
        self.put_u16(narrowed);
        Ok(())
    }

    /// Consumes the writer and returns the payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ── Fragmentation ─────────────────────────────────────────────────────────────

/// Number of datagrams needed for a payload of `payload_len` bytes.
///
/// Always at least 1: an empty payload (PING, BYE) still goes out as one
/// header-only datagram.
///
/// # Examples
///
/// ```rust
/// use evc_core::fragment_count;
///
/// assert_eq!(fragment_count(0), 1);
/// assert_eq!(fragment_count(992), 1);
/// assert_eq!(fragment_count(993), 2);
/// ```
pub fn fragment_count(payload_len: usize) -> u32 {
    payload_len.div_ceil(MAX_PAYLOAD_SIZE).max(1) as u32
}

/// Frames fragment `sequence` (1-based) of `payload` as one datagram.
///
/// # Errors
///
/// Returns [`ProtocolError::SequenceOutOfRange`] when `sequence` is 0 or
/// greater than [`fragment_count`] of the payload.
pub fn build_datagram(
    packet_type: PacketType,
    token: ClientToken,
    payload: &[u8],
    sequence: u32,
) -> Result<Vec<u8>, ProtocolError> {
    let total = fragment_count(payload.len());
    if sequence == 0 || sequence > total {
        return Err(ProtocolError::SequenceOutOfRange { sequence, total });
    }

    let start = (sequence as usize - 1) * MAX_PAYLOAD_SIZE;
    let end = (start + MAX_PAYLOAD_SIZE).min(payload.len());
    let chunk = &payload[start..end];

    let mut buf = Vec::with_capacity(HEADER_SIZE + chunk.len());

    // Header: signature (4) + major (1) + minor (1) + type (2) + seq (4) +
    //         total (4) + frag_len (2) + token (4) + reserved (10) = 32 bytes
    buf.extend_from_slice(&SIGNATURE);
    buf.push(MAJOR_VERSION);
    buf.push(MINOR_VERSION);
    buf.extend_from_slice(&(packet_type as u16).to_be_bytes());
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(&total.to_be_bytes());
    buf.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
    buf.extend_from_slice(&token.to_be_bytes());
    buf.extend_from_slice(&[0u8; RESERVED_SIZE]);

    buf.extend_from_slice(chunk);
    Ok(buf)
}

/// Encodes `packet` into every datagram it needs, in sequence order.
///
/// # Errors
///
/// Returns [`ProtocolError`] when a field violates `policy`.
///
/// # Examples
///
/// ```rust
/// use evc_core::{encode_datagrams, ClientToken, OverflowPolicy, Packet};
///
/// let datagrams =
///     encode_datagrams(&Packet::Ping, ClientToken::from_u32(7), OverflowPolicy::Truncate).unwrap();
/// assert_eq!(datagrams.len(), 1);
/// assert_eq!(&datagrams[0][..4], b"XBMC");
/// ```
pub fn encode_datagrams(
    packet: &Packet,
    token: ClientToken,
    policy: OverflowPolicy,
) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let payload = packet.encode_payload(policy)?;
    let packet_type = packet.packet_type();
    let total = fragment_count(payload.len());
    trace!(
        "encoding {packet_type:?}: {} payload bytes in {total} datagram(s)",
        payload.len()
    );
    (1..=total)
        .map(|seq| build_datagram(packet_type, token, &payload, seq))
        .collect()
}

// ── Header parsing ────────────────────────────────────────────────────────────

/// Decoded per-datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub packet_type: PacketType,
    /// 1-based fragment index.
    pub sequence: u32,
    /// Fragment count; 0 and 1 both mean "single datagram".
    pub total_fragments: u32,
    /// Payload bytes carried by this datagram.
    pub payload_len: u16,
    pub token: ClientToken,
}

impl FragmentHeader {
    /// Parses the header of one datagram and returns it with the payload slice.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the datagram is short, has the wrong
    /// signature or version, an unknown type, or a length field that does not
    /// match the trailing bytes.
    pub fn parse(datagram: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        if datagram.len() < HEADER_SIZE {
            return Err(ProtocolError::InsufficientData {
                needed: HEADER_SIZE,
                available: datagram.len(),
            });
        }

        let signature: [u8; 4] = [datagram[0], datagram[1], datagram[2], datagram[3]];
        if signature != SIGNATURE {
            return Err(ProtocolError::BadSignature(signature));
        }

        let (major, minor) = (datagram[4], datagram[5]);
        if major != MAJOR_VERSION {
            return Err(ProtocolError::UnsupportedVersion { major, minor });
        }

        let type_raw = u16::from_be_bytes([datagram[6], datagram[7]]);
        let packet_type =
            PacketType::try_from(type_raw).map_err(|_| ProtocolError::UnknownPacketType(type_raw))?;

        let sequence = read_u32(datagram, 8);
        let total_fragments = read_u32(datagram, 12);
        let payload_len = u16::from_be_bytes([datagram[16], datagram[17]]);
        let token = ClientToken::from_u32(read_u32(datagram, 18));

        // bytes[22..32] are reserved – ignored on parse

        let available = datagram.len() - HEADER_SIZE;
        if available != payload_len as usize {
            return Err(ProtocolError::PayloadLengthMismatch {
                declared: payload_len as usize,
                available,
            });
        }

        let header = FragmentHeader {
            packet_type,
            sequence,
            total_fragments,
            payload_len,
            token,
        };
        Ok((header, &datagram[HEADER_SIZE..]))
    }

    /// Returns `true` when the message fits in one datagram.
    pub fn is_single(&self) -> bool {
        self.total_fragments <= 1
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
