//! Wire constants and the small enumerations carried inside packets.
//!
//! Everything in this module maps one-to-one to a byte (or two) on the wire.
//! All multi-byte integers are big-endian.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Four-byte marker at the start of every datagram.
pub const SIGNATURE: [u8; 4] = *b"XBMC";

/// Protocol major version byte.
pub const MAJOR_VERSION: u8 = 2;

/// Protocol minor version byte.
pub const MINOR_VERSION: u8 = 0;

/// Size of the fixed header that precedes every payload fragment.
pub const HEADER_SIZE: usize = 32;

/// Largest datagram the host accepts.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Largest payload slice carried by one datagram.
pub const MAX_PAYLOAD_SIZE: usize = MAX_DATAGRAM_SIZE - HEADER_SIZE;

/// Number of zero bytes at the end of the header.
pub const RESERVED_SIZE: usize = 10;

/// Default UDP port of the event server.
pub const DEFAULT_PORT: u16 = 9777;

/// Default time between keepalive PINGs.
///
/// The host drops a client after 60 seconds of silence.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

// ── Packet types ──────────────────────────────────────────────────────────────

/// Packet type codes (header offset 6, two bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PacketType {
    Helo = 0x01,
    Bye = 0x02,
    Button = 0x03,
    Mouse = 0x04,
    Ping = 0x05,
    Broadcast = 0x06,
    Notification = 0x07,
    Blob = 0x08,
    Log = 0x09,
    Action = 0x0A,
    Debug = 0xFF,
}

impl TryFrom<u16> for PacketType {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, ()> {
        match value {
            0x01 => Ok(PacketType::Helo),
            0x02 => Ok(PacketType::Bye),
            0x03 => Ok(PacketType::Button),
            0x04 => Ok(PacketType::Mouse),
            0x05 => Ok(PacketType::Ping),
            0x06 => Ok(PacketType::Broadcast),
            0x07 => Ok(PacketType::Notification),
            0x08 => Ok(PacketType::Blob),
            0x09 => Ok(PacketType::Log),
            0x0A => Ok(PacketType::Action),
            0xFF => Ok(PacketType::Debug),
            _ => Err(()),
        }
    }
}

// ── Icons ─────────────────────────────────────────────────────────────────────

/// Image format of the icon attached to HELO and NOTIFICATION packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum IconType {
    #[default]
    None = 0x00,
    Jpeg = 0x01,
    Png = 0x02,
    Gif = 0x03,
}

impl IconType {
    /// Guesses the icon format from a file extension (case-insensitive).
    ///
    /// Returns `None` for anything other than png, jpg/jpeg and gif.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(IconType::Png),
            "jpg" | "jpeg" => Some(IconType::Jpeg),
            "gif" => Some(IconType::Gif),
            _ => None,
        }
    }
}

impl TryFrom<u8> for IconType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x00 => Ok(IconType::None),
            0x01 => Ok(IconType::Jpeg),
            0x02 => Ok(IconType::Png),
            0x03 => Ok(IconType::Gif),
            _ => Err(()),
        }
    }
}

// ── Log levels ────────────────────────────────────────────────────────────────

/// Severity of a LOG packet, written as one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Notice = 2,
    Warning = 3,
    Error = 4,
    Severe = 5,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "severe" => Ok(LogLevel::Severe),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// How the host interprets the message of an ACTION packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionType {
    /// Run the message as a built-in command, e.g. `"PlayerControl(Play)"`.
    #[default]
    ExecBuiltin = 0x01,
    /// Treat the message as a button/action name.
    Button = 0x02,
}

// ── Button flags ──────────────────────────────────────────────────────────────

/// Analog axis selector for BUTTON packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisMode {
    #[default]
    None = 0,
    /// One-directional axis (trigger); sets `AXISSINGLE`.
    Single = 1,
    /// Two-directional axis (thumbstick); sets `AXIS`.
    Dual = 2,
}

impl TryFrom<u8> for AxisMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(AxisMode::None),
            1 => Ok(AxisMode::Single),
            2 => Ok(AxisMode::Dual),
            _ => Err(()),
        }
    }
}

/// Bitmask values of the 16-bit BUTTON flags field.
pub mod button_flags {
    /// Map and button names are used instead of the raw code.
    pub const USE_NAME: u16 = 0x01;
    pub const DOWN: u16 = 0x02;
    pub const UP: u16 = 0x04;
    pub const USE_AMOUNT: u16 = 0x08;
    pub const QUEUE: u16 = 0x10;
    pub const NO_REPEAT: u16 = 0x20;
    /// Virtual key code; never set by this client.
    pub const VKEY: u16 = 0x40;
    pub const AXIS: u16 = 0x80;
    pub const AXIS_SINGLE: u16 = 0x100;
}

/// Bitmask values of the one-byte MOUSE flags field.
pub mod mouse_flags {
    pub const ABSOLUTE: u8 = 0x01;
}
