//! # evc-core
//!
//! Shared library for the UDP event client protocol: wire constants, the
//! packet catalog, payload field encoding, and fragmentation of payloads into
//! framed datagrams.
//!
//! This crate is pure: it has no dependency on sockets, timers, or OS APIs.
//! The client session and transports live in `evc-client`.
//!
//! # Architecture overview (for beginners)
//!
//! A remote control (phone, script, IR bridge) drives a media-center host by
//! sending small UDP datagrams to port 9777.  Every datagram starts with the
//! same 32-byte header (`"XBMC"`, version 2.0, packet type, fragment numbering,
//! client token) followed by at most 992 bytes of payload.  Larger payloads
//! (a notification carrying an icon, for example) are split over several
//! datagrams that share the same token and packet type.
//!
//! - **`protocol::messages`** – constants and the small enums that appear on
//!   the wire (packet type, icon type, log level, flag bits).
//! - **`protocol::packets`** – the typed packets (`HELO`, `BUTTON`, `MOUSE`, …)
//!   and how each one lays out its payload.
//! - **`protocol::codec`** – the payload writer, fragment arithmetic, datagram
//!   framing, and a header parser for diagnostics.
//! - **`protocol::token`** – the per-session random client token.

pub mod protocol;

pub use protocol::codec::{
    build_datagram, encode_datagrams, fragment_count, FragmentHeader, OverflowPolicy,
    PayloadWriter, ProtocolError,
};
pub use protocol::messages::{ActionType, AxisMode, IconType, LogLevel, PacketType};
pub use protocol::packets::{
    ActionPacket, ButtonPacket, ButtonTarget, HeloPacket, Icon, LogPacket, MousePacket,
    NotificationPacket, Packet,
};
pub use protocol::token::ClientToken;
