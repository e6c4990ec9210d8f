//! The packet catalog.
//!
//! Each packet is a payload recipe layered on [`PayloadWriter`]; none of them
//! changes the header.  Field order below is the wire order.
//!
//! | Packet       | Payload                                                        |
//! |--------------|----------------------------------------------------------------|
//! | HELO         | name\0, icon_type:1, port:2 (0), reserved:4, reserved:4, icon  |
//! | BYE / PING   | empty                                                          |
//! | BUTTON       | code:2, flags:2, amount:2, map\0, button\0                     |
//! | MOUSE        | flags:1 (ABSOLUTE), x:2, y:2                                   |
//! | NOTIFICATION | title\0, message\0, icon_type:1, reserved:4, icon              |
//! | LOG          | level:1, message\0                                             |
//! | ACTION       | action_type:1, message\0                                       |
//! | BLOB         | raw bytes                                                      |

use crate::protocol::codec::{OverflowPolicy, PayloadWriter, ProtocolError};
use crate::protocol::messages::{
    button_flags, mouse_flags, ActionType, AxisMode, IconType, LogLevel, PacketType,
};

/// Code sent by a "release" BUTTON; the host treats any UP as releasing the
/// currently held button.
const RELEASE_CODE: u16 = 0x01;

// ── Icon ──────────────────────────────────────────────────────────────────────

/// Image attached to HELO or NOTIFICATION.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub icon_type: IconType,
    pub data: Vec<u8>,
}

impl Icon {
    pub fn new(icon_type: IconType, data: Vec<u8>) -> Self {
        Self { icon_type, data }
    }
}

/// Writes the icon type byte and returns the bytes to append later, if any.
///
/// An icon of type `None` is treated exactly like no icon at all.
fn icon_parts(icon: Option<&Icon>) -> (IconType, Option<&[u8]>) {
    match icon {
        Some(i) if i.icon_type != IconType::None => (i.icon_type, Some(i.data.as_slice())),
        _ => (IconType::None, None),
    }
}

// ── HELO ──────────────────────────────────────────────────────────────────────

/// HELO (0x01): opens a session and names the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeloPacket {
    pub device_name: String,
    pub icon: Option<Icon>,
}

impl HeloPacket {
    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        let (icon_type, icon_data) = icon_parts(self.icon.as_ref());
        w.put_str("device name", &self.device_name)?;
        w.put_u8(icon_type as u8);
        w.put_u16(0); // reserved port
        w.put_u32(0); // reserved
        w.put_u32(0); // reserved
        if let Some(data) = icon_data {
            w.put_bytes(data);
        }
        Ok(())
    }
}

// ── BUTTON ────────────────────────────────────────────────────────────────────

/// Which button a BUTTON packet refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    /// Raw device code, looked up by the host in its generic keymap.
    Code(u16),
    /// Named mapping, e.g. map `"KB"` and button `"enter"`, or map `"XG"` and
    /// button `"dpadup"`.
    Named { map: String, button: String },
}

/// BUTTON (0x03): a key or button press, release, or analog axis update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPacket {
    pub target: ButtonTarget,
    /// `true` for press, `false` for release.  Exactly one of DOWN/UP is sent.
    pub down: bool,
    /// When `false` the host does not auto-repeat the held button.
    pub repeat: bool,
    /// Queue the event instead of acting on it immediately.
    pub queue: bool,
    /// Analog amount; 0 means "not an analog event".
    pub amount: u16,
    pub axis: AxisMode,
}

impl ButtonPacket {
    /// Press of a raw button code with repeat enabled.
    pub fn code(code: u16) -> Self {
        Self::with_target(ButtonTarget::Code(code))
    }

    /// Press of a named button from a keymap.
    pub fn named(map: impl Into<String>, button: impl Into<String>) -> Self {
        Self::with_target(ButtonTarget::Named {
            map: map.into(),
            button: button.into(),
        })
    }

    /// Releases whatever button the host currently considers held.
    pub fn release() -> Self {
        Self::code(RELEASE_CODE).with_down(false)
    }

    fn with_target(target: ButtonTarget) -> Self {
        Self {
            target,
            down: true,
            repeat: true,
            queue: false,
            amount: 0,
            axis: AxisMode::None,
        }
    }

    pub fn with_down(mut self, down: bool) -> Self {
        self.down = down;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_queue(mut self, queue: bool) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_amount(mut self, amount: u16) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_axis(mut self, axis: AxisMode) -> Self {
        self.axis = axis;
        self
    }

    /// Computes the 16-bit flags field.
    pub fn flags(&self) -> u16 {
        let mut flags = if self.down {
            button_flags::DOWN
        } else {
            button_flags::UP
        };
        if matches!(self.target, ButtonTarget::Named { .. }) {
            flags |= button_flags::USE_NAME;
        }
        if self.amount > 0 {
            flags |= button_flags::USE_AMOUNT;
        }
        if self.queue {
            flags |= button_flags::QUEUE;
        }
        if !self.repeat {
            flags |= button_flags::NO_REPEAT;
        }
        flags |= match self.axis {
            AxisMode::None => 0,
            AxisMode::Single => button_flags::AXIS_SINGLE,
            AxisMode::Dual => button_flags::AXIS,
        };
        flags
    }

    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        let (code, map, button) = match &self.target {
            ButtonTarget::Code(code) => (*code, "", ""),
            ButtonTarget::Named { map, button } => (0, map.as_str(), button.as_str()),
        };
        w.put_u16(code);
        w.put_u16(self.flags());
        w.put_u16(self.amount);
        w.put_str("map name", map)?;
        w.put_str("button name", button)?;
        Ok(())
    }
}

// ── MOUSE ─────────────────────────────────────────────────────────────────────

/// MOUSE (0x04): absolute pointer position in the 0..=65535 range per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MousePacket {
    pub x: i32,
    pub y: i32,
}

impl MousePacket {
    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        w.put_u8(mouse_flags::ABSOLUTE);
        w.put_u16_checked("mouse x", i64::from(self.x))?;
        w.put_u16_checked("mouse y", i64::from(self.y))?;
        Ok(())
    }
}

// ── NOTIFICATION ──────────────────────────────────────────────────────────────

/// NOTIFICATION (0x07): pops a titled message on the host's screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPacket {
    pub title: String,
    pub message: String,
    pub icon: Option<Icon>,
}

impl NotificationPacket {
    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        let (icon_type, icon_data) = icon_parts(self.icon.as_ref());
        w.put_str("title", &self.title)?;
        w.put_str("message", &self.message)?;
        w.put_u8(icon_type as u8);
        w.put_u32(0); // reserved
        if let Some(data) = icon_data {
            w.put_bytes(data);
        }
        Ok(())
    }
}

// ── LOG ───────────────────────────────────────────────────────────────────────

/// LOG (0x09): writes a line to the host's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPacket {
    pub level: LogLevel,
    pub message: String,
}

impl LogPacket {
    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        w.put_u8(self.level as u8);
        w.put_str("log message", &self.message)
    }
}

// ── ACTION ────────────────────────────────────────────────────────────────────

/// ACTION (0x0A): runs a built-in command or named action on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPacket {
    pub action_type: ActionType,
    pub message: String,
}

impl ActionPacket {
    /// Built-in command such as `"Notification(Hi,There)"`.
    pub fn builtin(message: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::ExecBuiltin,
            message: message.into(),
        }
    }

    fn encode(&self, w: &mut PayloadWriter) -> Result<(), ProtocolError> {
        w.put_u8(self.action_type as u8);
        w.put_str("action message", &self.message)
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Every packet a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Helo(HeloPacket),
    Bye,
    Button(ButtonPacket),
    Mouse(MousePacket),
    Ping,
    Notification(NotificationPacket),
    Log(LogPacket),
    Action(ActionPacket),
    /// Opaque payload sent verbatim under the BLOB type.
    Blob(Vec<u8>),
}

impl Packet {
    /// Header packet type for this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Helo(_) => PacketType::Helo,
            Packet::Bye => PacketType::Bye,
            Packet::Button(_) => PacketType::Button,
            Packet::Mouse(_) => PacketType::Mouse,
            Packet::Ping => PacketType::Ping,
            Packet::Notification(_) => PacketType::Notification,
            Packet::Log(_) => PacketType::Log,
            Packet::Action(_) => PacketType::Action,
            Packet::Blob(_) => PacketType::Blob,
        }
    }

    /// Builds the complete (unfragmented) payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when a field violates `policy`.
    pub fn encode_payload(&self, policy: OverflowPolicy) -> Result<Vec<u8>, ProtocolError> {
        let mut w = PayloadWriter::new(policy);
        match self {
            Packet::Helo(p) => p.encode(&mut w)?,
            Packet::Bye | Packet::Ping => {} // empty payload
            Packet::Button(p) => p.encode(&mut w)?,
            Packet::Mouse(p) => p.encode(&mut w)?,
            Packet::Notification(p) => p.encode(&mut w)?,
            Packet::Log(p) => p.encode(&mut w)?,
            Packet::Action(p) => p.encode(&mut w)?,
            Packet::Blob(data) => w.put_bytes(data),
        }
        Ok(w.into_bytes())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
