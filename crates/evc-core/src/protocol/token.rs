//! Per-session client token.
//!
//! The host keys its client table on (source address, token), so two remotes
//! behind the same NAT address are still told apart.  A token is drawn once
//! when a session starts and stamped on every datagram of that session.

use std::fmt;

/// Random 32-bit identifier shared by every packet of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientToken(u32);

impl ClientToken {
    /// Draws a fresh token from the thread-local RNG.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Wraps an explicit value.  Useful for tests and replaying captures.
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the big-endian wire representation.
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
