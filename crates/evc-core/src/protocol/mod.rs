//! Protocol module containing wire constants, the packet catalog and the codec.

pub mod codec;
pub mod messages;
pub mod packets;
pub mod token;

pub use codec::{encode_datagrams, fragment_count, OverflowPolicy, ProtocolError};
pub use messages::*;
pub use packets::Packet;
pub use token::ClientToken;
