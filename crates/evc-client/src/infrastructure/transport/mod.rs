//! Datagram transports.
//!
//! # Why a fresh socket per datagram?
//!
//! The host identifies a client by (source address, token).  Binding an
//! ephemeral socket for each send keeps the client stateless between packets:
//! there is no long-lived socket to leak, re-bind after a network change, or
//! share between the foreground and the keepalive task.  The host does not
//! care that the source port changes because the token stays the same.

pub mod mock;
pub mod udp;

pub use udp::UdpTransport;
