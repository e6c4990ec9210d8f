//! Application layer for the client.
//!
//! - **`session`** – the [`session::EventClient`] state machine (Stopped /
//!   Active), the keepalive task, and the [`session::DatagramTransport`] trait
//!   the infrastructure layer implements.  Sending is written against the
//!   trait so tests can swap the UDP socket for an in-memory recorder.

pub mod session;
