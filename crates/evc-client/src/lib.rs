//! evc-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does evc-client do? (for beginners)
//!
//! The client is the *remote*: it turns button presses, pointer moves and
//! text into event-server packets and fires them at a media-center host over
//! UDP.  There is no reply channel, so the client never knows whether a
//! datagram arrived; instead it keeps the host's idea of the session alive
//! with a PING every 20 seconds.
//!
//! 1. `start()` sends HELO with the device name (and an optional icon).
//! 2. A background task sends PING on a fixed interval.
//! 3. Button, mouse, notification, log and action packets are sent on demand.
//! 4. `stop()` cancels the keepalive and sends BYE.

/// Application layer: the client session and its transport seam.
pub mod application;

/// Infrastructure layer: UDP and recording transports, TOML configuration.
pub mod infrastructure;
