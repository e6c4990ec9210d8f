//! Infrastructure layer for the client.
//!
//! Contains the OS-facing adapters: UDP I/O and the on-disk configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and `evc_core`,
//! but MUST NOT be imported by the `application` layer outside of tests.
//!
//! # Sub-modules
//!
//! - **`transport`** – implementations of `DatagramTransport`: `UdpTransport`
//!   sends over a fresh ephemeral socket per datagram; `MockTransport` records
//!   datagrams in memory for tests.
//!
//! - **`config`** – TOML configuration file, platform config directory lookup,
//!   and icon loading.

pub mod config;
pub mod transport;
