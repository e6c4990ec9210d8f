//! UDP transport.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::trace;

use crate::application::session::{DatagramTransport, TransportError};

/// Sends each datagram from a newly bound ephemeral UDP socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Wildcard address of the same family as `destination`, port 0.
fn ephemeral_bind_addr(destination: SocketAddr) -> SocketAddr {
    match destination {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_datagram(
        &self,
        destination: SocketAddr,
        datagram: &[u8],
    ) -> Result<(), TransportError> {
        let wrap = |source| TransportError {
            destination,
            source,
        };

        let socket = UdpSocket::bind(ephemeral_bind_addr(destination))
            .await
            .map_err(wrap)?;
        let sent = socket.send_to(datagram, destination).await.map_err(wrap)?;
        if sent != datagram.len() {
            return Err(wrap(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short send: {sent} of {} bytes", datagram.len()),
            )));
        }
        trace!("sent {sent} bytes to {destination}");
        Ok(())
    }
}
