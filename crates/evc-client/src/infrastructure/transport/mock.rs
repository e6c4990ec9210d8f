//! Recording transport for tests and `--dry-run`.
//!
//! `MockTransport` stores every datagram it is asked to send in a
//! `Mutex<Vec<...>>` so assertions can inspect exactly what left the session
//! and in what order.  Helper accessors parse the recorded headers so tests can
//! compare packet types and tokens without slicing bytes by hand.
//!
//! # `should_fail` switch
//!
//! Call `set_should_fail(true)` to make every send return a `TransportError`
//! without recording anything.  The switch is atomic so it can be flipped while
//! the transport is shared with a running keepalive task.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use async_trait::async_trait;
use evc_core::{ClientToken, FragmentHeader, PacketType};

use crate::application::session::{DatagramTransport, TransportError};

/// A transport that records datagrams instead of sending them.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Every (destination, datagram) pair accepted so far.
    pub sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    should_fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of datagrams recorded.
    pub fn sent_count(&self) -> usize {
        self.records().len()
    }

    /// Copies of the recorded datagrams.
    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        self.snapshot().into_iter().map(|(_, d)| d).collect()
    }

    pub fn destinations(&self) -> Vec<SocketAddr> {
        self.snapshot().into_iter().map(|(a, _)| a).collect()
    }

    /// Header packet type of each recorded datagram.
    pub fn packet_types(&self) -> Vec<PacketType> {
        self.headers().iter().map(|h| h.packet_type).collect()
    }

    /// Header token of each recorded datagram.
    pub fn tokens(&self) -> Vec<ClientToken> {
        self.headers().iter().map(|h| h.token).collect()
    }

    fn headers(&self) -> Vec<FragmentHeader> {
        self.datagrams()
            .iter()
            .filter_map(|d| FragmentHeader::parse(d).ok().map(|(h, _)| h))
            .collect()
    }

    fn snapshot(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.records().clone()
    }

    /// Locks the record list.  A panic in another holder does not lose data,
    /// so a poisoned lock is recovered rather than treated as empty.
    fn records(&self) -> MutexGuard<'_, Vec<(SocketAddr, Vec<u8>)>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DatagramTransport for MockTransport {
    async fn send_datagram(
        &self,
        destination: SocketAddr,
        datagram: &[u8],
    ) -> Result<(), TransportError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError {
                destination,
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "mock transport failure",
                ),
            });
        }
        self.records().push((destination, datagram.to_vec()));
        Ok(())
    }
}
