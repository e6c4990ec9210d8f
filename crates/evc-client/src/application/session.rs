//! Client session use case.
//!
//! An [`EventClient`] is either **Stopped** or **Active**.  Starting a session
//! generates a fresh [`ClientToken`], sends HELO and spawns a keepalive task
//! that sends PING every `keepalive_interval`.  Stopping cancels the keepalive
//! and sends BYE.  Input packets may only be sent while Active.
//!
//! Sending is written against the [`DatagramTransport`] trait so the session
//! logic can be exercised with an in-memory recorder instead of a socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evc_core::{
    encode_datagrams, protocol::messages::DEFAULT_KEEPALIVE_INTERVAL, ActionPacket, ButtonPacket,
    ClientToken, HeloPacket, Icon, LogLevel, LogPacket, MousePacket, NotificationPacket,
    OverflowPolicy, Packet, ProtocolError,
};
use thiserror::Error;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

// ── Errors ────────────────────────────────────────────────────────────────────

/// A datagram could not be handed to the network.
#[derive(Debug, Error)]
#[error("failed to send datagram to {destination}: {source}")]
pub struct TransportError {
    pub destination: SocketAddr,
    #[source]
    pub source: std::io::Error,
}

/// Errors returned by [`EventClient`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs an Active session.
    #[error("session is not active")]
    NotConnected,

    /// `start()` was called on a session that is already Active.
    #[error("session already active with token {0}")]
    AlreadyActive(ClientToken),

    #[error("encoding error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ── Transport seam ────────────────────────────────────────────────────────────

/// Fire-and-forget delivery of one datagram.
///
/// Implemented by the infrastructure layer (`UdpTransport` for real traffic,
/// `MockTransport` for tests).
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_datagram(
        &self,
        destination: SocketAddr,
        datagram: &[u8],
    ) -> Result<(), TransportError>;
}

/// Encodes `packet` and sends every resulting datagram in sequence order.
///
/// Nothing is sent if encoding fails.  Returns the number of datagrams sent.
///
/// # Errors
///
/// [`SessionError::Protocol`] if a field violates `policy`,
/// [`SessionError::Transport`] on the first datagram that fails to send.
pub async fn send_packet(
    transport: &dyn DatagramTransport,
    destination: SocketAddr,
    token: ClientToken,
    packet: &Packet,
    policy: OverflowPolicy,
) -> Result<usize, SessionError> {
    let datagrams = encode_datagrams(packet, token, policy)?;
    for datagram in &datagrams {
        transport.send_datagram(destination, datagram).await?;
    }
    debug!(
        "sent {:?} to {destination} in {} datagram(s)",
        packet.packet_type(),
        datagrams.len()
    );
    Ok(datagrams.len())
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Shortest keepalive interval an [`EventClient`] will run with.
pub const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(1);

/// Tunables fixed for the lifetime of an [`EventClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Time between keepalive PINGs.  Defaults to 20 seconds.
    pub keepalive_interval: Duration,
    /// How out-of-range fields are handled during encoding.
    pub overflow: OverflowPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            overflow: OverflowPolicy::default(),
        }
    }
}

// ── Keepalive ─────────────────────────────────────────────────────────────────

/// Handle to the background PING task.
///
/// Dropping the handle aborts the task.
struct Keepalive {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Keepalive {
    fn spawn(
        transport: Arc<dyn DatagramTransport>,
        destination: SocketAddr,
        token: ClientToken,
        options: SessionOptions,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(keepalive_loop(
            transport,
            destination,
            token,
            options,
            shutdown_rx,
        ));
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Signals the task and aborts it without waiting for an in-flight PING.
    fn cancel(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn keepalive_loop(
    transport: Arc<dyn DatagramTransport>,
    destination: SocketAddr,
    token: ClientToken,
    options: SessionOptions,
    mut shutdown: oneshot::Receiver<()>,
) {
    let period = options.keepalive_interval;
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // Fires on an explicit signal and when the sender is dropped.
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                match send_packet(transport.as_ref(), destination, token, &Packet::Ping, options.overflow).await {
                    Ok(_) => trace!("keepalive sent to {destination}"),
                    Err(e) => warn!("keepalive to {destination} failed: {e}"),
                }
            }
        }
    }
    debug!("keepalive for token {token} stopped");
}

// ── Client ────────────────────────────────────────────────────────────────────

struct ActiveSession {
    destination: SocketAddr,
    token: ClientToken,
    keepalive: Keepalive,
}

/// A remote-control session with one event-server host.
pub struct EventClient {
    transport: Arc<dyn DatagramTransport>,
    options: SessionOptions,
    active: Option<ActiveSession>,
}

impl EventClient {
    /// Creates a Stopped client.
    ///
    /// A keepalive interval below [`MIN_KEEPALIVE_INTERVAL`] is raised to it;
    /// tokio intervals cannot have a zero period.
    pub fn new(transport: Arc<dyn DatagramTransport>, mut options: SessionOptions) -> Self {
        if options.keepalive_interval < MIN_KEEPALIVE_INTERVAL {
            warn!(
                "keepalive interval {:?} raised to {:?}",
                options.keepalive_interval, MIN_KEEPALIVE_INTERVAL
            );
            options.keepalive_interval = MIN_KEEPALIVE_INTERVAL;
        }
        Self {
            transport,
            options,
            active: None,
        }
    }

    /// Options in effect, after clamping.
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Token of the Active session, if any.
    pub fn token(&self) -> Option<ClientToken> {
        self.active.as_ref().map(|s| s.token)
    }

    /// Destination of the Active session, if any.
    pub fn destination(&self) -> Option<SocketAddr> {
        self.active.as_ref().map(|s| s.destination)
    }

    /// Opens a session: new token, HELO, keepalive.
    ///
    /// On failure the client stays Stopped.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyActive`] if a session is running, otherwise any
    /// error from sending HELO.
    pub async fn start(
        &mut self,
        destination: SocketAddr,
        device_name: &str,
        icon: Option<Icon>,
    ) -> Result<ClientToken, SessionError> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive(active.token));
        }

        let token = ClientToken::random();
        let helo = Packet::Helo(HeloPacket {
            device_name: device_name.to_string(),
            icon,
        });
        send_packet(
            self.transport.as_ref(),
            destination,
            token,
            &helo,
            self.options.overflow,
        )
        .await?;

        let keepalive = Keepalive::spawn(
            Arc::clone(&self.transport),
            destination,
            token,
            self.options,
        );
        self.active = Some(ActiveSession {
            destination,
            token,
            keepalive,
        });
        info!("session {token} started with {destination} as \"{device_name}\"");
        Ok(token)
    }

    /// Closes the session: cancels the keepalive, then sends BYE.
    ///
    /// The client is Stopped afterwards even if BYE could not be sent.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] if no session is running, otherwise any
    /// error from sending BYE.
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        let session = self.active.take().ok_or(SessionError::NotConnected)?;
        session.keepalive.cancel();

        let result = send_packet(
            self.transport.as_ref(),
            session.destination,
            session.token,
            &Packet::Bye,
            self.options.overflow,
        )
        .await;
        info!("session {} with {} stopped", session.token, session.destination);
        result.map(|_| ())
    }

    /// Sends a BUTTON packet.
    pub async fn send_button(&self, button: ButtonPacket) -> Result<(), SessionError> {
        self.send(&Packet::Button(button)).await
    }

    /// Releases whatever button the host considers held.
    pub async fn release_button(&self) -> Result<(), SessionError> {
        self.send(&Packet::Button(ButtonPacket::release())).await
    }

    /// Moves the pointer to an absolute position in `0..=65535` space.
    pub async fn send_mouse(&self, x: i32, y: i32) -> Result<(), SessionError> {
        self.send(&Packet::Mouse(MousePacket { x, y })).await
    }

    /// Shows a notification on the host.
    pub async fn send_notification(
        &self,
        title: &str,
        message: &str,
        icon: Option<Icon>,
    ) -> Result<(), SessionError> {
        self.send(&Packet::Notification(NotificationPacket {
            title: title.to_string(),
            message: message.to_string(),
            icon,
        }))
        .await
    }

    /// Writes a line to the host's log.
    pub async fn send_log(&self, level: LogLevel, message: &str) -> Result<(), SessionError> {
        self.send(&Packet::Log(LogPacket {
            level,
            message: message.to_string(),
        }))
        .await
    }

    /// Runs a built-in command or named action on the host.
    pub async fn send_action(&self, action: ActionPacket) -> Result<(), SessionError> {
        self.send(&Packet::Action(action)).await
    }

    /// Sends a PING outside the keepalive schedule.
    pub async fn ping(&self) -> Result<(), SessionError> {
        self.send(&Packet::Ping).await
    }

    async fn send(&self, packet: &Packet) -> Result<(), SessionError> {
        let session = self.active.as_ref().ok_or(SessionError::NotConnected)?;
        send_packet(
            self.transport.as_ref(),
            session.destination,
            session.token,
            packet,
            self.options.overflow,
        )
        .await
        .map(|_| ())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
