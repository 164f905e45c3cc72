//! Peer runtime
//!
//! Bridges one external client into the group. Each loop iteration waits a
//! bounded time for a client line, acts on it, then drains every pending
//! inter-process message before going back to the client. Neither source can
//! starve the other.
//!
//! The directory held here is a cached snapshot, replaced wholesale on every
//! update from the coordinator. Routing uses whatever snapshot is cached at
//! the time, so a send may miss a user whose registration has not reached
//! this peer yet.

use std::time::Duration;

use parlay_core::invariants::assert_route_in_group;
use parlay_core::{ClientCommand, Directory, PeerId, RegistrationState};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::channel::{ClientChannel, LinePoll};
use crate::error::{Error, Result};
use crate::protocol::{Envelope, Message};
use crate::transport::Transport;

/// Lifecycle of a peer's client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// No username bound yet
    Unregistered,
    /// Username bound and registration sent
    Registered,
    /// Client channel gone; the loop has ended
    Closed,
}

/// Prefix carried in the body of broadcast chat
const BROADCAST_PREFIX: &str = "[Broadcast] ";

/// Usage hint sent after registration
const USAGE: &str = "[System] Usage: /<username> <msg>; /all <msg>; /ls";

/// One peer process's runtime
pub struct Peer<T, R, W> {
    transport: T,
    channel: ClientChannel<R, W>,
    directory: Directory,
    registration: RegistrationState,
    closed: bool,
    poll_interval: Duration,
}

impl<T, R, W> Peer<T, R, W>
where
    T: Transport,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(transport: T, channel: ClientChannel<R, W>, poll_interval: Duration) -> Self {
        Self {
            transport,
            channel,
            directory: Directory::new(),
            registration: RegistrationState::new(),
            closed: false,
            poll_interval,
        }
    }

    pub fn rank(&self) -> PeerId {
        self.transport.rank()
    }

    pub fn state(&self) -> PeerState {
        if self.closed {
            PeerState::Closed
        } else if self.registration.is_registered() {
            PeerState::Registered
        } else {
            PeerState::Unregistered
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.registration.username()
    }

    /// Cached directory snapshot
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Write the connection banner
    pub async fn greet(&mut self) -> Result<()> {
        let banner = format!("Connected to rank {}.", self.rank());
        self.channel.write_line(&banner).await?;
        self.channel.write_line("Enter Username to register:").await
    }

    /// Greet the client, then loop until the channel closes.
    ///
    /// The channel is released on every exit path.
    pub async fn run(mut self) -> Result<()> {
        info!(rank = %self.rank(), "Peer started");

        let result = match self.greet().await {
            Ok(()) => self.run_loop().await,
            Err(e) => {
                warn!(rank = %self.rank(), error = %e, "Client channel failed");
                Ok(())
            }
        };

        self.shutdown().await;
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        while self.step().await? != PeerState::Closed {}
        Ok(())
    }

    /// One loop iteration: bounded client poll, then a full drain.
    ///
    /// Client channel failures end the session and report `Closed`; they
    /// are not returned as errors.
    pub async fn step(&mut self) -> Result<PeerState> {
        if self.closed {
            return Ok(PeerState::Closed);
        }

        match self.poll_client().await {
            Ok(true) => {}
            Ok(false) => {
                info!(rank = %self.rank(), "Client disconnected");
                self.shutdown().await;
                return Ok(PeerState::Closed);
            }
            Err(e) => return self.fail(e).await,
        }

        if let Err(e) = self.drain().await {
            return self.fail(e).await;
        }

        Ok(self.state())
    }

    /// Poll the client once. Returns false on end-of-stream.
    async fn poll_client(&mut self) -> Result<bool> {
        match self.channel.poll_line(self.poll_interval).await? {
            LinePoll::Line(line) => {
                self.handle_line(&line).await?;
                Ok(true)
            }
            LinePoll::Idle => Ok(true),
            LinePoll::Closed => Ok(false),
        }
    }

    async fn fail(&mut self, e: Error) -> Result<PeerState> {
        if !matches!(e, Error::Io(_) | Error::ChannelClosed) {
            return Err(e);
        }

        warn!(rank = %self.rank(), error = %e, "Client channel failed");
        self.shutdown().await;
        Ok(PeerState::Closed)
    }

    async fn shutdown(&mut self) {
        self.closed = true;
        if self.channel.close().await {
            debug!(rank = %self.rank(), "Client channel released");
        }
    }

    /// Act on one line from the client
    pub async fn handle_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        if !self.registration.is_registered() {
            return self.register(line).await;
        }

        match ClientCommand::parse(line) {
            ClientCommand::List => {
                let listing = format!("User online: {}", self.directory);
                self.channel.write_line(&listing).await
            }
            ClientCommand::Broadcast { body } => self.broadcast(body).await,
            ClientCommand::Direct { target, body } => self.send_direct(target, body).await,
            ClientCommand::Malformed => {
                self.channel
                    .write_line("[Error] Invalid format. Use /<user> <msg>")
                    .await
            }
        }
    }

    /// Adopt the username immediately, without waiting for confirmation
    async fn register(&mut self, username: &str) -> Result<()> {
        self.registration.bind(username);
        self.transport.isend(
            PeerId::COORDINATOR,
            Message::Register {
                username: username.to_string(),
            },
        );
        info!(rank = %self.rank(), username = %username, "Registered");

        self.channel
            .write_line(&format!("[System] Registered as '{}'.", username))
            .await?;
        self.channel.write_line(USAGE).await
    }

    async fn broadcast(&mut self, body: &str) -> Result<()> {
        let me = self.rank();
        let sender = self.registration.username().unwrap_or_default().to_string();
        let message = Message::Chat {
            sender,
            body: format!("{}{}", BROADCAST_PREFIX, body),
        };

        let mut recipients = 0usize;
        for (_, peer) in self.directory.others(me) {
            self.transport.isend(peer, message.clone());
            recipients += 1;
        }
        debug!(rank = %me, recipients, "Broadcast chat");

        self.channel
            .write_line(&format!("[Broadcast]: {}", body))
            .await
    }

    async fn send_direct(&mut self, target: &str, body: &str) -> Result<()> {
        let Some(peer) = self.directory.lookup(target) else {
            debug!(rank = %self.rank(), target = %target, "Routing miss");
            return self
                .channel
                .write_line(&format!("[Error] User '{}' not found.", target))
                .await;
        };

        assert_route_in_group(peer, self.transport.size());
        let sender = self.registration.username().unwrap_or_default().to_string();
        self.transport.isend(
            peer,
            Message::Chat {
                sender,
                body: body.to_string(),
            },
        );

        self.channel
            .write_line(&format!("[To {}]: {}", target, body))
            .await
    }

    /// Handle every envelope currently pending. Returns how many were taken.
    ///
    /// Protocol violations are reported and skipped.
    pub async fn drain(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(envelope) = self.transport.try_recv() {
            handled += 1;
            match self.handle_envelope(envelope).await {
                Ok(()) => {}
                Err(e @ Error::ProtocolViolation { .. }) => {
                    error!(error = %e, "Dropped message");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(handled)
    }

    async fn handle_envelope(&mut self, envelope: Envelope) -> Result<()> {
        match envelope.message {
            Message::DirectoryUpdate { snapshot } => {
                debug!(rank = %self.rank(), users = snapshot.len(), "Directory updated");
                self.directory = snapshot;
                Ok(())
            }
            Message::Chat { sender, body } => {
                self.channel
                    .write_line(&format!("[{}]: {}", sender, body))
                    .await
            }
            other => Err(Error::ProtocolViolation {
                rank: self.rank(),
                sender: envelope.source,
                kind: other.kind(),
            }),
        }
    }
}
