//! The upgrade drivers and the authenticated connection wrapper.
//!
//! An [`Authenticator`] runs one side of the three-act handshake over a
//! plain byte stream. The outbound (initiator) side must already know the
//! remote peer's identity; the inbound (responder) side learns it from the
//! first envelope and pins it for the rest of the connection. On success
//! the stream is handed back wrapped in an [`AuthenticatedConnection`]; on
//! any failure the stream is shut down before the error is returned, so a
//! failed upgrade never leaks a half-open transport.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use enoki_handshake::acts::{Act1Message, Act2Message, Act3Message};
use enoki_handshake::{keys, HandshakeEnvelope, InitiatorAct1, KeyPair, PeerId, ResponderAct2};

use crate::framing::{self, FrameError};
use crate::{Act, UpgradeError};

/// Shared handshake configuration: the local identity plus an optional
/// shutdown token observed at every suspension point.
///
/// Cloning is cheap; one `Authenticator` is meant to be shared across all
/// of a node's concurrent handshakes. The signing key is only ever read.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    keypair: KeyPair,
    shutdown: Option<CancellationToken>,
}

impl Authenticator {
    /// Create an authenticator for the given local keypair.
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            inner: Arc::new(Inner {
                keypair,
                shutdown: None,
            }),
        }
    }

    /// Attach a shutdown token.
    ///
    /// When the token fires, in-flight upgrades abort with
    /// [`UpgradeError::Cancelled`] at their next suspension point, tearing
    /// their transports down first.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        Arc::make_mut(&mut self.inner).shutdown = Some(shutdown);
        self
    }

    /// The local peer identity.
    pub fn local_peer_id(&self) -> &PeerId {
        self.inner.keypair.peer_id()
    }

    /// Run the initiator side of the handshake over `transport`.
    ///
    /// The caller must know the expected remote identity up front; every
    /// inbound envelope is checked against it. On success the returned
    /// connection owns the transport; on any error the transport is shut
    /// down before this returns.
    pub async fn upgrade_outbound<S>(
        &self,
        mut transport: S,
        remote_id: PeerId,
    ) -> Result<AuthenticatedConnection<S>, UpgradeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self
            .guarded(self.run_initiator(&mut transport, &remote_id))
            .await;
        match result {
            Ok(()) => {
                debug!(remote = %remote_id, "outbound upgrade complete");
                Ok(AuthenticatedConnection {
                    transport,
                    local_peer_id: self.local_peer_id().clone(),
                    remote_peer_id: remote_id,
                })
            }
            Err(err) => {
                let _ = transport.shutdown().await;
                Err(err)
            }
        }
    }

    /// Run the responder side of the handshake over `transport`.
    ///
    /// The remote identity is not known in advance: the identity carried
    /// in the first envelope is adopted, pinned, and queryable on the
    /// returned connection. Nothing is written to the transport before
    /// act 1 has been read and verified. On any error the transport is
    /// shut down before this returns.
    pub async fn upgrade_inbound<S>(
        &self,
        mut transport: S,
    ) -> Result<AuthenticatedConnection<S>, UpgradeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.guarded(self.run_responder(&mut transport)).await;
        match result {
            Ok(remote_id) => {
                debug!(remote = %remote_id, "inbound upgrade complete");
                Ok(AuthenticatedConnection {
                    transport,
                    local_peer_id: self.local_peer_id().clone(),
                    remote_peer_id: remote_id,
                })
            }
            Err(err) => {
                let _ = transport.shutdown().await;
                Err(err)
            }
        }
    }

    /// Race a handshake future against the shutdown token, if one is set.
    async fn guarded<T>(
        &self,
        handshake: impl Future<Output = Result<T, UpgradeError>>,
    ) -> Result<T, UpgradeError> {
        match self.inner.shutdown.as_ref() {
            Some(shutdown) => tokio::select! {
                result = handshake => result,
                () = shutdown.cancelled() => Err(UpgradeError::Cancelled),
            },
            None => handshake.await,
        }
    }

    async fn run_initiator<S>(&self, io: &mut S, remote_id: &PeerId) -> Result<(), UpgradeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Fail before any byte leaves if the caller's expected identity
        // cannot yield a verification key.
        remote_id
            .extract_public_key()
            .map_err(|_| UpgradeError::BadRemoteIdentity)?;

        // Act 1: send our nonce, revealing our identity.
        let act1 = InitiatorAct1::initiate();
        self.send_act(io, Act::One, &act1.message().marshal())
            .await?;
        trace!("act 1 sent");
        let awaiting_act2 = act1.next();

        // Act 2: the responder must answer as the peer we dialed.
        let envelope = framing::read_envelope(io)
            .await
            .map_err(|err| frame_error(Act::Two, err))?;
        let message = verified_message(Act::Two, remote_id, &envelope)?;
        trace!("act 2 received");
        let act2 = Act2Message::unmarshal(&message).map_err(|source| UpgradeError::KeyAgreement {
            act: Act::Two,
            source,
        })?;
        let act3 = awaiting_act2
            .next(&act2)
            .map_err(|source| UpgradeError::KeyAgreement {
                act: Act::Two,
                source,
            })?;

        // Act 3: confirm the challenge.
        self.send_act(io, Act::Three, &act3.message().marshal())
            .await?;
        trace!("act 3 sent");
        Ok(())
    }

    async fn run_responder<S>(&self, io: &mut S) -> Result<PeerId, UpgradeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Act 1: the initiator reveals itself here. Adopt the identity it
        // presented and pin it for the remainder of the handshake; every
        // later envelope must come from the same peer.
        let envelope = framing::read_envelope(io)
            .await
            .map_err(|err| frame_error(Act::One, err))?;
        let remote_id = PeerId::from_bytes(envelope.peer_id.clone());
        let message = verified_message(Act::One, &remote_id, &envelope)?;
        trace!(remote = %remote_id, "act 1 received");
        let act1 = Act1Message::unmarshal(&message).map_err(|source| UpgradeError::KeyAgreement {
            act: Act::One,
            source,
        })?;

        // Act 2: answer with our nonce and challenge, revealing our
        // identity for the first time.
        let act2 = ResponderAct2::answer(&act1);
        self.send_act(io, Act::Two, &act2.message().marshal())
            .await?;
        trace!("act 2 sent");
        let awaiting_act3 = act2.next();

        // Act 3: the confirmation must come from the pinned peer.
        let envelope = framing::read_envelope(io)
            .await
            .map_err(|err| frame_error(Act::Three, err))?;
        let message = verified_message(Act::Three, &remote_id, &envelope)?;
        trace!("act 3 received");
        let act3 = Act3Message::unmarshal(&message).map_err(|source| UpgradeError::KeyAgreement {
            act: Act::Three,
            source,
        })?;
        awaiting_act3
            .finalize(&act3)
            .map_err(|source| UpgradeError::KeyAgreement {
                act: Act::Three,
                source,
            })?;

        Ok(remote_id)
    }

    /// Sign an act payload, wrap it with our identity, and send it as one
    /// frame.
    async fn send_act<S>(&self, io: &mut S, act: Act, wire: &[u8]) -> Result<(), UpgradeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let signature = self.inner.keypair.sign(wire);
        let envelope = HandshakeEnvelope {
            message: wire.to_vec(),
            peer_id: self.local_peer_id().as_bytes().to_vec(),
            signature: signature.to_vec(),
        };
        framing::write_envelope(io, &envelope)
            .await
            .map_err(|err| frame_error(act, err))
    }
}

/// Check an inbound envelope against the pinned identity and its own
/// signature, returning the act payload on success.
///
/// The sender must equal the pinned identity byte-for-byte before the
/// signature is even looked at; a mismatch is reported as its own error
/// so misrouting and impersonation stay distinguishable from corruption.
fn verified_message(
    act: Act,
    pinned: &PeerId,
    envelope: &HandshakeEnvelope,
) -> Result<Vec<u8>, UpgradeError> {
    let sender = PeerId::from_bytes(envelope.peer_id.clone());
    if *pinned != sender {
        warn!(%act, %pinned, %sender, "envelope sender does not match pinned identity");
        return Err(UpgradeError::IdentityMismatch {
            act,
            pinned: pinned.clone(),
            sender,
        });
    }
    keys::verify(&sender, &envelope.message, &envelope.signature).map_err(|err| {
        warn!(%act, sender = %sender, "envelope failed verification: {err}");
        match err {
            enoki_handshake::Error::MalformedIdentity => UpgradeError::MalformedIdentity { act },
            _ => UpgradeError::SignatureInvalid { act },
        }
    })?;
    Ok(envelope.message.clone())
}

fn frame_error(act: Act, err: FrameError) -> UpgradeError {
    match err {
        FrameError::Oversize(len) => UpgradeError::FrameOversize { act, len },
        FrameError::Malformed => UpgradeError::MalformedEnvelope { act },
        FrameError::Io(source) => UpgradeError::Transport { act, source },
    }
}

/// A byte stream that completed the handshake.
///
/// Reads and writes pass straight through to the underlying transport;
/// the channel is authenticated plaintext, nothing more. What the upgrade
/// adds is the pinned remote identity, available for the connection's
/// whole lifetime.
pub struct AuthenticatedConnection<S> {
    transport: S,
    local_peer_id: PeerId,
    remote_peer_id: PeerId,
}

impl<S> core::fmt::Debug for AuthenticatedConnection<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthenticatedConnection")
            .field("local_peer_id", &self.local_peer_id)
            .field("remote_peer_id", &self.remote_peer_id)
            .finish_non_exhaustive()
    }
}

impl<S> AuthenticatedConnection<S> {
    /// Our own identity on this connection.
    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    /// The authenticated remote identity this connection is pinned to.
    pub fn remote_peer_id(&self) -> &PeerId {
        &self.remote_peer_id
    }

    /// Consume the wrapper and return the underlying transport.
    pub fn into_inner(self) -> S {
        self.transport
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for AuthenticatedConnection<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().transport).poll_read(cx, buf)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for AuthenticatedConnection<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().transport).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().transport).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().transport).poll_shutdown(cx)
    }
}
