#![deny(unsafe_code)]

//! # enoki-net
//!
//! Turns inbound and outbound unauthenticated, plain-text byte streams
//! into authenticated, plain-text connections by driving the
//! [`enoki-handshake`] three-act protocol over the stream. Notably, the
//! upgraded connection does not guarantee confidentiality: nothing is
//! encrypted after the handshake.
//!
//! This crate provides:
//!
//! - [`Authenticator`]: per-node configuration (local keypair, optional
//!   shutdown token) shared across concurrent handshakes
//! - [`Authenticator::upgrade_outbound`] / [`Authenticator::upgrade_inbound`]:
//!   the initiator and responder drivers
//! - [`AuthenticatedConnection`]: the upgraded stream, pinned to the
//!   remote peer's identity
//! - [`framing`]: length-prefixed envelope framing with a hard frame cap
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enoki_net::{Authenticator, KeyPair};
//!
//! # async fn demo(stream_a: tokio::io::DuplexStream, stream_b: tokio::io::DuplexStream) {
//! let alice = Authenticator::new(KeyPair::generate());
//! let bob = Authenticator::new(KeyPair::generate());
//! let bob_id = bob.local_peer_id().clone();
//!
//! let (outbound, inbound) = tokio::join!(
//!     alice.upgrade_outbound(stream_a, bob_id),
//!     bob.upgrade_inbound(stream_b),
//! );
//! let inbound = inbound.unwrap();
//! assert_eq!(inbound.remote_peer_id(), alice.local_peer_id());
//! # let _ = outbound;
//! # }
//! ```

pub mod framing;

mod connection;

// Re-export key types from enoki-handshake for convenience.
pub use enoki_handshake::{Error as HandshakeError, KeyPair, PeerId};

pub use connection::{AuthenticatedConnection, Authenticator};

use std::io;

/// One step of the three-message handshake, named in errors so a failed
/// upgrade reports the stage it died in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Act {
    One,
    Two,
    Three,
}

impl core::fmt::Display for Act {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::One => write!(f, "act 1"),
            Self::Two => write!(f, "act 2"),
            Self::Three => write!(f, "act 3"),
        }
    }
}

/// Why an upgrade failed.
///
/// Every variant is fatal to the handshake: the driver tears the transport
/// down before returning one, and nothing is retried internally. Retrying
/// is the caller's decision, on a fresh connection.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// The expected remote identity handed to `upgrade_outbound` does not
    /// carry an extractable public key.
    #[error("expected remote identity is malformed")]
    BadRemoteIdentity,

    /// The transport failed while reading or writing an act.
    #[error("transport i/o failed during {act}")]
    Transport {
        act: Act,
        #[source]
        source: io::Error,
    },

    /// A frame exceeded the maximum frame size.
    #[error("frame of {len} bytes exceeds the maximum during {act}")]
    FrameOversize { act: Act, len: usize },

    /// A frame arrived but its envelope could not be decoded.
    #[error("malformed envelope during {act}")]
    MalformedEnvelope { act: Act },

    /// An envelope's sender identity does not carry an extractable
    /// public key.
    #[error("malformed sender identity during {act}")]
    MalformedIdentity { act: Act },

    /// An envelope's signature does not verify against its sender.
    #[error("signature verification failed during {act}")]
    SignatureInvalid { act: Act },

    /// An envelope's sender does not match the pinned remote identity.
    ///
    /// Reported distinctly from [`UpgradeError::SignatureInvalid`]: it
    /// indicates either a misrouted connection or an impersonation attempt,
    /// not a corrupt signature.
    #[error("pinned identity {pinned} does not match sender {sender} during {act}")]
    IdentityMismatch {
        act: Act,
        pinned: PeerId,
        sender: PeerId,
    },

    /// The key agreement itself rejected an act payload.
    #[error("key agreement failed during {act}")]
    KeyAgreement {
        act: Act,
        #[source]
        source: HandshakeError,
    },

    /// The authenticator's shutdown token fired mid-handshake.
    #[error("handshake cancelled")]
    Cancelled,
}
