#![deny(unsafe_code)]

//! # enoki-handshake
//!
//! A pure, sans-IO implementation of the enoki three-act authentication
//! handshake: a challenge-response key agreement between two peers
//! identified by Ed25519 public keys.
//!
//! The crate owns three things:
//!
//! - [`keys`]: peer identities ([`PeerId`], [`KeyPair`]) and the signature
//!   operations used to authenticate every handshake message
//! - [`envelope`]: the `{message, peer_id, signature}` wire record and its
//!   byte encoding
//! - [`acts`]: the typed act progression. Each step returns the next-state
//!   object, so a consumed state cannot be replayed
//!
//! Driving the acts over an actual byte stream (framing, identity pinning,
//! connection teardown) lives in the `enoki-net` crate.
//!
//! ## Security Properties
//!
//! - Strict Ed25519 signature verification
//! - Constant-time challenge comparisons
//! - No recursive parsing, no panics on network input
//! - Key material zeroized on drop

pub mod acts;
pub mod envelope;
pub mod error;
pub mod keys;

// Re-export the primary public API
pub use acts::{
    Act1Message, Act2Message, Act3Message, InitiatorAct1, InitiatorAct2, InitiatorAct3,
    ResponderAct2, ResponderAct3,
};
pub use envelope::HandshakeEnvelope;
pub use error::Error;
pub use keys::{verify, KeyPair, PeerId};
