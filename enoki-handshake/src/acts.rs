//! The three-act challenge-response key agreement.
//!
//! ```text
//! initiator                            responder
//!     -> act 1: nonce1
//!     <- act 2: nonce2, SHA-256(nonce1 || nonce2)
//!     -> act 3: SHA-256(nonce1 || nonce2)
//! ```
//!
//! Act 2 proves the responder saw act 1; act 3 proves the initiator saw
//! act 2. Authentication of *who* sent each act is not this module's job:
//! every act travels inside a signed envelope, and the transport layer
//! verifies the signature before the payload reaches these types.
//!
//! Each step is a distinct type that consumes itself on transition, so a
//! spent state cannot be replayed: `InitiatorAct1 -> InitiatorAct2 ->
//! InitiatorAct3` on one side, `ResponderAct2 -> ResponderAct3` on the
//! other. Challenge comparisons are constant-time.

use rand_core::{CryptoRngCore, OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::Error;

/// Length of a handshake nonce in bytes.
pub const NONCE_LEN: usize = 32;

/// Length of a challenge (a SHA-256 digest) in bytes.
pub const CHALLENGE_LEN: usize = 32;

/// `SHA-256(nonce1 || nonce2)`.
fn compute_challenge(nonce1: &[u8; NONCE_LEN], nonce2: &[u8; NONCE_LEN]) -> [u8; CHALLENGE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(nonce1);
    hasher.update(nonce2);
    hasher.finalize().into()
}

// ===== Act payloads =====

/// Act 1 payload: the initiator's nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Act1Message {
    pub nonce1: [u8; NONCE_LEN],
}

/// Act 2 payload: the responder's nonce and its challenge over both nonces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Act2Message {
    pub nonce2: [u8; NONCE_LEN],
    pub challenge: [u8; CHALLENGE_LEN],
}

/// Act 3 payload: the initiator's confirmation of the shared challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Act3Message {
    pub challenge: [u8; CHALLENGE_LEN],
}

impl Act1Message {
    /// Encoded length in bytes.
    pub const LEN: usize = NONCE_LEN;

    pub fn marshal(&self) -> Vec<u8> {
        self.nonce1.to_vec()
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let nonce1 = data.try_into().map_err(|_| Error::MalformedAct)?;
        Ok(Self { nonce1 })
    }
}

impl Act2Message {
    /// Encoded length in bytes.
    pub const LEN: usize = NONCE_LEN + CHALLENGE_LEN;

    pub fn marshal(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&self.nonce2);
        data.extend_from_slice(&self.challenge);
        data
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        if data.len() != Self::LEN {
            return Err(Error::MalformedAct);
        }
        let mut nonce2 = [0u8; NONCE_LEN];
        let mut challenge = [0u8; CHALLENGE_LEN];
        nonce2.copy_from_slice(&data[..NONCE_LEN]);
        challenge.copy_from_slice(&data[NONCE_LEN..]);
        Ok(Self { nonce2, challenge })
    }
}

impl Act3Message {
    /// Encoded length in bytes.
    pub const LEN: usize = CHALLENGE_LEN;

    pub fn marshal(&self) -> Vec<u8> {
        self.challenge.to_vec()
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let challenge = data.try_into().map_err(|_| Error::MalformedAct)?;
        Ok(Self { challenge })
    }
}

// ===== Initiator track =====

/// Initiator state before act 1 has been sent.
pub struct InitiatorAct1 {
    nonce1: [u8; NONCE_LEN],
}

impl InitiatorAct1 {
    /// Start a handshake with a fresh nonce from the operating system RNG.
    pub fn initiate() -> Self {
        Self::initiate_with_rng(&mut OsRng)
    }

    /// Start a handshake with a specific RNG (useful for testing).
    pub fn initiate_with_rng(rng: &mut impl CryptoRngCore) -> Self {
        let mut nonce1 = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce1);
        Self { nonce1 }
    }

    /// The act 1 payload to put on the wire.
    pub fn message(&self) -> Act1Message {
        Act1Message {
            nonce1: self.nonce1,
        }
    }

    /// Advance: act 1 has been sent, wait for act 2.
    pub fn next(self) -> InitiatorAct2 {
        InitiatorAct2 {
            nonce1: self.nonce1,
        }
    }
}

/// Initiator state awaiting the responder's act 2.
pub struct InitiatorAct2 {
    nonce1: [u8; NONCE_LEN],
}

impl InitiatorAct2 {
    /// Validate the responder's challenge and advance to act 3.
    ///
    /// The challenge must equal `SHA-256(nonce1 || nonce2)` for the nonce
    /// we sent and the nonce the responder returned; anything else is a
    /// [`Error::ChallengeMismatch`].
    pub fn next(self, act2: &Act2Message) -> Result<InitiatorAct3, Error> {
        let expected = compute_challenge(&self.nonce1, &act2.nonce2);
        if !bool::from(expected.ct_eq(&act2.challenge)) {
            return Err(Error::ChallengeMismatch);
        }
        Ok(InitiatorAct3 {
            challenge: expected,
        })
    }
}

/// Initiator state ready to send act 3.
pub struct InitiatorAct3 {
    challenge: [u8; CHALLENGE_LEN],
}

impl InitiatorAct3 {
    /// The act 3 payload to put on the wire.
    pub fn message(&self) -> Act3Message {
        Act3Message {
            challenge: self.challenge,
        }
    }
}

// ===== Responder track =====

/// Responder state after act 1 has been received, ready to send act 2.
pub struct ResponderAct2 {
    nonce2: [u8; NONCE_LEN],
    challenge: [u8; CHALLENGE_LEN],
}

impl ResponderAct2 {
    /// Answer an initiator's act 1 with a fresh nonce from the operating
    /// system RNG.
    pub fn answer(act1: &Act1Message) -> Self {
        Self::answer_with_rng(act1, &mut OsRng)
    }

    /// Answer an initiator's act 1 with a specific RNG (useful for testing).
    pub fn answer_with_rng(act1: &Act1Message, rng: &mut impl CryptoRngCore) -> Self {
        let mut nonce2 = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce2);
        let challenge = compute_challenge(&act1.nonce1, &nonce2);
        Self { nonce2, challenge }
    }

    /// The act 2 payload to put on the wire.
    pub fn message(&self) -> Act2Message {
        Act2Message {
            nonce2: self.nonce2,
            challenge: self.challenge,
        }
    }

    /// Advance: act 2 has been sent, wait for act 3.
    pub fn next(self) -> ResponderAct3 {
        ResponderAct3 {
            challenge: self.challenge,
        }
    }
}

/// Responder state awaiting the initiator's act 3.
pub struct ResponderAct3 {
    challenge: [u8; CHALLENGE_LEN],
}

impl ResponderAct3 {
    /// Validate the initiator's confirmation and complete the handshake.
    pub fn finalize(self, act3: &Act3Message) -> Result<(), Error> {
        if !bool::from(self.challenge.ct_eq(&act3.challenge)) {
            return Err(Error::ChallengeMismatch);
        }
        Ok(())
    }
}
