/// Errors that can occur while parsing or validating handshake material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peer identity does not carry an extractable public key.
    MalformedIdentity,
    /// A signature does not verify against the sender's identity.
    SignatureInvalid,
    /// An envelope is truncated, has a bad field length, or trailing bytes.
    MalformedEnvelope,
    /// An act payload has the wrong length for its act.
    MalformedAct,
    /// A peer presented a challenge that does not match the exchanged nonces.
    ChallengeMismatch,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MalformedIdentity => write!(f, "malformed peer identity"),
            Self::SignatureInvalid => write!(f, "signature verification failed"),
            Self::MalformedEnvelope => write!(f, "malformed handshake envelope"),
            Self::MalformedAct => write!(f, "malformed act payload"),
            Self::ChallengeMismatch => write!(f, "challenge does not match exchanged nonces"),
        }
    }
}

impl core::error::Error for Error {}
