//! Peer identities and the signature operations behind envelope
//! authentication.
//!
//! A [`PeerId`] is the short byte-string form of a peer's identity. The
//! well-formed encoding is a one-byte key-type tag followed by the raw
//! Ed25519 public key, so the public key can always be recovered from the
//! identifier alone. Identities received from the network are opaque bytes
//! until [`PeerId::extract_public_key`] is called on them; equality is
//! byte equality.

use ed25519_dalek::{Signature, Signer, SigningKey};
use rand_core::{CryptoRngCore, OsRng};

use crate::error::Error;

pub use ed25519_dalek::VerifyingKey;

/// The length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A peer identity: a key-type tag followed by the public key bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    /// Key-type tag for Ed25519 identities.
    pub const ED25519_TAG: u8 = 0x01;

    /// The length of a well-formed identity in bytes (tag + public key).
    pub const LEN: usize = 1 + 32;

    /// Derive the identity for an Ed25519 public key.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.push(Self::ED25519_TAG);
        bytes.extend_from_slice(key.as_bytes());
        Self(bytes)
    }

    /// Wrap raw identity bytes, e.g. as received inside an envelope.
    ///
    /// No validation happens here; malformed identities are only detected
    /// when the public key is extracted.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Recover the public key embedded in this identity.
    ///
    /// Total for well-formed identities; returns
    /// [`Error::MalformedIdentity`] for anything else (wrong length, wrong
    /// tag, or bytes that are not a valid curve point).
    pub fn extract_public_key(&self) -> Result<VerifyingKey, Error> {
        let (tag, key) = self.0.split_first().ok_or(Error::MalformedIdentity)?;
        if *tag != Self::ED25519_TAG {
            return Err(Error::MalformedIdentity);
        }
        let key: [u8; 32] = key.try_into().map_err(|_| Error::MalformedIdentity)?;
        VerifyingKey::from_bytes(&key).map_err(|_| Error::MalformedIdentity)
    }
}

impl core::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PeerId({:02x?})", &self.0[..self.0.len().min(6)])
    }
}

impl core::fmt::Display for PeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A local identity: an Ed25519 signing key and the derived [`PeerId`].
///
/// The signing key is zeroized on drop by `ed25519-dalek`. The keypair is
/// `Clone` so it can be shared across concurrent handshakes.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
    peer_id: PeerId,
}

impl KeyPair {
    /// Generate a new random keypair from the operating system RNG.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a new random keypair using the provided RNG.
    pub fn generate_with_rng(rng: &mut impl CryptoRngCore) -> Self {
        let signing = SigningKey::generate(rng);
        let peer_id = PeerId::from_public_key(&signing.verifying_key());
        Self { signing, peer_id }
    }

    /// Create a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let peer_id = PeerId::from_public_key(&signing.verifying_key());
        Self { signing, peer_id }
    }

    /// The identity derived from this keypair's public key.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The Ed25519 public key.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Sign a message with the private key.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(message).to_bytes()
    }
}

/// Verify a signature over `message` against the public key embedded in
/// `peer_id`.
///
/// Uses strict verification to reject malleable signatures. Total: any
/// input that is not a valid `(identity, message, signature)` triple yields
/// an error, never a panic.
pub fn verify(peer_id: &PeerId, message: &[u8], signature: &[u8]) -> Result<(), Error> {
    let public_key = peer_id.extract_public_key()?;
    let signature: [u8; SIGNATURE_LEN] =
        signature.try_into().map_err(|_| Error::SignatureInvalid)?;
    let signature = Signature::from_bytes(&signature);
    public_key
        .verify_strict(message, &signature)
        .map_err(|_| Error::SignatureInvalid)
}
