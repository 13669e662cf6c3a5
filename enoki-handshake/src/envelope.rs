//! The handshake envelope: the framed wire record that carries one act.
//!
//! Every act crosses the wire exactly once, wrapped in an envelope holding
//! the act payload, the sender's identity bytes, and the sender's signature
//! over the payload. The encoding is the three fields in order, each
//! prefixed with a `u16` big-endian length. Stream-level framing (the outer
//! length prefix and the maximum frame size) is the transport layer's
//! concern, not the envelope's.

use crate::error::Error;

/// One act's wire record: `{message, peer_id, signature}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeEnvelope {
    /// The marshaled act payload.
    pub message: Vec<u8>,
    /// The sender's identity bytes.
    pub peer_id: Vec<u8>,
    /// Signature over `message` under the sender's private key.
    pub signature: Vec<u8>,
}

/// Length of one field's `u16` big-endian length prefix.
const FIELD_PREFIX_LEN: usize = 2;

impl HandshakeEnvelope {
    /// Encode the envelope to bytes.
    ///
    /// Fails with [`Error::MalformedEnvelope`] if any field is longer than
    /// a `u16` length prefix can express.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let fields = [&self.message, &self.peer_id, &self.signature];

        let mut encoded = Vec::with_capacity(
            fields.iter().map(|f| FIELD_PREFIX_LEN + f.len()).sum(),
        );
        for field in fields {
            let len = u16::try_from(field.len()).map_err(|_| Error::MalformedEnvelope)?;
            encoded.extend_from_slice(&len.to_be_bytes());
            encoded.extend_from_slice(field);
        }
        Ok(encoded)
    }

    /// Decode an envelope from bytes.
    ///
    /// Rejects truncated input and trailing bytes.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let mut rest = data;
        let message = take_field(&mut rest)?;
        let peer_id = take_field(&mut rest)?;
        let signature = take_field(&mut rest)?;
        if !rest.is_empty() {
            return Err(Error::MalformedEnvelope);
        }
        Ok(Self {
            message,
            peer_id,
            signature,
        })
    }
}

/// Split one length-prefixed field off the front of `rest`.
fn take_field(rest: &mut &[u8]) -> Result<Vec<u8>, Error> {
    if rest.len() < FIELD_PREFIX_LEN {
        return Err(Error::MalformedEnvelope);
    }
    let (prefix, tail) = rest.split_at(FIELD_PREFIX_LEN);
    let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
    if tail.len() < len {
        return Err(Error::MalformedEnvelope);
    }
    let (field, tail) = tail.split_at(len);
    *rest = tail;
    Ok(field.to_vec())
}
