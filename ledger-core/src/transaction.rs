//! Transaction data structures and signature recovery

use crate::{Address, CoreError, CoreResult, Hash};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};

/// Recoverable ECDSA signature (r, s, v)
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// All-zero placeholder, used by synthetic transactions
    pub fn zero() -> Self {
        Self::new([0u8; 32], [0u8; 32], 0)
    }

    /// Compact 64-byte (r || s) form
    pub fn to_compact(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::zero()
    }
}

/// A value transfer between two accounts
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Declared sender, checked against the recovered signer on verify
    pub sender: Address,
    /// Recipient address
    pub to: Address,
    /// Sender nonce this transaction commits
    pub nonce: u64,
    /// Value to transfer
    pub value: u64,
    /// Gas offered
    pub gas: u64,
    /// Price per gas unit
    pub gas_price: u64,
    /// Recoverable signature over the payload
    pub signature: Signature,
}

/// Payload encoded for signing, without the signature
#[derive(bincode::Encode)]
struct SigningPayload {
    sender: Address,
    to: Address,
    nonce: u64,
    value: u64,
    gas: u64,
    gas_price: u64,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(
        sender: Address,
        to: Address,
        nonce: u64,
        value: u64,
        gas: u64,
        gas_price: u64,
    ) -> Self {
        Self {
            sender,
            to,
            nonce,
            value,
            gas,
            gas_price,
            signature: Signature::zero(),
        }
    }

    /// Transaction identity: digest of the full canonical encoding,
    /// signature included
    pub fn hash(&self) -> CoreResult<Hash> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CoreError::Encode(e.to_string()))?;
        Ok(Hash::digest(&encoded))
    }

    /// Digest of the payload without the signature
    pub fn signing_hash(&self) -> CoreResult<Hash> {
        let payload = SigningPayload {
            sender: self.sender,
            to: self.to,
            nonce: self.nonce,
            value: self.value,
            gas: self.gas,
            gas_price: self.gas_price,
        };
        let encoded = bincode::encode_to_vec(&payload, bincode::config::standard())
            .map_err(|e| CoreError::Encode(e.to_string()))?;
        Ok(Hash::digest(&encoded))
    }

    /// Sign the payload with a raw 32-byte secret key
    pub fn sign(&mut self, private_key: &[u8]) -> CoreResult<()> {
        let secp = Secp256k1::new();
        let secret_key =
            SecretKey::from_slice(private_key).map_err(|e| CoreError::Crypto(e.to_string()))?;
        let message = Message::from_digest_slice(self.signing_hash()?.as_bytes())
            .map_err(|e| CoreError::Crypto(e.to_string()))?;

        let signature = secp.sign_ecdsa_recoverable(&message, &secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[0..32]);
        s.copy_from_slice(&compact[32..64]);
        self.signature = Signature::new(r, s, recovery_id.to_i32() as u8);
        Ok(())
    }

    /// Recover the signing address from the signature
    pub fn recover_signer(&self) -> CoreResult<Address> {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(self.signing_hash()?.as_bytes())
            .map_err(|e| CoreError::Crypto(e.to_string()))?;

        let recovery_id = RecoveryId::from_i32(self.signature.v as i32)
            .map_err(|e| CoreError::Crypto(e.to_string()))?;
        let signature =
            RecoverableSignature::from_compact(&self.signature.to_compact(), recovery_id)
                .map_err(|e| CoreError::Crypto(e.to_string()))?;

        let public_key = secp
            .recover_ecdsa(&message, &signature)
            .map_err(|e| CoreError::Crypto(e.to_string()))?;
        Ok(Address::from_public_key(&public_key))
    }

    /// Check that the recovered signer matches the declared sender
    pub fn verify(&self) -> bool {
        matches!(self.recover_signer(), Ok(addr) if addr == self.sender)
    }
}
