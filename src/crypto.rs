//! Crypto collaborators: signing and envelope encryption
//!
//! Key material is opaque to this crate. The envelope hands a byte range to
//! a [`Signer`] and, when the dialog requires it, an entire signed stream
//! to a [`Cipher`]; what happens inside is the collaborator's business.
//! Signature verification of bank responses is advisory: inbound signature
//! segments are parsed but never checked cryptographically.

use crate::domain::KeyName;
use crate::error::Result;

/// Produces the signature carried in the signature end segment.
pub trait Signer {
    /// Name of the signing key, advertised in the signature head
    fn key_name(&self) -> KeyName;

    /// Sign the concatenated to-be-signed segment bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Encrypts and decrypts the signed segment stream of a message.
pub trait Cipher {
    /// Name of the encryption key, advertised in the encryption head
    fn key_name(&self) -> KeyName;

    /// Encrypt the signed byte stream for the encrypted-data segment.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt the payload of an inbound encrypted-data segment.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// PIN/TAN signer: the "signature" is the PIN itself, transmitted over an
/// already-secured transport.
pub struct PinTanSigner {
    key_name: KeyName,
    pin: String,
}

impl PinTanSigner {
    /// Create a signer for the given key name and PIN.
    pub fn new(key_name: KeyName, pin: impl Into<String>) -> Self {
        Self {
            key_name,
            pin: pin.into(),
        }
    }
}

impl std::fmt::Debug for PinTanSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The PIN stays out of debug output.
        f.debug_struct("PinTanSigner")
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

impl Signer for PinTanSigner {
    fn key_name(&self) -> KeyName {
        self.key_name.clone()
    }

    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.pin.clone().into_bytes())
    }
}

/// XChaCha20-Poly1305 cipher adapter, available with the `aead` feature.
///
/// The 24-byte nonce is generated per message and prepended to the
/// ciphertext.
#[cfg(feature = "aead")]
pub struct AeadCipher {
    key_name: KeyName,
    cipher: chacha20poly1305::XChaCha20Poly1305,
}

#[cfg(feature = "aead")]
impl AeadCipher {
    /// Nonce length prepended to every ciphertext.
    pub const NONCE_LEN: usize = 24;

    /// Create a cipher from a 32-byte key.
    pub fn new(key: &[u8; 32], key_name: KeyName) -> Self {
        use chacha20poly1305::KeyInit;
        Self {
            key_name,
            cipher: chacha20poly1305::XChaCha20Poly1305::new(key.into()),
        }
    }
}

#[cfg(feature = "aead")]
impl Cipher for AeadCipher {
    fn key_name(&self) -> KeyName {
        self.key_name.clone()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        use chacha20poly1305::aead::{Aead, OsRng};
        use chacha20poly1305::{AeadCore, XChaCha20Poly1305};

        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| crate::error::Error::Crypto("envelope encryption failed".into()))?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        use chacha20poly1305::aead::Aead;
        use chacha20poly1305::XNonce;

        if ciphertext.len() < Self::NONCE_LEN {
            return Err(crate::error::Error::Crypto(
                "ciphertext shorter than its nonce".into(),
            ));
        }
        let (nonce, payload) = ciphertext.split_at(Self::NONCE_LEN);
        self.cipher
            .decrypt(XNonce::from_slice(nonce), payload)
            .map_err(|_| crate::error::Error::Crypto("envelope decryption failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BankId;

    #[test]
    fn test_pin_tan_signature_is_the_pin() {
        let key = KeyName::signing(BankId::german("10020030"), "user1");
        let signer = PinTanSigner::new(key, "12345");
        assert_eq!(signer.sign(b"whatever").unwrap(), b"12345");
    }

    #[test]
    fn test_pin_stays_out_of_debug_output() {
        let key = KeyName::signing(BankId::german("10020030"), "user1");
        let signer = PinTanSigner::new(key, "s3cret");
        assert!(!format!("{signer:?}").contains("s3cret"));
    }

    #[cfg(feature = "aead")]
    #[test]
    fn test_aead_roundtrip() {
        let key = KeyName::encryption(BankId::german("10020030"), "user1");
        let cipher = AeadCipher::new(&[7u8; 32], key);
        let plaintext = b"HNSHK:2:3+999+1'job data'";
        let sealed = cipher.encrypt(plaintext).unwrap();
        assert_ne!(&sealed[AeadCipher::NONCE_LEN..], plaintext.as_slice());
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[cfg(feature = "aead")]
    #[test]
    fn test_aead_rejects_tampering() {
        let key = KeyName::encryption(BankId::german("10020030"), "user1");
        let cipher = AeadCipher::new(&[7u8; 32], key);
        let mut sealed = cipher.encrypt(b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(cipher.decrypt(&sealed).is_err());
    }
}
