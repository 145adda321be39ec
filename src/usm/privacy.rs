//! Privacy (decryption) for captured SNMPv3 messages (RFC 3414, RFC 3826).
//!
//! Two algorithm variants:
//!
//! ## DES-CBC (RFC 3414 Section 8)
//! - privKey: first 8 bytes = DES key, next 8 bytes = pre-IV
//! - msgPrivacyParameters (salt): exactly 8 bytes
//! - IV = pre-IV XOR salt
//! - ciphertext must be a positive multiple of 8
//!
//! ## AES-128-CFB (RFC 3826 Section 3)
//! - privKey: first 16 bytes = AES key
//! - msgPrivacyParameters (salt): exactly 8 bytes
//! - IV = engineBoots (4, BE) || engineTime (4, BE) || salt (8)
//!   (concatenation, NOT XOR)
//! - no block-multiple constraint
//!
//! Boots and time come from the message's security parameters, never
//! from the ciphertext. The forward transforms are provided so tests and
//! tooling can synthesize fixtures with explicit salt inputs.

use bytes::Bytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::PrivProtocol;
use crate::error::{CryptoErrorKind, Error, Result};

/// Privacy key for scopedPDU decryption.
///
/// Derived from a password and engine ID with the same algorithm as
/// authentication keys - the key is sized by the *authentication*
/// protocol's digest, per RFC 3414. Key material is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    /// Derive a privacy key from a password and engine ID.
    ///
    /// `auth_protocol` drives the derivation (RFC 3414 couples the
    /// privacy key to the authentication algorithm's digest size);
    /// `priv_protocol` selects how the key bytes are consumed:
    /// DES uses 8 key + 8 pre-IV, AES uses the first 16 as key.
    pub fn from_password(
        auth_protocol: super::AuthProtocol,
        priv_protocol: PrivProtocol,
        password: &[u8],
        engine_id: &[u8],
    ) -> Self {
        let digest1 = super::auth::derive_digest_key(auth_protocol, password);
        let key = super::auth::localize_key(auth_protocol, &digest1, engine_id);
        Self {
            key,
            protocol: priv_protocol,
        }
    }

    /// Create a privacy key from raw localized key bytes.
    pub fn from_bytes(protocol: PrivProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// Get the privacy protocol.
    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    /// Decrypt a scopedPDU using the message's privacy parameters.
    ///
    /// `engine_boots`/`engine_time` are the counters from the message's
    /// USM security parameters (used only by AES); `priv_params` is the
    /// 8-byte salt.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        if priv_params.len() != 8 {
            return Err(Error::privacy(CryptoErrorKind::WrongSaltLength {
                actual: priv_params.len(),
            }));
        }
        if self.key.len() < self.protocol.key_len() {
            return Err(Error::privacy(CryptoErrorKind::InsufficientKeyMaterial {
                needed: self.protocol.key_len(),
                actual: self.key.len(),
            }));
        }

        match self.protocol {
            PrivProtocol::Des => self.decrypt_des(ciphertext, priv_params),
            PrivProtocol::Aes => {
                self.decrypt_aes(ciphertext, engine_boots, engine_time, priv_params)
            }
        }
    }

    /// DES-CBC decryption (RFC 3414 Section 8.1.1.3).
    fn decrypt_des(&self, ciphertext: &[u8], salt: &[u8]) -> Result<Bytes> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};
        type DesCbc = cbc::Decryptor<des::Des>;

        if ciphertext.is_empty() || ciphertext.len() % 8 != 0 {
            return Err(Error::privacy(CryptoErrorKind::BadCiphertextLength {
                length: ciphertext.len(),
                block_size: 8,
            }));
        }

        let des_key = &self.key[..8];
        let pre_iv = &self.key[8..16];

        // The salt is XOR-ed with the pre-IV to obtain the IV
        let mut iv = [0u8; 8];
        for i in 0..8 {
            iv[i] = pre_iv[i] ^ salt[i];
        }

        let cipher = DesCbc::new_from_slices(des_key, &iv)
            .map_err(|_| Error::privacy(CryptoErrorKind::CipherUnavailable))?;

        let mut buffer = ciphertext.to_vec();
        let cleartext = cipher
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buffer)
            .map_err(|e| Error::privacy(CryptoErrorKind::CipherFailure(e.to_string())))?;

        // Cleartext has the same length as the ciphertext
        Ok(Bytes::copy_from_slice(cleartext))
    }

    /// AES-CFB decryption (RFC 3826 Section 3.1.4).
    fn decrypt_aes(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &[u8],
    ) -> Result<Bytes> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Decryptor<aes::Aes128>;

        let aes_key = &self.key[..16];
        let iv = aes_iv(engine_boots, engine_time, salt);

        let cipher = Aes128Cfb::new_from_slices(aes_key, &iv)
            .map_err(|_| Error::privacy(CryptoErrorKind::CipherUnavailable))?;

        let mut buffer = ciphertext.to_vec();
        cipher.decrypt(&mut buffer);

        Ok(Bytes::from(buffer))
    }

    /// Encrypt a plaintext with an explicit salt - the forward transform
    /// of [`decrypt`](Self::decrypt), for synthesizing fixtures.
    ///
    /// DES pads the plaintext with zeros to an 8-byte boundary, so the
    /// ciphertext (and hence the decrypted output) may be longer than
    /// the input.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        if priv_params.len() != 8 {
            return Err(Error::privacy(CryptoErrorKind::WrongSaltLength {
                actual: priv_params.len(),
            }));
        }
        if self.key.len() < self.protocol.key_len() {
            return Err(Error::privacy(CryptoErrorKind::InsufficientKeyMaterial {
                needed: self.protocol.key_len(),
                actual: self.key.len(),
            }));
        }

        match self.protocol {
            PrivProtocol::Des => self.encrypt_des(plaintext, priv_params),
            PrivProtocol::Aes => {
                self.encrypt_aes(plaintext, engine_boots, engine_time, priv_params)
            }
        }
    }

    fn encrypt_des(&self, plaintext: &[u8], salt: &[u8]) -> Result<Bytes> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};
        type DesCbc = cbc::Encryptor<des::Des>;

        let des_key = &self.key[..8];
        let pre_iv = &self.key[8..16];

        let mut iv = [0u8; 8];
        for i in 0..8 {
            iv[i] = pre_iv[i] ^ salt[i];
        }

        let padded_len = plaintext.len().div_ceil(8) * 8;
        let mut buffer = vec![0u8; padded_len];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let cipher = DesCbc::new_from_slices(des_key, &iv)
            .map_err(|_| Error::privacy(CryptoErrorKind::CipherUnavailable))?;

        let ciphertext = cipher
            .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buffer, padded_len)
            .map_err(|e| Error::privacy(CryptoErrorKind::CipherFailure(e.to_string())))?;

        Ok(Bytes::copy_from_slice(ciphertext))
    }

    fn encrypt_aes(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &[u8],
    ) -> Result<Bytes> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Encryptor<aes::Aes128>;

        let aes_key = &self.key[..16];
        let iv = aes_iv(engine_boots, engine_time, salt);

        let cipher = Aes128Cfb::new_from_slices(aes_key, &iv)
            .map_err(|_| Error::privacy(CryptoErrorKind::CipherUnavailable))?;

        let mut buffer = plaintext.to_vec();
        cipher.encrypt(&mut buffer);

        Ok(Bytes::from(buffer))
    }
}

/// AES IV: engineBoots (4, BE) || engineTime (4, BE) || salt (8).
fn aes_iv(engine_boots: u32, engine_time: u32, salt: &[u8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..].copy_from_slice(salt);
    iv
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Heuristic check that a decrypted buffer plausibly contains a
/// plaintext ScopedPDU.
///
/// Wrong keys "successfully" decrypt to garbage with stream and block
/// ciphers alike; this lets a caller decide whether the cleartext is
/// worth dissecting. Accepts a constructed universal SEQUENCE whose
/// length roughly matches the buffer.
pub fn looks_like_scoped_pdu(data: &[u8]) -> bool {
    use crate::ber::Decoder;

    let mut dec = Decoder::from_slice(data);
    let ident = match dec.read_identifier() {
        Ok(ident) => ident,
        Err(_) => return false,
    };
    if !(ident.class == crate::ber::Class::Universal
        && ident.constructed
        && ident.tag == crate::ber::tag::universal::SEQUENCE)
    {
        return false;
    }
    let len = match dec.read_length() {
        Ok(len) => len,
        Err(_) => return false,
    };
    // DES padding may leave up to 7 trailing bytes beyond the sequence
    let end = dec.offset() + len;
    end <= data.len() && data.len() - end < 8
}
