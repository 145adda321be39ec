//! Authentication key derivation and HMAC verification (RFC 3414).
//!
//! This module implements:
//! - Password-to-key derivation (1MB expansion + hash, RFC 3414 A.2.1/A.2.2)
//! - Key localization (binding a key to an engine ID)
//! - Truncated-HMAC verification of captured messages

use digest::{Digest, KeyInit, Mac, OutputSizeUser};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;
use crate::error::{AuthErrorKind, Error, Result};

/// Minimum password length recommended by net-snmp.
///
/// Shorter passwords are accepted (the capture side cannot reject what an
/// operator configured), but a warning is logged.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authenticator length: HMAC-MD5-96 and HMAC-SHA-96 both truncate to 12.
pub const AUTHENTICATOR_LEN: usize = 12;

/// Localized authentication key.
///
/// A key derived from a password and bound to a specific engine ID,
/// usable for HMAC verification of messages from that engine.
///
/// Key material is zeroed from memory on drop via the `zeroize` crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AuthKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl AuthKey {
    /// Derive a localized key from a password and engine ID.
    ///
    /// RFC 3414 Section A.2:
    /// 1. Expand the password to 1MB by repetition and hash it
    /// 2. Hash (digest1 || engine_id || digest1) to localize
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        if password.len() < MIN_PASSWORD_LENGTH {
            tracing::warn!(
                password_len = password.len(),
                min_len = MIN_PASSWORD_LENGTH,
                "password is shorter than the recommended minimum"
            );
        }
        let digest1 = derive_digest_key(protocol, password);
        let localized = localize_key(protocol, &digest1, engine_id);
        Self {
            key: localized,
            protocol,
        }
    }

    /// Create a key from already-localized bytes (e.g. from configuration).
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// Get the protocol this key is for.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Compute the truncated HMAC (12 bytes) over a message.
    pub fn compute_hmac(&self, data: &[u8]) -> Vec<u8> {
        match self.protocol {
            AuthProtocol::Md5 => compute_hmac_md5(&self.key, data),
            AuthProtocol::Sha1 => compute_hmac_sha1(&self.key, data),
        }
    }

    /// Verify a truncated HMAC in constant time.
    pub fn verify_hmac(&self, data: &[u8], expected: &[u8]) -> bool {
        let computed = self.compute_hmac(data);
        if computed.len() != expected.len() {
            return false;
        }
        bool::from(computed.ct_eq(expected))
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Password to key transformation (RFC 3414 Section A.2.1).
///
/// Streams a virtual 1MB repetition of the password through the hash in
/// 64-byte chunks; the full expansion is never materialized.
pub fn derive_digest_key(protocol: AuthProtocol, password: &[u8]) -> Vec<u8> {
    const EXPANSION_SIZE: usize = 1_048_576; // 1MB

    match protocol {
        AuthProtocol::Md5 => derive_digest_key_impl::<md5::Md5>(password, EXPANSION_SIZE),
        AuthProtocol::Sha1 => derive_digest_key_impl::<sha1::Sha1>(password, EXPANSION_SIZE),
    }
}

fn derive_digest_key_impl<D>(password: &[u8], expansion_size: usize) -> Vec<u8>
where
    D: Digest + Default,
{
    if password.is_empty() {
        // Derivation is undefined for empty passwords; produce an
        // all-zero key of the right length rather than divide by zero
        return vec![0u8; <D as OutputSizeUser>::output_size()];
    }

    let mut hasher = D::new();

    let mut buf = [0u8; 64];
    let password_len = password.len();
    let mut password_index = 0;
    let mut count = 0;

    while count < expansion_size {
        // Take the next octet of the password, wrapping to the
        // beginning as necessary
        for byte in &mut buf {
            *byte = password[password_index];
            password_index = (password_index + 1) % password_len;
        }
        hasher.update(buf);
        count += 64;
    }

    hasher.finalize().to_vec()
}

/// Key localization (RFC 3414 Section A.2.2).
///
/// localized_key = H(digest1 || engine_id || digest1)
pub fn localize_key(protocol: AuthProtocol, digest1: &[u8], engine_id: &[u8]) -> Vec<u8> {
    match protocol {
        AuthProtocol::Md5 => localize_key_impl::<md5::Md5>(digest1, engine_id),
        AuthProtocol::Sha1 => localize_key_impl::<sha1::Sha1>(digest1, engine_id),
    }
}

fn localize_key_impl<D>(digest1: &[u8], engine_id: &[u8]) -> Vec<u8>
where
    D: Digest + Default,
{
    let mut hasher = D::new();
    hasher.update(digest1);
    hasher.update(engine_id);
    hasher.update(digest1);
    hasher.finalize().to_vec()
}

fn compute_hmac_md5(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::Hmac;
    type HmacMd5 = Hmac<md5::Md5>;

    let mut mac = <HmacMd5 as KeyInit>::new_from_slice(key).expect("HMAC can take key of any size");
    Mac::update(&mut mac, data);
    let result = mac.finalize().into_bytes();
    result[..AUTHENTICATOR_LEN].to_vec()
}

fn compute_hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::Hmac;
    type HmacSha1 = Hmac<sha1::Sha1>;

    let mut mac =
        <HmacSha1 as KeyInit>::new_from_slice(key).expect("HMAC can take key of any size");
    Mac::update(&mut mac, data);
    let result = mac.finalize().into_bytes();
    result[..AUTHENTICATOR_LEN].to_vec()
}

/// Verify the authentication of a captured message.
///
/// `authenticator` is the 12-byte msgAuthenticationParameters value and
/// `auth_offset` its position within `message`. The message is copied,
/// the authenticator bytes zero-filled, the truncated HMAC recomputed
/// with `key`, and the result compared in constant time.
///
/// Errors distinguish a missing authenticator, a missing key, a wrong
/// authenticator length (hard decode error, not a mismatch), and a
/// digest mismatch.
pub fn verify_message(
    key: Option<&AuthKey>,
    message: &[u8],
    authenticator: Option<&[u8]>,
    auth_offset: usize,
) -> Result<()> {
    let auth = authenticator.ok_or_else(|| Error::auth(AuthErrorKind::MissingAuthenticator))?;
    let key = key.ok_or_else(|| Error::auth(AuthErrorKind::MissingKey))?;

    if auth.len() != AUTHENTICATOR_LEN {
        return Err(Error::auth(AuthErrorKind::WrongAuthenticatorLength {
            actual: auth.len(),
        }));
    }
    if auth_offset + AUTHENTICATOR_LEN > message.len() {
        return Err(Error::auth(AuthErrorKind::MissingAuthenticator));
    }

    let mut copy = message.to_vec();
    copy[auth_offset..auth_offset + AUTHENTICATOR_LEN].fill(0);

    if key.verify_hmac(&copy, auth) {
        Ok(())
    } else {
        Err(Error::auth(AuthErrorKind::Mismatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::hex::{decode as decode_hex, encode as encode_hex};

    #[test]
    fn test_derive_digest_key_md5() {
        // Test vector from RFC 3414 Appendix A.3.1
        let key = derive_digest_key(AuthProtocol::Md5, b"maplesyrup");
        assert_eq!(key.len(), 16);
        assert_eq!(encode_hex(&key), "9faf3283884e92834ebc9847d8edd963");
    }

    #[test]
    fn test_derive_digest_key_sha1() {
        // Test vector from RFC 3414 Appendix A.3.2
        let key = derive_digest_key(AuthProtocol::Sha1, b"maplesyrup");
        assert_eq!(key.len(), 20);
        assert_eq!(encode_hex(&key), "9fb5cc0381497b3793528939ff788d5d79145211");
    }

    #[test]
    fn test_localize_key_md5() {
        // RFC 3414 A.3.1
        let engine_id = decode_hex("000000000000000000000002").unwrap();
        let key = AuthKey::from_password(AuthProtocol::Md5, b"maplesyrup", &engine_id);
        assert_eq!(
            encode_hex(key.as_bytes()),
            "526f5eed9fcce26f8964c2930787d82b"
        );
    }

    #[test]
    fn test_localize_key_sha1() {
        // RFC 3414 A.3.2
        let engine_id = decode_hex("000000000000000000000002").unwrap();
        let key = AuthKey::from_password(AuthProtocol::Sha1, b"maplesyrup", &engine_id);
        assert_eq!(
            encode_hex(key.as_bytes()),
            "6695febc9288e36282235fc7151f128497b38f3f"
        );
    }

    #[test]
    fn test_derivation_deterministic() {
        let engine_id = decode_hex("80001f888001020304").unwrap();
        let a = AuthKey::from_password(AuthProtocol::Sha1, b"correct horse", &engine_id);
        let b = AuthKey::from_password(AuthProtocol::Sha1, b"correct horse", &engine_id);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_hmac_truncated_to_12() {
        let key = AuthKey::from_bytes(AuthProtocol::Md5, vec![0x0B; 16]);
        let mac = key.compute_hmac(b"test message");
        assert_eq!(mac.len(), 12);
        assert!(key.verify_hmac(b"test message", &mac));

        let mut wrong = mac.clone();
        wrong[0] ^= 0xFF;
        assert!(!key.verify_hmac(b"test message", &wrong));
    }

    fn authenticated_message(key: &AuthKey) -> (Vec<u8>, usize) {
        // A fake message with a 12-byte authenticator at offset 10
        let auth_offset = 10;
        let mut msg = vec![0xA5u8; 40];
        msg[auth_offset..auth_offset + 12].fill(0);
        let mac = key.compute_hmac(&msg);
        msg[auth_offset..auth_offset + 12].copy_from_slice(&mac);
        (msg, auth_offset)
    }

    #[test]
    fn test_verify_message_accepts() {
        let key = AuthKey::from_bytes(AuthProtocol::Sha1, vec![0x11; 20]);
        let (msg, auth_offset) = authenticated_message(&key);
        let auth = msg[auth_offset..auth_offset + 12].to_vec();
        assert!(verify_message(Some(&key), &msg, Some(&auth), auth_offset).is_ok());
    }

    #[test]
    fn test_verify_message_rejects_flipped_authenticator_bit() {
        let key = AuthKey::from_bytes(AuthProtocol::Sha1, vec![0x11; 20]);
        let (mut msg, auth_offset) = authenticated_message(&key);
        msg[auth_offset] ^= 0x01;
        let auth = msg[auth_offset..auth_offset + 12].to_vec();
        let err = verify_message(Some(&key), &msg, Some(&auth), auth_offset).unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::Mismatch));
    }

    #[test]
    fn test_verify_message_rejects_flipped_body_bit() {
        let key = AuthKey::from_bytes(AuthProtocol::Md5, vec![0x22; 16]);
        let (mut msg, auth_offset) = authenticated_message(&key);
        msg[0] ^= 0x80; // outside the zeroed region
        let auth = msg[auth_offset..auth_offset + 12].to_vec();
        let err = verify_message(Some(&key), &msg, Some(&auth), auth_offset).unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::Mismatch));
    }

    #[test]
    fn test_verify_message_missing_authenticator() {
        let key = AuthKey::from_bytes(AuthProtocol::Md5, vec![0x22; 16]);
        let err = verify_message(Some(&key), &[0u8; 20], None, 0).unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::MissingAuthenticator));
    }

    #[test]
    fn test_verify_message_missing_key() {
        let err = verify_message(None, &[0u8; 20], Some(&[0u8; 12]), 0).unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::MissingKey));
    }

    #[test]
    fn test_verify_message_wrong_length_is_hard_error() {
        let key = AuthKey::from_bytes(AuthProtocol::Md5, vec![0x22; 16]);
        let err = verify_message(Some(&key), &[0u8; 20], Some(&[0u8; 10]), 0).unwrap_err();
        assert_eq!(
            err.auth_kind(),
            Some(AuthErrorKind::WrongAuthenticatorLength { actual: 10 })
        );
    }

    #[test]
    fn test_empty_password_all_zero_key() {
        let key = derive_digest_key(AuthProtocol::Md5, b"");
        assert_eq!(key.len(), 16);
        assert!(key.iter().all(|&b| b == 0));
    }
}
