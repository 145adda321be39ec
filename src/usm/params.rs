//! USM security parameters and the per-message context.
//!
//! USM security parameters travel as an OCTET STRING containing a
//! BER-encoded SEQUENCE:
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```
//!
//! [`UsmContext`] ties together everything one message's processing
//! needs: the raw message bytes, the decoded parameter ranges, the
//! msgFlags, the authenticator's absolute offset (verification zero-fills
//! it in a copy), and the resolved user association. Contexts are built
//! per message and discarded afterwards.

use bytes::Bytes;

use super::auth;
use super::users::{UserAssociation, UserCache};
use crate::ber::Decoder;
use crate::error::{CryptoErrorKind, DecodeErrorKind, Error, Result};

/// SNMPv3 msgFlags bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags(u8);

impl MsgFlags {
    pub const AUTH: u8 = 0x01;
    pub const CRYPT: u8 = 0x02;
    pub const REPORT: u8 = 0x04;

    /// Wrap a raw flags octet.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Message is authenticated.
    pub fn authenticated(&self) -> bool {
        self.0 & Self::AUTH != 0
    }

    /// ScopedPDU is encrypted.
    pub fn encrypted(&self) -> bool {
        self.0 & Self::CRYPT != 0
    }

    /// Sender expects a report on failure.
    pub fn reportable(&self) -> bool {
        self.0 & Self::REPORT != 0
    }

    /// The raw octet.
    pub fn as_byte(&self) -> u8 {
        self.0
    }
}

/// Decoded USM security parameters.
#[derive(Debug, Clone)]
pub struct UsmSecurityParams {
    /// Authoritative engine ID
    pub engine_id: Bytes,
    /// Engine boot count
    pub engine_boots: u32,
    /// Engine time (seconds since last boot)
    pub engine_time: u32,
    /// Username
    pub user_name: Bytes,
    /// Authentication parameters (HMAC digest, or empty)
    pub auth_params: Bytes,
    /// Privacy parameters (salt, or empty)
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Decode from the content of the msgSecurityParameters OCTET STRING.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        Self::decode_from(&mut decoder)
    }

    /// Decode from an existing decoder.
    pub fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;

        // RFC 3414: msgAuthoritativeEngineBoots INTEGER (0..2147483647)
        let raw_boots = seq.read_integer()?;
        if raw_boots < 0 {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::InvalidEngineCounter { value: raw_boots },
            ));
        }
        let engine_boots = raw_boots as u32;

        // RFC 3414: msgAuthoritativeEngineTime INTEGER (0..2147483647)
        let raw_time = seq.read_integer()?;
        if raw_time < 0 {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::InvalidEngineCounter { value: raw_time },
            ));
        }
        let engine_time = raw_time as u32;

        let user_name = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            user_name,
            auth_params,
            priv_params,
        })
    }
}

/// Locate msgAuthenticationParameters within an encoded SNMPv3 message.
///
/// Verification recomputes the HMAC over the message with the
/// authenticator zero-filled, so its absolute position is needed, not
/// just its bytes. Walks the fixed envelope shape:
///
/// ```text
/// SEQUENCE {
///   INTEGER version
///   SEQUENCE msgGlobalData { ... }
///   OCTET STRING msgSecurityParameters {
///     SEQUENCE { engineID, boots, time, username, authParams, privParams }
///   }
///   ...
/// }
/// ```
///
/// Returns `(offset, length)` of the authenticator's content octets.
pub fn find_auth_params_offset(encoded_msg: &[u8]) -> Option<(usize, usize)> {
    let mut offset = 0;

    // Outer SEQUENCE
    if *encoded_msg.get(offset)? != 0x30 {
        return None;
    }
    offset += 1;
    let (_, len_size) = parse_length(&encoded_msg[offset..])?;
    offset += len_size;

    // Version INTEGER
    if *encoded_msg.get(offset)? != 0x02 {
        return None;
    }
    offset += 1;
    let (ver_len, len_size) = parse_length(&encoded_msg[offset..])?;
    offset += len_size + ver_len;

    // msgGlobalData SEQUENCE
    if *encoded_msg.get(offset)? != 0x30 {
        return None;
    }
    offset += 1;
    let (global_len, len_size) = parse_length(&encoded_msg[offset..])?;
    offset += len_size + global_len;

    // msgSecurityParameters OCTET STRING
    if *encoded_msg.get(offset)? != 0x04 {
        return None;
    }
    offset += 1;
    let (_, len_size) = parse_length(&encoded_msg[offset..])?;
    offset += len_size;

    // USM SEQUENCE
    if *encoded_msg.get(offset)? != 0x30 {
        return None;
    }
    offset += 1;
    let (_, len_size) = parse_length(&encoded_msg[offset..])?;
    offset += len_size;

    // engineID, boots, time, username
    offset = skip_tlv(encoded_msg, offset)?;
    offset = skip_tlv(encoded_msg, offset)?;
    offset = skip_tlv(encoded_msg, offset)?;
    offset = skip_tlv(encoded_msg, offset)?;

    // authParams OCTET STRING
    if *encoded_msg.get(offset)? != 0x04 {
        return None;
    }
    offset += 1;
    let (auth_len, len_size) = parse_length(&encoded_msg[offset..])?;
    let auth_start = offset + len_size;

    if auth_start + auth_len > encoded_msg.len() {
        return None;
    }

    Some((auth_start, auth_len))
}

/// Parse a BER length, returning (length, bytes_consumed).
fn parse_length(data: &[u8]) -> Option<(usize, usize)> {
    let first = *data.first()?;
    if first < 0x80 {
        Some((first as usize, 1))
    } else if first == 0x80 {
        // Indefinite form - not supported
        None
    } else {
        let count = (first & 0x7F) as usize;
        if count > 4 || data.len() < 1 + count {
            return None;
        }

        let mut len = 0usize;
        for i in 0..count {
            len = (len << 8) | (data[1 + i] as usize);
        }
        Some((len, 1 + count))
    }
}

/// Skip a TLV, returning the new offset.
fn skip_tlv(data: &[u8], offset: usize) -> Option<usize> {
    if offset >= data.len() {
        return None;
    }

    let mut pos = offset + 1;
    if pos >= data.len() {
        return None;
    }

    let (len, len_size) = parse_length(&data[pos..])?;
    pos += len_size + len;

    if pos > data.len() {
        return None;
    }

    Some(pos)
}

/// Per-message USM processing state.
///
/// Holds read-only views into the caller's message buffer plus the
/// decoded security material. Created fresh per message, never persisted.
#[derive(Debug, Clone)]
pub struct UsmContext {
    msg: Bytes,
    /// msgFlags from msgGlobalData.
    pub flags: MsgFlags,
    /// msgSecurityModel from msgGlobalData (USM is 3).
    pub security_model: i32,
    /// Decoded USM security parameters.
    pub security_params: UsmSecurityParams,
    auth_offset: Option<usize>,
    /// Raw scopedPDU region: ciphertext when the privacy flag is set,
    /// the plaintext ScopedPDU TLV otherwise.
    scoped_pdu: Bytes,
    user: Option<UserAssociation>,
}

impl UsmContext {
    /// Parse the SNMPv3 envelope of `msg` and build a context.
    ///
    /// Reads `SEQUENCE { version, msgGlobalData, msgSecurityParameters,
    /// data }`, decodes the USM parameter block, and records the
    /// authenticator's absolute offset for later zero-fill verification.
    pub fn parse(msg: Bytes) -> Result<Self> {
        let mut dec = Decoder::new(msg.clone());
        let mut outer = dec.read_sequence()?;

        let version = outer.read_integer()?;
        if version != 3 {
            return Err(Error::decode(
                outer.offset(),
                DecodeErrorKind::UnsupportedVersion(version),
            ));
        }

        // msgGlobalData: msgID, msgMaxSize, msgFlags, msgSecurityModel
        let mut global = outer.read_sequence()?;
        let _msg_id = global.read_integer()?;
        let _msg_max_size = global.read_integer()?;
        let flags_octets = global.read_octet_string()?;
        let flags_byte = *flags_octets.first().ok_or_else(|| {
            Error::decode(global.offset(), DecodeErrorKind::TruncatedData)
        })?;
        let flags = MsgFlags::from_byte(flags_byte);
        if flags.encrypted() && !flags.authenticated() {
            return Err(Error::decode(
                global.offset(),
                DecodeErrorKind::InvalidMsgFlags,
            ));
        }
        let security_model = global.read_integer()?;

        let sec_params_octets = outer.read_octet_string()?;
        let security_params = UsmSecurityParams::decode(sec_params_octets)?;

        // The rest of the outer sequence is the msgData: an OCTET STRING
        // of ciphertext when encrypted, a plaintext ScopedPDU otherwise
        let scoped_pdu = if flags.encrypted() {
            outer.read_octet_string()?
        } else {
            let remaining = outer.remaining();
            outer.read_bytes(remaining)?
        };

        let auth_offset = find_auth_params_offset(&msg).map(|(offset, _)| offset);

        Ok(Self {
            msg,
            flags,
            security_model,
            security_params,
            auth_offset,
            scoped_pdu,
            user: None,
        })
    }

    /// The whole message buffer this context refers to.
    pub fn message(&self) -> &Bytes {
        &self.msg
    }

    /// The authoritative engine id named by the message.
    pub fn engine_id(&self) -> &[u8] {
        &self.security_params.engine_id
    }

    /// The username named by the message.
    pub fn user_name(&self) -> &[u8] {
        &self.security_params.user_name
    }

    /// Resolve this message's user through a cache and attach it.
    ///
    /// Returns false when no configured user matches.
    pub fn resolve_user(&mut self, cache: &mut UserCache) -> bool {
        match cache.resolve(self.engine_id(), self.user_name()) {
            Some(assoc) => {
                self.user = Some(assoc.clone());
                true
            }
            None => false,
        }
    }

    /// Attach an already-resolved association.
    pub fn attach_user(&mut self, user: UserAssociation) {
        self.user = Some(user);
    }

    /// The resolved association, if any.
    pub fn user(&self) -> Option<&UserAssociation> {
        self.user.as_ref()
    }

    /// The raw scopedPDU region (ciphertext when encrypted).
    pub fn scoped_pdu_bytes(&self) -> &Bytes {
        &self.scoped_pdu
    }

    /// Verify the message's authenticator.
    ///
    /// Recomputes the truncated HMAC over the message with the
    /// authenticator zero-filled and compares in constant time. The four
    /// failure modes are distinguished by [`AuthErrorKind`]:
    /// missing authenticator, missing key, wrong length, mismatch.
    ///
    /// [`AuthErrorKind`]: crate::error::AuthErrorKind
    pub fn verify_authentication(&self) -> Result<()> {
        let authenticator = if self.security_params.auth_params.is_empty() {
            None
        } else {
            Some(self.security_params.auth_params.as_ref())
        };
        auth::verify_message(
            self.user.as_ref().and_then(|u| u.auth_key()),
            &self.msg,
            authenticator,
            self.auth_offset.unwrap_or(0),
        )
    }

    /// Boolean view of [`verify_authentication`](Self::verify_authentication).
    pub fn is_authentic(&self) -> bool {
        self.verify_authentication().is_ok()
    }

    /// Decrypt the encrypted scopedPDU region.
    ///
    /// Uses the resolved user's privacy key, the message's boots/time
    /// counters, and the 8-byte salt from msgPrivacyParameters. The
    /// decrypted buffer is owned by the caller; on error the encrypted
    /// region simply stays undecrypted.
    pub fn decrypt_scoped_pdu(&self) -> Result<Bytes> {
        if !self.flags.encrypted() || self.security_params.priv_params.is_empty() {
            return Err(Error::privacy(CryptoErrorKind::MissingParameters));
        }
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| Error::privacy(CryptoErrorKind::NoKey))?;
        let key = user
            .priv_key()
            .ok_or_else(|| Error::privacy(CryptoErrorKind::NoKey))?;

        key.decrypt(
            &self.scoped_pdu,
            self.security_params.engine_boots,
            self.security_params.engine_time,
            &self.security_params.priv_params,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usm::{AuthProtocol, PrivProtocol, UsmUserConfig};

    /// Minimal BER writer for building test messages.
    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else if len <= 0xFF {
            out.push(0x81);
            out.push(len as u8);
        } else {
            out.push(0x82);
            out.push((len >> 8) as u8);
            out.push(len as u8);
        }
        out.extend_from_slice(content);
        out
    }

    fn int_tlv(value: i32) -> Vec<u8> {
        // Good enough for small non-negative test values
        if value < 0x80 {
            tlv(0x02, &[value as u8])
        } else {
            tlv(0x02, &value.to_be_bytes())
        }
    }

    fn usm_params_tlv(
        engine_id: &[u8],
        boots: i32,
        time: i32,
        user: &[u8],
        auth: &[u8],
        privp: &[u8],
    ) -> Vec<u8> {
        let mut seq = Vec::new();
        seq.extend(tlv(0x04, engine_id));
        seq.extend(int_tlv(boots));
        seq.extend(int_tlv(time));
        seq.extend(tlv(0x04, user));
        seq.extend(tlv(0x04, auth));
        seq.extend(tlv(0x04, privp));
        tlv(0x04, &tlv(0x30, &seq))
    }

    fn v3_message(flags: u8, engine_id: &[u8], user: &[u8], auth: &[u8], privp: &[u8], pdu: &[u8]) -> Vec<u8> {
        let mut global = Vec::new();
        global.extend(int_tlv(0x42)); // msgID
        global.extend(int_tlv(0x5DC)); // msgMaxSize 1500
        global.extend(tlv(0x04, &[flags]));
        global.extend(int_tlv(3)); // msgSecurityModel USM

        let mut body = Vec::new();
        body.extend(int_tlv(3)); // version
        body.extend(tlv(0x30, &global));
        body.extend(usm_params_tlv(engine_id, 7, 1234, user, auth, privp));
        body.extend_from_slice(pdu);

        tlv(0x30, &body)
    }

    const ENGINE: &[u8] = &[0x80, 0x00, 0x1F, 0x88, 0x01, 10, 0, 0, 1];

    fn plaintext_pdu() -> Vec<u8> {
        // ScopedPDU: SEQUENCE { OCTET STRING "", OCTET STRING "" } stub
        tlv(0x30, &[0x04, 0x00, 0x04, 0x00])
    }

    #[test]
    fn test_usm_params_roundtrip() {
        let raw = usm_params_tlv(ENGINE, 7, 1234, b"alice", &[0xAA; 12], &[0xBB; 8]);
        // Strip the outer OCTET STRING wrapper
        let mut dec = Decoder::from_slice(&raw);
        let inner = dec.read_octet_string().unwrap();
        let params = UsmSecurityParams::decode(inner).unwrap();

        assert_eq!(params.engine_id.as_ref(), ENGINE);
        assert_eq!(params.engine_boots, 7);
        assert_eq!(params.engine_time, 1234);
        assert_eq!(params.user_name.as_ref(), b"alice");
        assert_eq!(params.auth_params.len(), 12);
        assert_eq!(params.priv_params.len(), 8);
    }

    #[test]
    fn test_usm_params_rejects_negative_boots() {
        let mut seq = Vec::new();
        seq.extend(tlv(0x04, ENGINE));
        seq.extend(tlv(0x02, &[0xFF])); // boots = -1
        seq.extend(int_tlv(0));
        seq.extend(tlv(0x04, b"u"));
        seq.extend(tlv(0x04, &[]));
        seq.extend(tlv(0x04, &[]));
        let raw = tlv(0x30, &seq);

        let err = UsmSecurityParams::decode(Bytes::from(raw)).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::InvalidEngineCounter { value: -1 },
                ..
            }
        ));
    }

    #[test]
    fn test_parse_plaintext_context() {
        let msg = v3_message(
            MsgFlags::AUTH | MsgFlags::REPORT,
            ENGINE,
            b"alice",
            &[0u8; 12],
            &[],
            &plaintext_pdu(),
        );
        let ctx = UsmContext::parse(Bytes::from(msg)).unwrap();

        assert!(ctx.flags.authenticated());
        assert!(!ctx.flags.encrypted());
        assert!(ctx.flags.reportable());
        assert_eq!(ctx.security_model, 3);
        assert_eq!(ctx.engine_id(), ENGINE);
        assert_eq!(ctx.user_name(), b"alice");
        assert_eq!(ctx.security_params.engine_boots, 7);
        assert_eq!(ctx.scoped_pdu_bytes().as_ref(), &plaintext_pdu()[..]);
    }

    #[test]
    fn test_parse_rejects_crypt_without_auth() {
        let msg = v3_message(MsgFlags::CRYPT, ENGINE, b"alice", &[], &[0u8; 8], &tlv(0x04, b"x"));
        let err = UsmContext::parse(Bytes::from(msg)).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::InvalidMsgFlags,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let mut body = Vec::new();
        body.extend(int_tlv(1));
        let msg = tlv(0x30, &body);
        let err = UsmContext::parse(Bytes::from(msg)).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::UnsupportedVersion(1),
                ..
            }
        ));
    }

    #[test]
    fn test_find_auth_params_offset() {
        let msg = v3_message(
            MsgFlags::AUTH,
            ENGINE,
            b"alice",
            &[0xAA; 12],
            &[],
            &plaintext_pdu(),
        );
        let (offset, len) = find_auth_params_offset(&msg).unwrap();
        assert_eq!(len, 12);
        assert!(msg[offset..offset + len].iter().all(|&b| b == 0xAA));
    }

    fn cache_with(user: &str) -> UserCache {
        let mut cache = UserCache::new();
        cache.rebuild(&[UsmUserConfig::new(
            user.as_bytes(),
            AuthProtocol::Md5,
            b"authpassword".as_slice(),
            PrivProtocol::Aes,
            b"privpassword".as_slice(),
        )]);
        cache
    }

    #[test]
    fn test_end_to_end_verify_authentication() {
        // Build an authenticated message: placeholder zeros, compute the
        // real HMAC, splice it into both the wire bytes and params
        let placeholder = [0u8; 12];
        let mut msg = v3_message(
            MsgFlags::AUTH,
            ENGINE,
            b"alice",
            &placeholder,
            &[],
            &plaintext_pdu(),
        );

        let mut cache = cache_with("alice");
        let key = cache
            .resolve(ENGINE, b"alice")
            .unwrap()
            .auth_key()
            .unwrap()
            .clone();

        let mac = key.compute_hmac(&msg);
        let (auth_offset, auth_len) = find_auth_params_offset(&msg).unwrap();
        assert_eq!(auth_len, 12);
        msg[auth_offset..auth_offset + 12].copy_from_slice(&mac);

        let mut ctx = UsmContext::parse(Bytes::from(msg.clone())).unwrap();
        assert!(ctx.resolve_user(&mut cache));
        assert!(ctx.is_authentic());

        // Flip one bit anywhere outside the authenticator: reject
        let mut tampered = msg.clone();
        *tampered.last_mut().unwrap() ^= 0x01;
        let mut ctx = UsmContext::parse(Bytes::from(tampered)).unwrap();
        ctx.resolve_user(&mut cache);
        assert!(!ctx.is_authentic());
    }

    #[test]
    fn test_end_to_end_decrypt() {
        let mut cache = cache_with("alice");
        let assoc = cache.resolve(ENGINE, b"alice").unwrap().clone();

        let scoped = plaintext_pdu();
        let salt = [0x5Au8; 8];
        let ciphertext = assoc
            .priv_key()
            .unwrap()
            .encrypt(&scoped, 7, 1234, &salt)
            .unwrap();

        let msg = v3_message(
            MsgFlags::AUTH | MsgFlags::CRYPT,
            ENGINE,
            b"alice",
            &[0u8; 12],
            &salt,
            &tlv(0x04, &ciphertext),
        );

        let mut ctx = UsmContext::parse(Bytes::from(msg)).unwrap();
        assert!(ctx.flags.encrypted());
        assert!(ctx.resolve_user(&mut cache));

        let cleartext = ctx.decrypt_scoped_pdu().unwrap();
        assert_eq!(cleartext.as_ref(), &scoped[..]);
        assert!(crate::usm::looks_like_scoped_pdu(&cleartext));
    }

    #[test]
    fn test_decrypt_without_user_is_no_key() {
        let msg = v3_message(
            MsgFlags::AUTH | MsgFlags::CRYPT,
            ENGINE,
            b"alice",
            &[0u8; 12],
            &[0x5A; 8],
            &tlv(0x04, &[0u8; 16]),
        );
        let ctx = UsmContext::parse(Bytes::from(msg)).unwrap();
        let err = ctx.decrypt_scoped_pdu().unwrap_err();
        assert!(matches!(
            err,
            Error::Privacy {
                kind: CryptoErrorKind::NoKey
            }
        ));
    }

    #[test]
    fn test_decrypt_plaintext_message_is_missing_parameters() {
        let msg = v3_message(MsgFlags::AUTH, ENGINE, b"alice", &[0u8; 12], &[], &plaintext_pdu());
        let mut ctx = UsmContext::parse(Bytes::from(msg)).unwrap();
        let mut cache = cache_with("alice");
        ctx.resolve_user(&mut cache);
        let err = ctx.decrypt_scoped_pdu().unwrap_err();
        assert!(matches!(
            err,
            Error::Privacy {
                kind: CryptoErrorKind::MissingParameters
            }
        ));
    }

    #[test]
    fn test_verify_without_authenticator() {
        let msg = v3_message(0, ENGINE, b"alice", &[], &[], &plaintext_pdu());
        let mut ctx = UsmContext::parse(Bytes::from(msg)).unwrap();
        let mut cache = cache_with("alice");
        ctx.resolve_user(&mut cache);
        let err = ctx.verify_authentication().unwrap_err();
        assert_eq!(
            err.auth_kind(),
            Some(crate::error::AuthErrorKind::MissingAuthenticator)
        );
    }
}
