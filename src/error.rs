//! Error types for snmp-dissect.
//!
//! Three channels, matching how failures propagate:
//!
//! - [`Error`] - hard errors from BER reads and USM operations
//! - [`VarBindErrorKind`] - recoverable structural faults, carried inside
//!   a decode outcome together with a raw fallback of the offending range
//! - [`ConfigIssue`] - advisory findings on credential rows; rows load anyway
//!
//! Nothing here is fatal to an analysis session: every decoder returns an
//! offset advance alongside its result so callers can resynchronize.

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error kinds (RFC 3414 Section 3.2 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Message carries no authentication parameters.
    MissingAuthenticator,
    /// No authentication key available (user not resolved or key absent).
    MissingKey,
    /// Authenticator must be exactly 12 bytes (HMAC-96).
    WrongAuthenticatorLength { actual: usize },
    /// Recomputed digest does not match the authenticator.
    Mismatch,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAuthenticator => write!(f, "no authenticator in message"),
            Self::MissingKey => write!(f, "user has no authentication key"),
            Self::WrongAuthenticatorLength { actual } => {
                write!(f, "authenticator length wrong: expected 12, got {}", actual)
            }
            Self::Mismatch => write!(f, "authenticator does not match computed digest"),
        }
    }
}

/// Privacy (decryption) error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoErrorKind {
    /// Message carries no privacy parameters.
    MissingParameters,
    /// No privacy key available (user not resolved or key absent).
    NoKey,
    /// Privacy parameters (salt) must be exactly 8 bytes.
    WrongSaltLength { actual: usize },
    /// Ciphertext length invalid for the cipher (DES: positive multiple of 8).
    BadCiphertextLength { length: usize, block_size: usize },
    /// Localized privacy key is too short for the cipher.
    InsufficientKeyMaterial { needed: usize, actual: usize },
    /// Underlying cipher primitive unavailable; decryption unsupported.
    CipherUnavailable,
    /// Cipher operation failed.
    CipherFailure(String),
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParameters => write!(f, "no privacy parameters in message"),
            Self::NoKey => write!(f, "user has no privacy key"),
            Self::WrongSaltLength { actual } => {
                write!(f, "privacy parameters length != 8: got {}", actual)
            }
            Self::BadCiphertextLength { length, block_size } => {
                write!(
                    f,
                    "ciphertext length {} not a positive multiple of {}",
                    length, block_size
                )
            }
            Self::InsufficientKeyMaterial { needed, actual } => {
                write!(f, "privacy key too short: need {}, have {}", needed, actual)
            }
            Self::CipherUnavailable => write!(f, "cipher primitive unavailable, cannot decrypt"),
            Self::CipherFailure(msg) => write!(f, "cipher operation failed: {}", msg),
        }
    }
}

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Length field uses too many octets.
    LengthTooLong { octets: usize },
    /// Length exceeds the decoder's sanity cap.
    LengthExceedsMax { length: usize, max: usize },
    /// Expected a different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Integer64 too long.
    Integer64TooLong { length: usize },
    /// Invalid OID encoding.
    InvalidOidEncoding,
    /// NULL with non-zero length.
    InvalidNull,
    /// Not enough bytes for the requested read.
    InsufficientData { needed: usize, available: usize },
    /// msgFlags has the privacy bit set without the auth bit (RFC 3412).
    InvalidMsgFlags,
    /// Engine boots/time outside INTEGER (0..2147483647).
    InvalidEngineCounter { value: i32 },
    /// Message version is not SNMPv3.
    UnsupportedVersion(i32),
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::Integer64TooLong { length } => {
                write!(f, "integer64 too long: {} bytes", length)
            }
            Self::InvalidOidEncoding => write!(f, "invalid OID encoding"),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InsufficientData { needed, available } => {
                write!(f, "need {} bytes but only {} remaining", needed, available)
            }
            Self::InvalidMsgFlags => write!(f, "invalid msgFlags: privacy without authentication"),
            Self::InvalidEngineCounter { value } => {
                write!(f, "engine boots/time out of range: {}", value)
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported SNMP version: {}", v),
        }
    }
}

/// Structural faults in VarBind decoding.
///
/// These are always recoverable: the decoder reports the fault together
/// with a raw decode of the offending range and still yields a next offset,
/// so the surrounding parse continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarBindErrorKind {
    /// VarBind is not a universal-class constructed SEQUENCE.
    NotASequence,
    /// Indefinite-length encoding where definite is required.
    IndefiniteLength,
    /// ObjectName is not a primitive universal-class OID.
    ObjectNameNotOid,
    /// Value uses constructed encoding.
    ValueNotPrimitive,
    /// Value class/tag differs from the registered descriptor.
    ClassTagMismatch,
    /// Value length outside the allowed bounds.
    LengthOutOfBounds { length: usize, min: usize, max: usize },
    /// Context-class value with a tag other than 0, 1, or 2.
    WrongExceptionTag { tag: u32 },
    /// Ran out of bytes inside the VarBind.
    Truncated,
}

impl std::fmt::Display for VarBindErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotASequence => write!(f, "VarBind must be an universal class sequence"),
            Self::IndefiniteLength => write!(f, "indicator must be clear in VarBind"),
            Self::ObjectNameNotOid => {
                write!(f, "ObjectName must be an OID in primitive encoding")
            }
            Self::ValueNotPrimitive => write!(f, "value must be in primitive encoding"),
            Self::ClassTagMismatch => write!(f, "wrong class/tag for value"),
            Self::LengthOutOfBounds { length, min, max } => {
                write!(
                    f,
                    "wrong value length: {} expecting: {} <= len <= {}",
                    length, min, max
                )
            }
            Self::WrongExceptionTag { tag } => {
                write!(f, "wrong tag for error value: expected [0,1,2] got: {}", tag)
            }
            Self::Truncated => write!(f, "VarBind truncated"),
        }
    }
}

/// Advisory findings on a credential configuration row.
///
/// Rows that produce issues still load; these mirror the checks an
/// operator-facing table performs before accepting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssue {
    /// Row has an empty userName.
    EmptyUserName,
    /// Authentication password shorter than the recommended 8 bytes.
    ShortAuthPassword { len: usize },
    /// Privacy password shorter than the recommended 8 bytes.
    ShortPrivPassword { len: usize },
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserName => write!(f, "no userName"),
            Self::ShortAuthPassword { len } => write!(f, "short authPassword ({})", len),
            Self::ShortPrivPassword { len } => write!(f, "short privPassword ({})", len),
        }
    }
}

/// The main error type for snmp-dissect operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// BER decoding failed.
    #[error("decode error at offset {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeErrorKind },

    /// Message authentication could not be verified.
    #[error("authentication error: {kind}")]
    Authentication { kind: AuthErrorKind },

    /// ScopedPDU decryption failed; the encrypted region stays undecrypted.
    #[error("decryption error: {kind}")]
    Privacy { kind: CryptoErrorKind },
}

impl Error {
    pub(crate) fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    pub(crate) fn auth(kind: AuthErrorKind) -> Self {
        Self::Authentication { kind }
    }

    pub(crate) fn privacy(kind: CryptoErrorKind) -> Self {
        Self::Privacy { kind }
    }

    /// The authentication error kind, if this is an authentication error.
    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Authentication { kind } => Some(*kind),
            _ => None,
        }
    }
}
