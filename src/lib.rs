//! # snmp-dissect
//!
//! Passive SNMPv3 analysis for capture data.
//!
//! This crate implements the decode side of the User-based Security
//! Model (RFC 3414) together with a registry-driven VarBind value
//! decoder and a SnmpEngineID structural decoder:
//!
//! - Password-to-key derivation and engine-scoped key localization,
//!   memoized per engine in a [`UserCache`]
//! - Truncated-HMAC (MD5/SHA-1) message authentication verification
//! - DES-CBC and AES-128-CFB scopedPDU decryption
//! - Strict class/tag/length VarBind decoding with raw-byte fallback -
//!   malformed input degrades, it never aborts the surrounding parse
//!
//! ## Quick Start
//!
//! ```
//! use bytes::Bytes;
//! use snmp_dissect::{StaticRegistry, decode_varbind};
//!
//! // SEQUENCE { OID 1.3.6.1.2.1.1.7.0, INTEGER 72 }
//! let wire = Bytes::from_static(&[
//!     0x30, 0x0D, 0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01,
//!     0x07, 0x00, 0x02, 0x01, 0x48,
//! ]);
//!
//! let registry = StaticRegistry::new();
//! let outcome = decode_varbind(&wire, 0, &registry);
//! let vb = outcome.result.unwrap();
//! assert_eq!(vb.value.as_i32(), Some(72));
//! assert_eq!(outcome.next_offset, wire.len());
//! ```
//!
//! ## Verifying and decrypting a captured message
//!
//! ```no_run
//! use bytes::Bytes;
//! use snmp_dissect::usm::{AuthProtocol, PrivProtocol, UsmContext, UsmUserConfig};
//! use snmp_dissect::UserCache;
//!
//! # fn example(capture: Bytes) -> snmp_dissect::Result<()> {
//! let mut cache = UserCache::new();
//! cache.rebuild(&[UsmUserConfig::new(
//!     b"operator".as_slice(),
//!     AuthProtocol::Sha1,
//!     b"authpassword".as_slice(),
//!     PrivProtocol::Aes,
//!     b"privpassword".as_slice(),
//! )]);
//!
//! let mut ctx = UsmContext::parse(capture)?;
//! ctx.resolve_user(&mut cache);
//! ctx.verify_authentication()?;
//! let cleartext = ctx.decrypt_scoped_pdu()?;
//! # let _ = cleartext;
//! # Ok(())
//! # }
//! ```

pub mod ber;
pub mod engine_id;
pub mod error;
pub mod format;
pub mod oid;
pub mod registry;
pub mod usm;
pub mod value;
pub mod varbind;

// Re-exports for convenience
pub use ber::{Class, Decoder, Identifier};
pub use engine_id::{decode_engine_id, Conformance, EngineId, EngineIdBody};
pub use error::{
    AuthErrorKind, ConfigIssue, CryptoErrorKind, DecodeErrorKind, Error, Result, VarBindErrorKind,
};
pub use oid::Oid;
pub use registry::{Resolution, StaticRegistry, TypeRegistry, ValueTypeDescriptor};
pub use usm::{
    AuthKey, AuthProtocol, PrivKey, PrivProtocol, UserAssociation, UserCache, UsmContext,
    UsmUserConfig,
};
pub use value::Value;
pub use varbind::{decode_varbind, decode_varbind_list, DecodedVarBind, VarBindFault, VarBindOutcome};
