//! Decoded SNMP value types.
//!
//! The `Value` enum represents everything a VarBind value can decode to,
//! including the three SNMPv2 exception kinds and a raw fallback for
//! unrecognized class/tag pairs.

use bytes::Bytes;

use crate::ber::{tag, Class, Decoder};
use crate::error::Result;
use crate::format::hex;
use crate::oid::Oid;

/// A decoded SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (ASN.1 primitive, signed 32-bit)
    Integer32(i32),

    /// OCTET STRING (arbitrary bytes)
    OctetString(Bytes),

    /// NULL
    Null,

    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),

    /// IpAddress, 4-byte form
    IpV4([u8; 4]),

    /// IpAddress, 16-byte form
    IpV6([u8; 16]),

    /// IpAddress of any other length (kept raw)
    AnyAddress(Bytes),

    /// Counter32 (unsigned 32-bit, wrapping)
    Counter32(u32),

    /// Gauge32 (unsigned 32-bit, non-wrapping)
    Gauge32(u32),

    /// Unsigned32 / UInteger32
    Unsigned32(u32),

    /// TimeTicks (hundredths of seconds)
    TimeTicks(u32),

    /// Opaque (legacy, arbitrary bytes)
    Opaque(Bytes),

    /// NsapAddress (historic, kept raw)
    NsapAddress(Bytes),

    /// Counter64 (unsigned 64-bit, wrapping)
    Counter64(u64),

    /// noSuchObject exception - the OID exists but has no value here.
    NoSuchObject,

    /// noSuchInstance exception - the specific instance does not exist.
    NoSuchInstance,

    /// endOfMibView exception - end of the MIB has been reached.
    EndOfMibView,

    /// Unrecognized class/tag pair, preserved raw.
    Unknown { class: Class, tag: u32, data: Bytes },
}

impl Value {
    /// Decode the value payload for an already-validated class/tag/length.
    ///
    /// The caller (the VarBind decoder) has enforced the length contracts;
    /// this reads `len` content bytes from `dec` and produces the typed
    /// value for the `(class, tag)` pair.
    pub(crate) fn decode_payload(
        class: Class,
        tag_num: u32,
        len: usize,
        dec: &mut Decoder,
    ) -> Result<Value> {
        use tag::{application, context, universal};

        let value = match class {
            Class::Universal => match tag_num {
                universal::INTEGER => Value::Integer32(dec.read_integer_value(len)?),
                universal::OCTET_STRING => Value::OctetString(dec.read_bytes(len)?),
                universal::NULL => {
                    // Length already checked to be zero
                    Value::Null
                }
                universal::OBJECT_IDENTIFIER => {
                    Value::ObjectIdentifier(dec.read_oid_value(len)?)
                }
                other => Value::Unknown {
                    class,
                    tag: other,
                    data: dec.read_bytes(len)?,
                },
            },
            Class::Application => match tag_num {
                application::IP_ADDRESS => match len {
                    4 => {
                        let b = dec.read_bytes(4)?;
                        Value::IpV4([b[0], b[1], b[2], b[3]])
                    }
                    16 => {
                        let b = dec.read_bytes(16)?;
                        let mut addr = [0u8; 16];
                        addr.copy_from_slice(&b);
                        Value::IpV6(addr)
                    }
                    _ => Value::AnyAddress(dec.read_bytes(len)?),
                },
                application::COUNTER32 => Value::Counter32(dec.read_unsigned32_value(len)?),
                application::GAUGE32 => Value::Gauge32(dec.read_unsigned32_value(len)?),
                application::TIMETICKS => Value::TimeTicks(dec.read_unsigned32_value(len)?),
                application::OPAQUE => Value::Opaque(dec.read_bytes(len)?),
                application::NSAP_ADDRESS => Value::NsapAddress(dec.read_bytes(len)?),
                application::COUNTER64 => Value::Counter64(dec.read_unsigned64_value(len)?),
                application::UNSIGNED32 => Value::Unsigned32(dec.read_unsigned32_value(len)?),
                other => Value::Unknown {
                    class,
                    tag: other,
                    data: dec.read_bytes(len)?,
                },
            },
            Class::Context => match tag_num {
                context::NO_SUCH_OBJECT => Value::NoSuchObject,
                context::NO_SUCH_INSTANCE => Value::NoSuchInstance,
                context::END_OF_MIB_VIEW => Value::EndOfMibView,
                other => Value::Unknown {
                    class,
                    tag: other,
                    data: dec.read_bytes(len)?,
                },
            },
            Class::Private => Value::Unknown {
                class,
                tag: tag_num,
                data: dec.read_bytes(len)?,
            },
        };

        Ok(value)
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::Unsigned32(v) | Value::TimeTicks(v) => {
                Some(*v)
            }
            Value::Integer32(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    /// Try to get as u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            _ => self.as_u32().map(u64::from),
        }
    }

    /// Try to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v)
            | Value::Opaque(v)
            | Value::NsapAddress(v)
            | Value::AnyAddress(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as string (UTF-8).
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Try to get as OID.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Check if this is an exception value.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer32(v) => write!(f, "{}", v),
            Value::OctetString(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "0x{}", hex::encode(data))
                }
            }
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpV4(addr) => {
                write!(f, "{}", std::net::Ipv4Addr::from(*addr))
            }
            Value::IpV6(addr) => {
                write!(f, "{}", std::net::Ipv6Addr::from(*addr))
            }
            Value::AnyAddress(data) => write!(f, "0x{}", hex::encode(data)),
            Value::Counter32(v) => write!(f, "{}", v),
            Value::Gauge32(v) => write!(f, "{}", v),
            Value::Unsigned32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => {
                let secs = v / 100;
                let days = secs / 86400;
                let hours = (secs % 86400) / 3600;
                let mins = (secs % 3600) / 60;
                let s = secs % 60;
                write!(f, "{}d {}h {}m {}s", days, hours, mins, s)
            }
            Value::Opaque(data) => write!(f, "Opaque(0x{})", hex::encode(data)),
            Value::NsapAddress(data) => write!(f, "NSAP(0x{})", hex::encode(data)),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { class, tag, data } => {
                write!(
                    f,
                    "Unknown({:?} tag={}, data=0x{})",
                    class,
                    tag,
                    hex::encode(data)
                )
            }
        }
    }
}
