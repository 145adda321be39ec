//! SnmpEngineID structural decoding.
//!
//! Engine IDs follow either the historic RFC 1910 AgentID layout or the
//! RFC 3411 SnmpEngineID TC, selected by the high bit of the first octet.
//! Decoding never hard-fails: bytes that do not conform to the selected
//! layout are reported in [`EngineId::trailing`] and consumed, so the
//! caller always ends up past the field.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;

use crate::format::hex;

/// RFC 3411 format selectors.
pub const FORMAT_IPV4: u8 = 0x01;
pub const FORMAT_IPV6: u8 = 0x02;
pub const FORMAT_MAC: u8 = 0x03;
pub const FORMAT_TEXT: u8 = 0x04;
pub const FORMAT_OCTETS: u8 = 0x05;
/// Most common enterprise-specific format: (ucd|net)-snmp random.
pub const FORMAT_ENTERPRISE_RANDOM: u8 = 128;

/// Maximum body length for text/octet formats (engine id totals 5..32 bytes).
const MAX_VAR_BODY: usize = 27;

/// Conformance of an engine id (high bit of the first octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conformance {
    /// RFC 1910 (non-SNMPv3) AgentID.
    Rfc1910,
    /// RFC 3411 SnmpEngineID.
    Rfc3411,
}

/// The decoded body of an engine id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineIdBody {
    /// RFC 1910: the fixed 8-byte trailer after the enterprise id.
    LegacyTrailer(Bytes),
    /// RFC 3411 format 1: IPv4 address.
    Ipv4(Ipv4Addr),
    /// RFC 3411 format 2: IPv6 address.
    Ipv6(Ipv6Addr),
    /// RFC 3411 format 3: MAC address.
    Mac([u8; 6]),
    /// RFC 3411 format 4: administratively assigned text.
    Text(String),
    /// Format 128 for enterprises 2021/8072: 4 random bytes plus
    /// little-endian creation time in epoch seconds.
    EnterpriseRandom { random: [u8; 4], created_secs: u32 },
    /// RFC 3411 format 5 or unknown formats: administratively assigned octets.
    Octets(Bytes),
    /// Nothing recognized; all remaining bytes are in `trailing`.
    Unrecognized,
}

/// A structurally decoded SnmpEngineID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineId {
    pub conformance: Conformance,
    /// Enterprise id from bytes 0-3 (high bit masked off for RFC 3411).
    pub enterprise: u32,
    /// RFC 3411 format selector byte, when present.
    pub format: Option<u8>,
    pub body: EngineIdBody,
    /// Bytes not conforming to the selected layout (consumed, reported).
    pub trailing: Bytes,
}

impl EngineId {
    /// True when every byte matched the selected layout.
    pub fn is_conforming(&self) -> bool {
        self.trailing.is_empty()
    }
}

/// Decode an engine id.
///
/// Returns `None` for inputs shorter than 4 bytes (nothing decodable).
/// Otherwise all input bytes are consumed; non-conforming remainders are
/// reported via [`EngineId::trailing`].
pub fn decode_engine_id(data: &[u8]) -> Option<EngineId> {
    if data.len() < 4 {
        return None;
    }

    let conformance = if data[0] & 0x80 != 0 {
        Conformance::Rfc3411
    } else {
        Conformance::Rfc1910
    };

    let mut enterprise = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    if conformance == Conformance::Rfc3411 {
        enterprise &= 0x7FFF_FFFF;
    }

    let rest = &data[4..];

    let (format, body, consumed) = match conformance {
        Conformance::Rfc1910 => {
            // 12-byte AgentID: enterprise id plus an 8-byte trailer
            if rest.len() == 8 {
                (
                    None,
                    EngineIdBody::LegacyTrailer(Bytes::copy_from_slice(rest)),
                    8,
                )
            } else {
                (None, EngineIdBody::Unrecognized, 0)
            }
        }
        Conformance::Rfc3411 => {
            if rest.is_empty() {
                (None, EngineIdBody::Unrecognized, 0)
            } else {
                let format = rest[0];
                let body_bytes = &rest[1..];
                let (body, body_consumed) = decode_rfc3411_body(format, enterprise, body_bytes);
                (Some(format), body, 1 + body_consumed)
            }
        }
    };

    let trailing = Bytes::copy_from_slice(&rest[consumed..]);

    Some(EngineId {
        conformance,
        enterprise,
        format,
        body,
        trailing,
    })
}

fn decode_rfc3411_body(format: u8, enterprise: u32, body: &[u8]) -> (EngineIdBody, usize) {
    // A recognized format whose body has the wrong size decodes nothing;
    // the remainder is reported as non-conforming trailing data.
    match format {
        FORMAT_IPV4 => {
            if body.len() == 4 {
                let addr = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
                (EngineIdBody::Ipv4(addr), 4)
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
        FORMAT_IPV6 => {
            if body.len() == 16 {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(body);
                (EngineIdBody::Ipv6(Ipv6Addr::from(octets)), 16)
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
        FORMAT_MAC => {
            if body.len() == 6 {
                let mut mac = [0u8; 6];
                mac.copy_from_slice(body);
                (EngineIdBody::Mac(mac), 6)
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
        FORMAT_TEXT => {
            if body.len() <= MAX_VAR_BODY {
                (
                    EngineIdBody::Text(String::from_utf8_lossy(body).into_owned()),
                    body.len(),
                )
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
        FORMAT_ENTERPRISE_RANDOM => {
            if (enterprise == 2021 || enterprise == 8072) && body.len() == 8 {
                let mut random = [0u8; 4];
                random.copy_from_slice(&body[..4]);
                let created_secs = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                (
                    EngineIdBody::EnterpriseRandom {
                        random,
                        created_secs,
                    },
                    8,
                )
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
        // FORMAT_OCTETS and reserved/enterprise-specific formats
        _ => {
            if body.len() <= MAX_VAR_BODY {
                (EngineIdBody::Octets(Bytes::copy_from_slice(body)), body.len())
            } else {
                (EngineIdBody::Unrecognized, 0)
            }
        }
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.conformance {
            Conformance::Rfc1910 => write!(f, "RFC1910 enterprise {}", self.enterprise)?,
            Conformance::Rfc3411 => write!(f, "RFC3411 enterprise {}", self.enterprise)?,
        }
        match &self.body {
            EngineIdBody::LegacyTrailer(t) => {
                write!(f, ", AgentID trailer: 0x{}", hex::encode(t))?;
            }
            EngineIdBody::Ipv4(addr) => write!(f, ", IPv4 address: {}", addr)?,
            EngineIdBody::Ipv6(addr) => write!(f, ", IPv6 address: {}", addr)?,
            EngineIdBody::Mac(mac) => {
                write!(
                    f,
                    ", MAC address: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                    mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
                )?;
            }
            EngineIdBody::Text(text) => write!(f, ", text: {}", text)?,
            EngineIdBody::EnterpriseRandom {
                random,
                created_secs,
            } => {
                let name = if self.enterprise == 2021 {
                    "UCD-SNMP Random"
                } else {
                    "Net-SNMP Random"
                };
                write!(f, ", {}: 0x{}", name, hex::encode(random))?;
                match chrono::DateTime::from_timestamp(i64::from(*created_secs), 0) {
                    Some(ts) => write!(f, ", created {}", ts.format("%Y-%m-%d %H:%M:%S UTC"))?,
                    None => write!(f, ", created {} (epoch seconds)", created_secs)?,
                }
            }
            EngineIdBody::Octets(data) => write!(f, ", data: 0x{}", hex::encode(data))?,
            EngineIdBody::Unrecognized => {}
        }
        if !self.trailing.is_empty() {
            write!(f, ", non-conforming data: 0x{}", hex::encode(&self.trailing))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_is_none() {
        assert!(decode_engine_id(&[]).is_none());
        assert!(decode_engine_id(&[0x80, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_legacy_agent_id() {
        // Conformance 0, enterprise 9, 8-byte trailer: 12 bytes total
        let data = [
            0x00, 0x00, 0x00, 0x09, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
        ];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.conformance, Conformance::Rfc1910);
        assert_eq!(id.enterprise, 9);
        assert!(matches!(id.body, EngineIdBody::LegacyTrailer(_)));
        assert!(id.is_conforming());
    }

    #[test]
    fn test_legacy_wrong_trailer_reported() {
        let data = [0x00, 0x00, 0x00, 0x09, 0x01, 0x02];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Unrecognized);
        assert_eq!(id.trailing.as_ref(), &[0x01, 0x02]);
        assert!(!id.is_conforming());
    }

    #[test]
    fn test_rfc3411_ipv4() {
        // Conformance 1, enterprise 8072, format 1, 4-byte address: 9 bytes
        let data = [0x80, 0x00, 0x1F, 0x88, 0x01, 192, 168, 1, 10];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.conformance, Conformance::Rfc3411);
        assert_eq!(id.enterprise, 8072);
        assert_eq!(id.format, Some(FORMAT_IPV4));
        assert_eq!(id.body, EngineIdBody::Ipv4(Ipv4Addr::new(192, 168, 1, 10)));
        assert!(id.is_conforming());
    }

    #[test]
    fn test_rfc3411_mac() {
        let data = [
            0x80, 0x00, 0x1F, 0x88, 0x03, 0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E,
        ];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Mac([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]));
    }

    #[test]
    fn test_rfc3411_text() {
        let mut data = vec![0x80, 0x00, 0x1F, 0x88, 0x04];
        data.extend_from_slice(b"router-7");
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Text("router-7".to_string()));
    }

    #[test]
    fn test_net_snmp_random() {
        // Enterprise 8072, format 128, 4 random bytes + LE epoch seconds
        let data = [
            0x80, 0x00, 0x1F, 0x88, 0x80, 0xDE, 0xAD, 0xBE, 0xEF, 0x40, 0xE2, 0x01, 0x00,
        ];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(
            id.body,
            EngineIdBody::EnterpriseRandom {
                random: [0xDE, 0xAD, 0xBE, 0xEF],
                created_secs: 0x0001E240, // 123456
            }
        );
        assert!(id.is_conforming());
    }

    #[test]
    fn test_format_128_other_enterprise_reported_as_trailing() {
        // Enterprise 9 with format 128 has no random/time interpretation
        let data = [0x80, 0x00, 0x00, 0x09, 0x80, 0x01, 0x02, 0x03];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Unrecognized);
        assert_eq!(id.trailing.as_ref(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_rfc3411_wrong_ipv4_length_reported() {
        // Format says IPv4 but only 2 body bytes remain
        let data = [0x80, 0x00, 0x1F, 0x88, 0x01, 192, 168];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Unrecognized);
        assert_eq!(id.trailing.as_ref(), &[192, 168]);
        assert!(!id.is_conforming());
    }

    #[test]
    fn test_rfc3411_octets_format() {
        let data = [0x80, 0x00, 0x1F, 0x88, 0x05, 0x01, 0x02, 0x03];
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(
            id.body,
            EngineIdBody::Octets(Bytes::from_static(&[0x01, 0x02, 0x03]))
        );
        assert!(id.is_conforming());
    }

    #[test]
    fn test_oversize_body_reported_as_trailing() {
        let mut data = vec![0x80, 0x00, 0x1F, 0x88, 0x05];
        data.extend_from_slice(&[0xAB; 40]);
        let id = decode_engine_id(&data).unwrap();
        assert_eq!(id.body, EngineIdBody::Unrecognized);
        assert_eq!(id.trailing.len(), 40);
    }

    #[test]
    fn test_display_net_snmp() {
        let data = [
            0x80, 0x00, 0x1F, 0x88, 0x80, 0xDE, 0xAD, 0xBE, 0xEF, 0x40, 0xE2, 0x01, 0x00,
        ];
        let id = decode_engine_id(&data).unwrap();
        let text = id.to_string();
        assert!(text.contains("Net-SNMP Random"));
        assert!(text.contains("1970-01-02")); // 123456 s into the epoch
    }
}
