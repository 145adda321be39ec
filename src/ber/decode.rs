//! BER decoding.
//!
//! Zero-copy decoding using `Bytes` to avoid allocations.

use bytes::Bytes;

use super::length::decode_length;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// BER identifier octet class (X.690 Section 8.1.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Universal (00)
    Universal,
    /// Application (01)
    Application,
    /// Context-specific (10)
    Context,
    /// Private (11)
    Private,
}

/// A decoded BER identifier: class, primitive/constructed bit, tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub class: Class,
    pub constructed: bool,
    pub tag: u32,
}

impl Identifier {
    /// True for a primitive universal-class identifier with the given tag.
    pub fn is_universal_primitive(&self, tag: u32) -> bool {
        self.class == Class::Universal && !self.constructed && self.tag == tag
    }
}

/// BER decoder that reads from a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a decoder positioned at `offset` within `data`.
    pub fn at(data: Bytes, offset: usize) -> Self {
        Self { data, offset }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Get the current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Read a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.offset >= self.data.len() {
            tracing::debug!(target: "snmp_dissect::ber", offset = self.offset, "truncated data: unexpected end of input");
            return Err(Error::decode(self.offset, DecodeErrorKind::TruncatedData));
        }
        let byte = self.data[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    /// Read an identifier octet, following long-form tag numbers.
    pub fn read_identifier(&mut self) -> Result<Identifier> {
        let first = self.read_byte()?;
        let class = match first >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::Context,
            _ => Class::Private,
        };
        let constructed = first & 0x20 != 0;
        let mut tag = (first & 0x1F) as u32;

        if tag == 0x1F {
            // Long-form tag: base-128 continuation octets, high bit set
            // on all but the last. Capped at 4 octets.
            tag = 0;
            for count in 0.. {
                if count == 4 {
                    return Err(Error::decode(
                        self.offset,
                        DecodeErrorKind::InvalidLength,
                    ));
                }
                let byte = self.read_byte()?;
                tag = (tag << 7) | (byte & 0x7F) as u32;
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok(Identifier {
            class,
            constructed,
            tag,
        })
    }

    /// Read a definite length.
    pub fn read_length(&mut self) -> Result<usize> {
        let (len, consumed) = decode_length(&self.data[self.offset..], self.offset)?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        // saturating_add so a hostile length cannot wrap past the bounds check
        if self.offset.saturating_add(len) > self.data.len() {
            tracing::debug!(target: "snmp_dissect::ber", offset = self.offset, needed = len, available = self.remaining(), "insufficient data");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::InsufficientData {
                    needed: len,
                    available: self.remaining(),
                },
            ));
        }
        let bytes = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }

    /// Read and expect a specific single-octet tag, returning the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let at = self.offset;
        let actual = self.read_byte()?;
        if actual != expected {
            tracing::debug!(target: "snmp_dissect::ber", offset = at, expected, actual, "unexpected tag");
            return Err(Error::decode(
                at,
                DecodeErrorKind::UnexpectedTag { expected, actual },
            ));
        }
        self.read_length()
    }

    /// Read a BER INTEGER (signed 32-bit).
    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(0x02)?;
        self.read_integer_value(len)
    }

    /// Read a signed integer value given the length.
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            return Err(Error::decode(self.offset, DecodeErrorKind::ZeroLengthInteger));
        }
        if len > 4 {
            // Permissive: truncate with warning (matches net-snmp)
            tracing::warn!(target: "snmp_dissect::ber", offset = self.offset, length = len, "integer too long, truncating to 4 bytes");
        }

        let bytes = self.read_bytes(len)?;

        // Sign extend
        let is_negative = bytes[0] & 0x80 != 0;
        let mut value: i32 = if is_negative { -1 } else { 0 };

        for &byte in bytes.iter().take(4) {
            value = (value << 8) | (byte as i32);
        }

        Ok(value)
    }

    /// Read an unsigned 32-bit integer value given the length.
    pub fn read_unsigned32_value(&mut self, len: usize) -> Result<u32> {
        if len == 0 {
            return Err(Error::decode(self.offset, DecodeErrorKind::ZeroLengthInteger));
        }
        if len > 5 {
            // 5 bytes max: 1 leading zero + 4 bytes for u32
            tracing::warn!(target: "snmp_dissect::ber", offset = self.offset, length = len, "unsigned integer too long, truncating to 4 bytes");
        }

        let bytes = self.read_bytes(len)?;
        let mut value: u32 = 0;

        for &byte in bytes.iter().take(5) {
            value = (value << 8) | (byte as u32);
        }

        Ok(value)
    }

    /// Read an unsigned 64-bit integer value (Counter64) given the length.
    pub fn read_unsigned64_value(&mut self, len: usize) -> Result<u64> {
        if len == 0 {
            return Err(Error::decode(self.offset, DecodeErrorKind::ZeroLengthInteger));
        }
        if len > 9 {
            // 9 bytes max: 1 leading zero + 8 bytes for u64
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::Integer64TooLong { length: len },
            ));
        }

        let bytes = self.read_bytes(len)?;
        let mut value: u64 = 0;

        for &byte in bytes.iter() {
            value = (value << 8) | (byte as u64);
        }

        Ok(value)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let len = self.expect_tag(0x04)?;
        self.read_bytes(len)
    }

    /// Read an OBJECT IDENTIFIER given a pre-read length.
    pub fn read_oid_value(&mut self, len: usize) -> Result<Oid> {
        let at = self.offset;
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|_| Error::decode(at, DecodeErrorKind::InvalidOidEncoding))
    }

    /// Read a SEQUENCE header, returning a decoder scoped to its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        let len = self.expect_tag(0x30)?;
        let content = self.read_bytes(len)?;
        Ok(Decoder::new(content))
    }

    /// Skip a TLV (tag-length-value) without parsing.
    pub fn skip_tlv(&mut self) -> Result<()> {
        let _ = self.read_identifier()?;
        let len = self.read_length()?;
        let new_offset = self.offset.saturating_add(len);
        if new_offset > self.data.len() {
            return Err(Error::decode(self.offset, DecodeErrorKind::TruncatedData));
        }
        self.offset = new_offset;
        Ok(())
    }

    /// Get the underlying bytes for the entire buffer.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::tag;

    #[test]
    fn test_read_identifier_classes() {
        // 0x30 = universal constructed SEQUENCE
        let mut dec = Decoder::from_slice(&[0x30]);
        let id = dec.read_identifier().unwrap();
        assert_eq!(id.class, Class::Universal);
        assert!(id.constructed);
        assert_eq!(id.tag, tag::universal::SEQUENCE);

        // 0x41 = application primitive tag 1 (Counter32)
        let mut dec = Decoder::from_slice(&[0x41]);
        let id = dec.read_identifier().unwrap();
        assert_eq!(id.class, Class::Application);
        assert!(!id.constructed);
        assert_eq!(id.tag, 1);

        // 0x80 = context primitive tag 0 (noSuchObject)
        let mut dec = Decoder::from_slice(&[0x80]);
        let id = dec.read_identifier().unwrap();
        assert_eq!(id.class, Class::Context);
        assert_eq!(id.tag, 0);
    }

    #[test]
    fn test_read_identifier_long_form_tag() {
        // 0x1F marker then 0x81 0x00 = tag 128
        let mut dec = Decoder::from_slice(&[0x1F, 0x81, 0x00]);
        let id = dec.read_identifier().unwrap();
        assert_eq!(id.class, Class::Universal);
        assert_eq!(id.tag, 128);
    }

    #[test]
    fn test_decode_integer() {
        let mut dec = Decoder::from_slice(&[0x02, 0x01, 0x00]);
        assert_eq!(dec.read_integer().unwrap(), 0);

        let mut dec = Decoder::from_slice(&[0x02, 0x01, 0x7F]);
        assert_eq!(dec.read_integer().unwrap(), 127);

        let mut dec = Decoder::from_slice(&[0x02, 0x02, 0x00, 0x80]);
        assert_eq!(dec.read_integer().unwrap(), 128);

        let mut dec = Decoder::from_slice(&[0x02, 0x01, 0xFF]);
        assert_eq!(dec.read_integer().unwrap(), -1);

        let mut dec = Decoder::from_slice(&[0x02, 0x01, 0x80]);
        assert_eq!(dec.read_integer().unwrap(), -128);
    }

    #[test]
    fn test_decode_octet_string() {
        let mut dec = Decoder::from_slice(&[0x04, 0x05, b'h', b'e', b'l', b'l', b'o']);
        let s = dec.read_octet_string().unwrap();
        assert_eq!(&s[..], b"hello");
    }

    #[test]
    fn test_decode_sequence() {
        // SEQUENCE { INTEGER 1, INTEGER 2 }
        let mut dec = Decoder::from_slice(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        assert_eq!(seq.read_integer().unwrap(), 2);
    }

    #[test]
    fn test_integer_overflow_truncation() {
        // 5-byte integer truncates to 4 bytes (matches net-snmp CHECK_OVERFLOW)
        let mut dec = Decoder::from_slice(&[0x02, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(dec.read_integer().unwrap(), 0x01020304);
    }

    #[test]
    fn test_unsigned64() {
        let mut dec = Decoder::from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(dec.read_unsigned64_value(8).unwrap(), u64::MAX);

        let mut dec = Decoder::from_slice(&[0u8; 10]);
        assert!(dec.read_unsigned64_value(10).is_err());
    }

    #[test]
    fn test_read_bytes_rejects_oversized_length() {
        let mut dec = Decoder::from_slice(&[0x01, 0x02, 0x03]);
        let err = dec.read_bytes(100).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::InsufficientData { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_skip_tlv() {
        let mut dec = Decoder::from_slice(&[0x04, 0x02, 0xAA, 0xBB, 0x02, 0x01, 0x07]);
        dec.skip_tlv().unwrap();
        assert_eq!(dec.read_integer().unwrap(), 7);
    }

    #[test]
    fn test_skip_tlv_rejects_oversized_length() {
        let mut dec = Decoder::from_slice(&[0x04, 0x82, 0x01, 0x00, 0xAA, 0xBB, 0xCC]);
        assert!(dec.skip_tlv().is_err());
    }
}
