//! BER primitive reading.
//!
//! SNMP messages are BER-encoded (X.690). This module provides the
//! tokenizer layer the decoders are built on: identifier octets split
//! into class/constructed/tag, definite lengths, and primitive value
//! readers over zero-copy [`bytes::Bytes`] buffers.

mod decode;
mod length;

pub use decode::{Class, Decoder, Identifier};
pub use length::{decode_length, MAX_LENGTH};

/// BER tag numbers used by SNMP.
pub mod tag {
    /// Universal class tags.
    pub mod universal {
        pub const INTEGER: u32 = 0x02;
        pub const OCTET_STRING: u32 = 0x04;
        pub const NULL: u32 = 0x05;
        pub const OBJECT_IDENTIFIER: u32 = 0x06;
        pub const SEQUENCE: u32 = 0x10;
    }

    /// Application class tags (RFC 2578 SMIv2 / RFC 1155 SMIv1).
    pub mod application {
        pub const IP_ADDRESS: u32 = 0;
        pub const COUNTER32: u32 = 1;
        pub const GAUGE32: u32 = 2;
        pub const TIMETICKS: u32 = 3;
        pub const OPAQUE: u32 = 4;
        pub const NSAP_ADDRESS: u32 = 5;
        pub const COUNTER64: u32 = 6;
        pub const UNSIGNED32: u32 = 7;
    }

    /// Context class tags: VarBind exception values (RFC 3416).
    pub mod context {
        pub const NO_SUCH_OBJECT: u32 = 0;
        pub const NO_SUCH_INSTANCE: u32 = 1;
        pub const END_OF_MIB_VIEW: u32 = 2;
    }
}
