//! Generic VarBind decoding.
//!
//! A VarBind is `SEQUENCE { ObjectName, value }`. The decoder is
//! registry-driven: the object name is resolved through a
//! [`TypeRegistry`] and, when fully recognized, the value must honor the
//! registered class/tag/length contract. Context-class values dispatch to
//! the three exception kinds; everything else goes through the generic
//! class/tag table.
//!
//! Structural faults never abort the surrounding parse: the outcome
//! carries either a decoded binding or a fault with a raw decode of the
//! offending range, and always a next offset past the whole VarBind so
//! the caller can resynchronize.

use bytes::Bytes;

use crate::ber::{tag, Class, Decoder, Identifier};
use crate::error::{DecodeErrorKind, Error, VarBindErrorKind};
use crate::oid::Oid;
use crate::registry::TypeRegistry;
use crate::value::Value;

/// Stand-in upper bound when a descriptor's max length is unbounded.
const UNBOUNDED_LEN: usize = 0xFF_FFFF;

/// Result of decoding one VarBind.
#[derive(Debug)]
pub struct VarBindOutcome {
    /// Offset immediately past the VarBind, valid regardless of the
    /// decode result.
    pub next_offset: usize,
    /// The decoded binding, or a recoverable structural fault.
    pub result: Result<DecodedVarBind, VarBindFault>,
}

/// A successfully decoded VarBind.
#[derive(Debug, Clone)]
pub struct DecodedVarBind {
    /// The object name.
    pub name: Oid,
    /// Offset/length of the name's content octets.
    pub name_offset: usize,
    pub name_len: usize,
    /// The decoded value.
    pub value: Value,
    /// Offset/length of the value's content octets.
    pub value_offset: usize,
    pub value_len: usize,
    /// Semantic field id from the registry, when the name resolved fully.
    pub field: Option<u32>,
    /// Rendering aid set when the name did not fully resolve: the dotted
    /// name concatenated with the value's rendered text.
    pub label: Option<String>,
}

impl std::fmt::Display for DecodedVarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "{} = {}", self.name, self.value),
        }
    }
}

/// A recoverable structural fault with its raw fallback decode.
#[derive(Debug, Clone)]
pub struct VarBindFault {
    /// What went wrong.
    pub kind: VarBindErrorKind,
    /// Offset of the offending range.
    pub fallback_offset: usize,
    /// Raw bytes of the offending range, for fallback display.
    pub fallback: Bytes,
}

/// Decode a single VarBind starting at `offset` within `data`.
///
/// The returned [`VarBindOutcome::next_offset`] always points past the
/// VarBind (clamped to the buffer), even when the decode faulted.
pub fn decode_varbind(
    data: &Bytes,
    offset: usize,
    registry: &dyn TypeRegistry,
) -> VarBindOutcome {
    let seq_offset = offset;
    let mut dec = Decoder::at(data.clone(), offset);

    // VarBind sequence header
    let seq_ident = match read_header_ident(&mut dec) {
        Ok(ident) => ident,
        Err(kind) => return early_fault(data, seq_offset, kind),
    };
    let seq_len = match read_header_len(&mut dec) {
        Ok(len) => len,
        Err(kind) => return early_fault(data, seq_offset, kind),
    };

    // Everything from here on resynchronizes to the end of the sequence
    let seq_end = dec.offset().saturating_add(seq_len).min(data.len());

    if !(seq_ident.class == Class::Universal
        && seq_ident.constructed
        && seq_ident.tag == tag::universal::SEQUENCE)
    {
        return fault(data, seq_end, seq_offset, VarBindErrorKind::NotASequence);
    }

    // ObjectName header
    let name_ident = match read_header_ident(&mut dec) {
        Ok(ident) => ident,
        Err(kind) => return fault(data, seq_end, seq_offset, kind),
    };
    let name_len = match read_header_len(&mut dec) {
        Ok(len) => len,
        Err(kind) => return fault(data, seq_end, seq_offset, kind),
    };

    if !name_ident.is_universal_primitive(tag::universal::OBJECT_IDENTIFIER) {
        return fault(data, seq_end, seq_offset, VarBindErrorKind::ObjectNameNotOid);
    }

    let name_offset = dec.offset();
    let name_bytes = match dec.read_bytes(name_len) {
        Ok(bytes) => bytes,
        Err(_) => return fault(data, seq_end, seq_offset, VarBindErrorKind::Truncated),
    };
    let name = match Oid::from_ber(&name_bytes) {
        Ok(oid) => oid,
        Err(_) => {
            return fault(data, seq_end, name_offset, VarBindErrorKind::ObjectNameNotOid);
        }
    };

    // Value header
    let value_start = dec.offset();
    let value_ident = match read_header_ident(&mut dec) {
        Ok(ident) => ident,
        Err(kind) => return fault(data, seq_end, value_start, kind),
    };
    let value_len = match read_header_len(&mut dec) {
        Ok(len) => len,
        Err(kind) => return fault(data, seq_end, value_start, kind),
    };
    let value_offset = dec.offset();

    if value_ident.constructed {
        return fault(data, seq_end, value_start, VarBindErrorKind::ValueNotPrimitive);
    }
    if value_offset.saturating_add(value_len) > seq_end {
        return fault(data, seq_end, value_start, VarBindErrorKind::Truncated);
    }

    let resolution = registry.resolve(name.arcs());

    // Exception values: context class, zero length, tag 0..=2
    if value_ident.class == Class::Context {
        if value_len != 0 {
            return fault(
                data,
                seq_end,
                value_start,
                VarBindErrorKind::LengthOutOfBounds {
                    length: value_len,
                    min: 0,
                    max: 0,
                },
            );
        }
        if value_ident.tag > tag::context::END_OF_MIB_VIEW {
            return fault(
                data,
                seq_end,
                value_start,
                VarBindErrorKind::WrongExceptionTag {
                    tag: value_ident.tag,
                },
            );
        }
    } else if resolution.is_full()
        && !value_ident.is_universal_primitive(tag::universal::NULL)
    {
        // Fully resolved name: the value must honor the registered
        // contract. A NULL value (GET-style binding) is exempt.
        if let Some(desc) = resolution.descriptor {
            if let Some(expected) = desc.class {
                if expected != value_ident.class {
                    return fault(data, seq_end, value_start, VarBindErrorKind::ClassTagMismatch);
                }
            }
            if let Some(expected) = desc.tag {
                if expected != value_ident.tag {
                    return fault(data, seq_end, value_start, VarBindErrorKind::ClassTagMismatch);
                }
            }
            let max = desc.max_len.unwrap_or(UNBOUNDED_LEN);
            if value_len < desc.min_len || value_len > max {
                return fault(
                    data,
                    seq_end,
                    value_start,
                    VarBindErrorKind::LengthOutOfBounds {
                        length: value_len,
                        min: desc.min_len,
                        max,
                    },
                );
            }
        }
    }

    // Generic dispatch length contracts
    if value_ident.class == Class::Universal {
        let bounds = match value_ident.tag {
            tag::universal::INTEGER => Some((1, 4)),
            tag::universal::OBJECT_IDENTIFIER => Some((2, UNBOUNDED_LEN)),
            tag::universal::NULL => Some((0, 0)),
            _ => None,
        };
        if let Some((min, max)) = bounds {
            if value_len < min || value_len > max {
                return fault(
                    data,
                    seq_end,
                    value_start,
                    VarBindErrorKind::LengthOutOfBounds {
                        length: value_len,
                        min,
                        max,
                    },
                );
            }
        }
    }

    let value = match Value::decode_payload(value_ident.class, value_ident.tag, value_len, &mut dec)
    {
        Ok(value) => value,
        Err(_) => return fault(data, seq_end, value_start, VarBindErrorKind::Truncated),
    };

    let field = if resolution.is_full() {
        resolution.descriptor.map(|d| d.field)
    } else {
        None
    };

    let label = if resolution.unmatched > 0 {
        Some(format!("{}: {}", name, value))
    } else {
        None
    };

    VarBindOutcome {
        next_offset: seq_end,
        result: Ok(DecodedVarBind {
            name,
            name_offset,
            name_len,
            value,
            value_offset,
            value_len,
            field,
            label,
        }),
    }
}

/// Decode a run of VarBinds until the buffer is exhausted.
///
/// Faulted bindings are kept in the output; decoding continues at each
/// outcome's next offset.
pub fn decode_varbind_list(data: &Bytes, registry: &dyn TypeRegistry) -> Vec<VarBindOutcome> {
    let mut outcomes = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let outcome = decode_varbind(data, offset, registry);
        let next = outcome.next_offset;
        outcomes.push(outcome);
        if next <= offset {
            break;
        }
        offset = next;
    }

    outcomes
}

fn read_header_ident(dec: &mut Decoder) -> Result<Identifier, VarBindErrorKind> {
    dec.read_identifier()
        .map_err(|_| VarBindErrorKind::Truncated)
}

fn read_header_len(dec: &mut Decoder) -> Result<usize, VarBindErrorKind> {
    dec.read_length().map_err(|err| match err {
        Error::Decode {
            kind: DecodeErrorKind::IndefiniteLength,
            ..
        } => VarBindErrorKind::IndefiniteLength,
        _ => VarBindErrorKind::Truncated,
    })
}

/// Fault before the sequence length is known: consume the rest of the buffer.
fn early_fault(data: &Bytes, seq_offset: usize, kind: VarBindErrorKind) -> VarBindOutcome {
    tracing::debug!(target: "snmp_dissect::varbind", offset = seq_offset, %kind, "varbind structural fault");
    VarBindOutcome {
        next_offset: data.len(),
        result: Err(VarBindFault {
            kind,
            fallback_offset: seq_offset,
            fallback: data.slice(seq_offset.min(data.len())..),
        }),
    }
}

fn fault(
    data: &Bytes,
    seq_end: usize,
    fallback_offset: usize,
    kind: VarBindErrorKind,
) -> VarBindOutcome {
    tracing::debug!(target: "snmp_dissect::varbind", offset = fallback_offset, %kind, "varbind structural fault");
    let start = fallback_offset.min(data.len());
    let end = seq_end.max(start).min(data.len());
    VarBindOutcome {
        next_offset: seq_end,
        result: Err(VarBindFault {
            kind,
            fallback_offset,
            fallback: data.slice(start..end),
        }),
    }
}
