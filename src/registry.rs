//! OID type registry.
//!
//! The VarBind decoder is generic: it does not know any MIB. Instead it
//! consults a [`TypeRegistry`] which maps an object name to a
//! [`ValueTypeDescriptor`] - the BER class/tag/length contract the value
//! must honor, plus a semantic field id for whatever sink displays the
//! result. [`StaticRegistry`] is a longest-prefix map suitable for
//! configuration and tests; a MIB-backed registry implements the same
//! trait.

use std::collections::BTreeMap;

use crate::ber::Class;

/// Expected shape of a value, registered against an OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTypeDescriptor {
    /// Expected BER class; `None` matches any class.
    pub class: Option<Class>,
    /// Expected tag number; `None` matches any tag.
    pub tag: Option<u32>,
    /// Minimum content length in bytes.
    pub min_len: usize,
    /// Maximum content length in bytes; `None` is unbounded.
    pub max_len: Option<usize>,
    /// Semantic field id handed to the display sink.
    pub field: u32,
}

impl ValueTypeDescriptor {
    /// Descriptor matching any primitive value of any length.
    pub fn any(field: u32) -> Self {
        Self {
            class: None,
            tag: None,
            min_len: 0,
            max_len: None,
            field,
        }
    }

    /// Descriptor for a fixed class/tag with a length range.
    pub fn new(
        class: Class,
        tag: u32,
        min_len: usize,
        max_len: Option<usize>,
        field: u32,
    ) -> Self {
        Self {
            class: Some(class),
            tag: Some(tag),
            min_len,
            max_len,
            field,
        }
    }
}

/// Result of resolving an object name against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    /// Number of leading arcs the registry recognized.
    pub matched: usize,
    /// Number of trailing arcs left unrecognized.
    pub unmatched: usize,
    /// Descriptor for the matched object, when one is registered.
    pub descriptor: Option<ValueTypeDescriptor>,
}

impl Resolution {
    /// True when every arc of the name was recognized.
    pub fn is_full(&self) -> bool {
        self.unmatched == 0
    }
}

/// Maps object names to value type descriptors.
pub trait TypeRegistry {
    /// Resolve a parsed object name (arc values) to its descriptor,
    /// reporting how much of the name was recognized.
    fn resolve(&self, arcs: &[u32]) -> Resolution;
}

/// Prefix-map registry.
///
/// Stores descriptors keyed by full or prefix OIDs; `resolve` returns
/// the longest registered prefix of the queried name.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    entries: BTreeMap<Vec<u32>, ValueTypeDescriptor>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under an OID (full instance or prefix).
    pub fn register(&mut self, arcs: &[u32], descriptor: ValueTypeDescriptor) {
        self.entries.insert(arcs.to_vec(), descriptor);
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TypeRegistry for StaticRegistry {
    fn resolve(&self, arcs: &[u32]) -> Resolution {
        // Longest registered prefix wins
        for take in (1..=arcs.len()).rev() {
            if let Some(descriptor) = self.entries.get(&arcs[..take]) {
                return Resolution {
                    matched: take,
                    unmatched: arcs.len() - take,
                    descriptor: Some(*descriptor),
                };
            }
        }
        Resolution {
            matched: 0,
            unmatched: arcs.len(),
            descriptor: None,
        }
    }
}
