// SPDX-License-Identifier: MIT OR Apache-2.0
//! Element identity and GUID remapping.
//!
//! Every graph element carries a [`Guid`]. Elements that arrive without a
//! usable identifier (legacy data, pasted copies) are queued in a
//! [`GuidRegistry`] under their old identifier token and receive fresh
//! identifiers in one resolution pass. Resolution runs in two passes: first
//! every pending element is assigned its new identifier, then every pending
//! element rewrites its cross-references through the complete old-to-new
//! table. A single pass would let a placemat rewrite its hidden elements
//! before those elements were assigned.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Token of the nil identifier, as produced by [`Guid::token`]
pub const NIL_TOKEN: &str = "00000000000000000000000000000000";

/// Unique identifier for any graph element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(pub Uuid);

impl Guid {
    /// Create a new random GUID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The "no identifier" value
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil identifier
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// Textual token used as a key in remap tables
    pub fn token(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Kind of element collection a slot points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Node collection
    Node,
    /// Edge collection
    Edge,
    /// Sticky note collection
    StickyNote,
    /// Placemat collection
    Placemat,
    /// Graph variable declarations
    VariableDeclaration,
    /// Edge portal declarations
    PortalDeclaration,
}

/// Position of an element inside an [`ElementStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementSlot {
    /// Collection the element lives in
    pub kind: ElementKind,
    /// Index in that collection
    pub index: usize,
}

impl ElementSlot {
    /// Create a slot
    pub fn new(kind: ElementKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Old identifier token to new identifier table
#[derive(Debug, Clone, Default)]
pub struct GuidRemap {
    map: HashMap<String, Guid>,
}

impl GuidRemap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from an element-to-duplicate mapping
    pub fn from_mapping(mapping: &HashMap<Guid, Guid>) -> Self {
        let mut remap = Self::new();
        for (old, new) in mapping {
            remap.insert(old.token(), *new);
        }
        remap
    }

    /// Record a replacement
    pub fn insert(&mut self, token: impl Into<String>, guid: Guid) {
        self.map.insert(token.into(), guid);
    }

    /// Look up a replacement by token
    pub fn get(&self, token: &str) -> Option<Guid> {
        self.map.get(token).copied()
    }

    /// Look up the replacement for an identifier
    pub fn resolve(&self, guid: &Guid) -> Option<Guid> {
        self.get(&guid.token())
    }

    /// Number of recorded replacements
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(token, new identifier)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, Guid)> {
        self.map.iter().map(|(token, guid)| (token.as_str(), *guid))
    }
}

/// An element whose identifier can be reassigned
pub trait GuidUpdate {
    /// Current identifier
    fn guid(&self) -> Guid;

    /// Replace the identifier
    fn assign_guid(&mut self, guid: Guid);

    /// Rewrite references to other remapped elements
    fn remap_references(&mut self, _remap: &GuidRemap) {}
}

/// A set of element collections addressable by [`ElementSlot`]
pub trait ElementStore {
    /// Element at a slot, if any
    fn element_mut(&mut self, slot: ElementSlot) -> Option<&mut dyn GuidUpdate>;
}

/// Pending identifier assignments
#[derive(Debug, Default)]
pub struct GuidRegistry {
    pending: IndexMap<String, ElementSlot>,
}

impl GuidRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an element for a new identifier under its old token.
    ///
    /// The nil token is replaced by a placeholder derived from the number of
    /// pending entries, so several elements without an identifier can be
    /// queued in the same pass. Returns the token actually used.
    pub fn register(&mut self, slot: ElementSlot, old_token: &str) -> String {
        let token = if old_token == NIL_TOKEN {
            (-(self.pending.len() as i64)).to_string()
        } else {
            old_token.to_string()
        };

        if let Some(previous) = self.pending.get(&token) {
            tracing::warn!(
                "{:?} replaces {:?} as owner of identifier token {}",
                slot,
                previous,
                token
            );
        }
        self.pending.insert(token.clone(), slot);
        token
    }

    /// Number of pending elements
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a token is pending
    pub fn contains(&self, token: &str) -> bool {
        self.pending.contains_key(token)
    }

    /// Drop all pending entries
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Assign fresh identifiers to every pending element, then let each
    /// pending element rewrite its references through `remap`.
    ///
    /// `remap` may be pre-seeded with replacements made elsewhere (for
    /// example node duplication during paste). The pending map is empty
    /// afterwards. Returns the number of elements that were reassigned.
    pub fn resolve<S: ElementStore + ?Sized>(&mut self, store: &mut S, remap: &mut GuidRemap) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut assigned = 0;

        for (token, slot) in &pending {
            match store.element_mut(*slot) {
                Some(element) => {
                    let guid = Guid::new();
                    element.assign_guid(guid);
                    remap.insert(token.clone(), guid);
                    assigned += 1;
                }
                None => tracing::warn!("Pending element {:?} ({}) no longer exists", slot, token),
            }
        }

        for slot in pending.values() {
            if let Some(element) = store.element_mut(*slot) {
                element.remap_references(remap);
            }
        }

        tracing::debug!("Resolved {} pending identifiers", assigned);
        assigned
    }
}
