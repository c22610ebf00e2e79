// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable and portal declarations.

use crate::guid::{Guid, GuidUpdate};
use crate::port::{ConstantValue, PortType};
use serde::{Deserialize, Serialize};

/// Access allowed through a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Modifiers {
    /// Neither read nor write
    #[default]
    None,
    /// Read only
    ReadOnly,
    /// Write only
    WriteOnly,
    /// Read and write
    ReadWrite,
}

impl Modifiers {
    /// Whether the variable can be read
    pub fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Whether the variable can be written
    pub fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// What a declaration declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// A variable of the graph, listed in the declaration panel
    GraphVariable,
    /// The shared identity of an edge portal pair
    EdgePortal,
}

/// A variable or portal declaration.
///
/// Nodes refer to declarations by GUID; the graph owns the declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Unique declaration ID
    pub guid: Guid,
    /// Variable name
    pub name: String,
    /// Data type
    pub data_type: PortType,
    /// Whether the variable is exposed outside the graph
    pub exposed: bool,
    /// Access modifiers
    pub modifiers: Modifiers,
    /// Initial value
    pub initialization: Option<ConstantValue>,
    /// Declaration kind
    pub kind: VariableKind,
}

impl VariableDeclaration {
    /// Create a graph variable declaration with a fresh ID
    pub fn graph_variable(name: impl Into<String>, data_type: PortType) -> Self {
        Self {
            guid: Guid::new(),
            name: name.into(),
            data_type,
            exposed: false,
            modifiers: Modifiers::None,
            initialization: None,
            kind: VariableKind::GraphVariable,
        }
    }

    /// Create a portal declaration with a fresh ID
    pub fn edge_portal(name: impl Into<String>) -> Self {
        Self {
            guid: Guid::new(),
            name: name.into(),
            data_type: PortType::Any,
            exposed: false,
            modifiers: Modifiers::ReadWrite,
            initialization: None,
            kind: VariableKind::EdgePortal,
        }
    }

    /// Whether this is a graph variable
    pub fn is_graph_variable(&self) -> bool {
        self.kind == VariableKind::GraphVariable
    }

    /// Copy with a fresh ID and an initial value owned by the copy
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.guid = Guid::new();
        copy
    }
}

impl GuidUpdate for VariableDeclaration {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn assign_guid(&mut self, guid: Guid) {
        self.guid = guid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_gets_new_guid_and_own_value() {
        let mut original = VariableDeclaration::graph_variable("speed", PortType::Float);
        original.initialization = Some(ConstantValue::Float(2.5));

        let mut copy = original.duplicate();
        assert_ne!(copy.guid, original.guid);
        assert_eq!(copy.name, "speed");
        assert_eq!(copy.initialization, Some(ConstantValue::Float(2.5)));

        copy.initialization = Some(ConstantValue::Float(9.0));
        assert_eq!(original.initialization, Some(ConstantValue::Float(2.5)));
    }

    #[test]
    fn test_portal_declaration_defaults() {
        let decl = VariableDeclaration::edge_portal("jump");
        assert_eq!(decl.kind, VariableKind::EdgePortal);
        assert_eq!(decl.data_type, PortType::Any);
        assert!(decl.modifiers.can_read() && decl.modifiers.can_write());
        assert!(!decl.is_graph_variable());
    }
}
