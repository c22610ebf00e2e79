// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type-system seam: which node types and literal types a graph can create.

use crate::node::{NodeRegistry, NodeType};
use crate::port::{ConstantValue, PortType};
use std::fmt;

/// Supplies node type definitions and literal-value types to a graph
pub trait Stencil: fmt::Debug {
    /// Node type definition by id
    fn node_type(&self, type_id: &str) -> Option<&NodeType>;

    /// Fresh value of the literal-value type `type_id`, if it is one
    fn literal_value(&self, type_id: &str) -> Option<ConstantValue>;

    /// Literal-value type id to use for constants of `data_type`
    fn literal_type_for(&self, data_type: &PortType) -> Option<&str>;
}

/// Literal-value type ids understood by [`BasicStencil`]
const LITERAL_TYPES: &[(&str, PortType)] = &[
    ("bool", PortType::Bool),
    ("int", PortType::Int),
    ("float", PortType::Float),
    ("vector2", PortType::Vector2),
    ("vector3", PortType::Vector3),
    ("vector4", PortType::Vector4),
    ("color", PortType::Color),
    ("string", PortType::String),
];

/// Stencil backed by a [`NodeRegistry`] and the built-in literal types
#[derive(Debug, Default)]
pub struct BasicStencil {
    registry: NodeRegistry,
}

impl BasicStencil {
    /// Create a stencil over `registry`
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    /// The node type registry
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable access to the node type registry
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }
}

impl Stencil for BasicStencil {
    fn node_type(&self, type_id: &str) -> Option<&NodeType> {
        self.registry.get(type_id)
    }

    fn literal_value(&self, type_id: &str) -> Option<ConstantValue> {
        LITERAL_TYPES
            .iter()
            .find(|(id, _)| *id == type_id)
            .and_then(|(_, ty)| ConstantValue::default_for(ty))
    }

    fn literal_type_for(&self, data_type: &PortType) -> Option<&str> {
        LITERAL_TYPES
            .iter()
            .find(|(_, ty)| ty == data_type)
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_types_resolve_both_ways() {
        let stencil = BasicStencil::default();
        let id = stencil.literal_type_for(&PortType::Int).unwrap();
        assert_eq!(id, "int");
        assert_eq!(stencil.literal_value(id), Some(ConstantValue::Int(0)));
        assert!(stencil.literal_type_for(&PortType::Exec).is_none());
        assert!(stencil.literal_value("branch").is_none());
    }
}
