// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types for visual scripting graphs.
//!
//! Supports execution flow and data flow.

use crate::node::{NodeCategory, NodeRegistry, NodeType};
use crate::port::{ConstantValue, Port, PortType};

/// Create the scripting graph node registry
pub fn create_scripting_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Event nodes
    registry.register(NodeType {
        id: "event_begin_play".to_string(),
        name: "Event Begin Play".to_string(),
        category: NodeCategory::Event,
        description: "Triggered when gameplay starts".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("Exec", PortType::Exec)],
        allow_self_connect: false,
    });

    registry.register(NodeType {
        id: "event_tick".to_string(),
        name: "Event Tick".to_string(),
        category: NodeCategory::Event,
        description: "Triggered every frame".to_string(),
        inputs: vec![],
        outputs: vec![
            Port::output("Exec", PortType::Exec),
            Port::output("Delta Time", PortType::Float),
        ],
        allow_self_connect: false,
    });

    // Flow control
    registry.register(NodeType {
        id: "branch".to_string(),
        name: "Branch".to_string(),
        category: NodeCategory::Flow,
        description: "If/else branching".to_string(),
        inputs: vec![
            Port::input("Exec", PortType::Exec),
            Port::input("Condition", PortType::Bool).with_default(ConstantValue::Bool(false)),
        ],
        outputs: vec![
            Port::output("True", PortType::Exec),
            Port::output("False", PortType::Exec),
        ],
        allow_self_connect: false,
    });

    registry.register(NodeType {
        id: "sequence".to_string(),
        name: "Sequence".to_string(),
        category: NodeCategory::Flow,
        description: "Runs its outputs in order".to_string(),
        inputs: vec![Port::input("Exec", PortType::Exec)],
        outputs: vec![
            Port::output("Then 0", PortType::Exec),
            Port::output("Then 1", PortType::Exec),
        ],
        allow_self_connect: false,
    });

    // A loop body may feed its own input.
    registry.register(NodeType {
        id: "loop".to_string(),
        name: "Loop".to_string(),
        category: NodeCategory::Flow,
        description: "Repeats its body while the condition holds".to_string(),
        inputs: vec![
            Port::input("Exec", PortType::Exec),
            Port::input("Continue", PortType::Bool).with_default(ConstantValue::Bool(true)),
        ],
        outputs: vec![
            Port::output("Body", PortType::Exec),
            Port::output("Completed", PortType::Exec),
            Port::output("Running", PortType::Bool),
        ],
        allow_self_connect: true,
    });

    // Math
    for (id, name, description) in [
        ("add", "Add", "Adds two numbers"),
        ("multiply", "Multiply", "Multiplies two numbers"),
    ] {
        registry.register(NodeType {
            id: id.to_string(),
            name: name.to_string(),
            category: NodeCategory::Math,
            description: description.to_string(),
            inputs: vec![
                Port::input("A", PortType::Float).with_default(ConstantValue::Float(0.0)),
                Port::input("B", PortType::Float).with_default(ConstantValue::Float(0.0)),
            ],
            outputs: vec![Port::output("Result", PortType::Float)],
            allow_self_connect: false,
        });
    }

    // Print string (for debugging)
    registry.register(NodeType {
        id: "print_string".to_string(),
        name: "Print String".to_string(),
        category: NodeCategory::Utility,
        description: "Print a string to the console".to_string(),
        inputs: vec![
            Port::input("Exec", PortType::Exec),
            Port::input("String", PortType::String),
        ],
        outputs: vec![Port::output("Exec", PortType::Exec)],
        allow_self_connect: false,
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let registry = create_scripting_registry();
        assert!(registry.get("branch").is_some());
        assert!(registry.get("loop").unwrap().allow_self_connect);
        assert_eq!(registry.types_in_category(NodeCategory::Math).count(), 2);
    }
}
