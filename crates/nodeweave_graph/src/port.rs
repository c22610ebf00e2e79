// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::guid::Guid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// The other direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Whether a port carries execution flow or data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    /// Execution flow
    Execution,
    /// Data flow
    Data,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Execution flow
    Exec,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Entity reference
    Entity,
    /// Any type (for generic nodes)
    Any,
    /// Custom type
    Custom(String),
}

impl PortType {
    /// Flow kind carried by this type
    pub fn flow_kind(&self) -> FlowKind {
        match self {
            Self::Exec => FlowKind::Execution,
            _ => FlowKind::Data,
        }
    }

    /// Whether this is the execution flow type
    pub fn is_execution(&self) -> bool {
        self.flow_kind() == FlowKind::Execution
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Address of a port: owning node identity, unique port name and direction.
///
/// Edges and callers hold ports by address rather than by reference, so an
/// address stays valid when its node is replaced by an equivalent copy.
/// Two ports are equivalent exactly when their addresses are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: Guid,
    /// Unique port name on that node
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
}

impl PortRef {
    /// Address an input port
    pub fn input(node: Guid, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
            direction: PortDirection::Input,
        }
    }

    /// Address an output port
    pub fn output(node: Guid, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
            direction: PortDirection::Output,
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            PortDirection::Input => "in",
            PortDirection::Output => "out",
        };
        write!(f, "{}.{}:{}", self.node, dir, self.name)
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Name unique among the node's ports of the same direction
    pub unique_name: String,
    /// Display title
    pub title: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Default value (for inputs)
    pub default_value: Option<ConstantValue>,
    /// Whether the order of this port's edges is meaningful and user controlled
    pub reorderable_edges: bool,
    /// Owning node
    pub node: Guid,
}

impl Port {
    /// Create a new port
    pub fn new(name: impl Into<String>, port_type: PortType, direction: PortDirection) -> Self {
        let name = name.into();
        // Execution fan-out runs in edge order.
        let reorderable_edges = direction == PortDirection::Output && port_type.is_execution();
        Self {
            title: name.clone(),
            unique_name: name,
            direction,
            port_type,
            default_value: None,
            reorderable_edges,
            node: Guid::nil(),
        }
    }

    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, port_type, PortDirection::Output)
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: ConstantValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Override edge reorderability
    pub fn with_reorderable_edges(mut self, reorderable: bool) -> Self {
        self.reorderable_edges = reorderable;
        self
    }

    /// Address of this port
    pub fn port_ref(&self) -> PortRef {
        PortRef {
            node: self.node,
            name: self.unique_name.clone(),
            direction: self.direction,
        }
    }

    /// Flow kind of this port
    pub fn flow_kind(&self) -> FlowKind {
        self.port_type.flow_kind()
    }
}

/// Literal value held by constant nodes, port defaults and variable initializers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// String
    String(String),
}

impl ConstantValue {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::Vector2(_) => PortType::Vector2,
            Self::Vector3(_) => PortType::Vector3,
            Self::Vector4(_) => PortType::Vector4,
            Self::Color(_) => PortType::Color,
            Self::String(_) => PortType::String,
        }
    }

    /// Default literal for a data type, if the type has a literal form
    pub fn default_for(port_type: &PortType) -> Option<Self> {
        let value = match port_type {
            PortType::Bool => Self::Bool(false),
            PortType::Int => Self::Int(0),
            PortType::Float => Self::Float(0.0),
            PortType::Vector2 => Self::Vector2([0.0; 2]),
            PortType::Vector3 => Self::Vector3([0.0; 3]),
            PortType::Vector4 => Self::Vector4([0.0; 4]),
            PortType::Color => Self::Color([0.0, 0.0, 0.0, 1.0]),
            PortType::String => Self::String(String::new()),
            _ => return None,
        };
        Some(value)
    }
}
