// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph model.

use crate::guid::{Guid, GuidUpdate};
use crate::port::{ConstantValue, FlowKind, Port, PortDirection, PortRef, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type id of execution portal entry nodes
pub const EXECUTION_PORTAL_ENTRY: &str = "execution_portal_entry";
/// Type id of execution portal exit nodes
pub const EXECUTION_PORTAL_EXIT: &str = "execution_portal_exit";
/// Type id of data portal entry nodes
pub const DATA_PORTAL_ENTRY: &str = "data_portal_entry";
/// Type id of data portal exit nodes
pub const DATA_PORTAL_EXIT: &str = "data_portal_exit";

/// Side of a portal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortalRole {
    /// Receives the connection
    Entry,
    /// Re-emits the connection elsewhere
    Exit,
}

impl PortalRole {
    /// The complementary role
    pub fn opposite(self) -> Self {
        match self {
            Self::Entry => Self::Exit,
            Self::Exit => Self::Entry,
        }
    }
}

/// Built-in type id for a portal flavour
pub fn portal_type_id(role: PortalRole, flow: FlowKind) -> &'static str {
    match (role, flow) {
        (PortalRole::Entry, FlowKind::Execution) => EXECUTION_PORTAL_ENTRY,
        (PortalRole::Exit, FlowKind::Execution) => EXECUTION_PORTAL_EXIT,
        (PortalRole::Entry, FlowKind::Data) => DATA_PORTAL_ENTRY,
        (PortalRole::Exit, FlowKind::Data) => DATA_PORTAL_EXIT,
    }
}

/// Portal flavour of a built-in type id
pub fn parse_portal_type_id(type_id: &str) -> Option<(PortalRole, FlowKind)> {
    match type_id {
        EXECUTION_PORTAL_ENTRY => Some((PortalRole::Entry, FlowKind::Execution)),
        EXECUTION_PORTAL_EXIT => Some((PortalRole::Exit, FlowKind::Execution)),
        DATA_PORTAL_ENTRY => Some((PortalRole::Entry, FlowKind::Data)),
        DATA_PORTAL_EXIT => Some((PortalRole::Exit, FlowKind::Data)),
        _ => None,
    }
}

/// Variant-specific part of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Node built from a registered [`NodeType`]
    Plain {
        /// Node type id
        type_id: String,
    },
    /// Literal value
    Constant {
        /// Literal-value type id
        type_id: String,
        /// Held value
        value: ConstantValue,
    },
    /// Reads or writes a variable declaration
    Variable {
        /// Referenced declaration
        declaration: Guid,
    },
    /// One side of an edge portal
    Portal {
        /// Shared portal declaration
        declaration: Guid,
        /// Entry or exit
        role: PortalRole,
        /// Execution or data flavour
        flow: FlowKind,
    },
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub guid: Guid,
    /// Display title
    pub title: String,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Variant payload
    pub kind: NodeKind,
    /// Input ports by unique name
    pub inputs: IndexMap<String, Port>,
    /// Output ports by unique name
    pub outputs: IndexMap<String, Port>,
    /// Whether ports of this node may connect to each other
    pub allow_self_connect: bool,
    /// Whether the node is collapsed in the UI
    pub collapsed: bool,
    /// Set once the node has been deleted
    pub destroyed: bool,
}

impl Node {
    /// Create an undefined node (no ports, nil GUID)
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            guid: Guid::nil(),
            title: title.into(),
            position: [0.0, 0.0],
            kind,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            allow_self_connect: false,
            collapsed: false,
            destroyed: false,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Replace the port lists. Ports are keyed by unique name and get this
    /// node as their owner.
    pub fn set_ports(&mut self, inputs: Vec<Port>, outputs: Vec<Port>) {
        let guid = self.guid;
        let keyed = |ports: Vec<Port>| {
            ports
                .into_iter()
                .map(|mut port| {
                    port.node = guid;
                    (port.unique_name.clone(), port)
                })
                .collect::<IndexMap<_, _>>()
        };
        self.inputs = keyed(inputs);
        self.outputs = keyed(outputs);
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }

    /// Get a port by address. The node part of the address is not checked.
    pub fn port(&self, port: &PortRef) -> Option<&Port> {
        match port.direction {
            PortDirection::Input => self.inputs.get(&port.name),
            PortDirection::Output => self.outputs.get(&port.name),
        }
    }

    /// Get a mutable port by address
    pub fn port_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        match port.direction {
            PortDirection::Input => self.inputs.get_mut(&port.name),
            PortDirection::Output => self.outputs.get_mut(&port.name),
        }
    }

    /// All ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values().chain(self.outputs.values())
    }

    /// Address of the input named `name`
    pub fn input_ref(&self, name: &str) -> PortRef {
        PortRef::input(self.guid, name)
    }

    /// Address of the output named `name`
    pub fn output_ref(&self, name: &str) -> PortRef {
        PortRef::output(self.guid, name)
    }

    /// Address of the first output, if any
    pub fn first_output_ref(&self) -> Option<PortRef> {
        self.outputs.values().next().map(Port::port_ref)
    }

    /// Address of the first input, if any
    pub fn first_input_ref(&self) -> Option<PortRef> {
        self.inputs.values().next().map(Port::port_ref)
    }

    /// Declaration referenced by a variable or portal node
    pub fn declaration(&self) -> Option<Guid> {
        match &self.kind {
            NodeKind::Variable { declaration } | NodeKind::Portal { declaration, .. } => Some(*declaration),
            _ => None,
        }
    }

    /// Portal role and flavour, for portal nodes
    pub fn portal(&self) -> Option<(PortalRole, FlowKind)> {
        match self.kind {
            NodeKind::Portal { role, flow, .. } => Some((role, flow)),
            _ => None,
        }
    }

    /// Whether this node is a portal
    pub fn is_portal(&self) -> bool {
        matches!(self.kind, NodeKind::Portal { .. })
    }

    /// Whether this node is a constant or variable node, whose outputs
    /// should not be shared between consumers
    pub fn is_itemizable(&self) -> bool {
        matches!(self.kind, NodeKind::Constant { .. } | NodeKind::Variable { .. })
    }

    /// Called when an edge to `port` is about to be registered.
    ///
    /// Data portals adopt the type of the first port connected to them.
    pub fn on_connection(&mut self, port: &PortRef, peer_type: &PortType) {
        if !matches!(self.kind, NodeKind::Portal { flow: FlowKind::Data, .. }) {
            return;
        }
        if let Some(own) = self.port_mut(port) {
            if own.port_type == PortType::Any {
                own.port_type = peer_type.clone();
            }
        }
    }

    /// Called when an edge to `port` is about to be removed.
    ///
    /// Data portals go back to `Any` once their port has no edge left.
    pub fn on_disconnection(&mut self, port: &PortRef, still_connected: bool) {
        if still_connected || !matches!(self.kind, NodeKind::Portal { flow: FlowKind::Data, .. }) {
            return;
        }
        if let Some(own) = self.port_mut(port) {
            own.port_type = PortType::Any;
        }
    }
}

impl GuidUpdate for Node {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn assign_guid(&mut self, guid: Guid) {
        self.guid = guid;
        for port in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            port.node = guid;
        }
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Event entry points
    Event,
    /// Flow control
    Flow,
    /// Math operations
    Math,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Node type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Default input ports
    pub inputs: Vec<Port>,
    /// Default output ports
    pub outputs: Vec<Port>,
    /// Whether instances may connect to themselves
    #[serde(default)]
    pub allow_self_connect: bool,
}

/// Registry of available node types
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }
}
