// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph model: sole owner of nodes, edges, annotations and declarations.
//!
//! Every structural mutation goes through [`GraphModel`]. Operations validate
//! their arguments before touching any collection, record what they changed
//! in the [`ChangeList`], and leave the graph consistent when they return.

use crate::annotation::{Placemat, Rect, StickyNote};
use crate::change_list::ChangeList;
use crate::config::GraphSettings;
use crate::declaration::{Modifiers, VariableDeclaration};
use crate::edge::Edge;
use crate::error::{GraphError, Result};
use crate::guid::{Guid, GuidUpdate};
use crate::node::{parse_portal_type_id, portal_type_id, Node, NodeKind, PortalRole};
use crate::port::{ConstantValue, FlowKind, Port, PortDirection, PortRef, PortType};
use crate::resolver::Connections;
use crate::stencil::{BasicStencil, Stencil};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Output port name of constant nodes
pub const CONSTANT_OUTPUT: &str = "Value";
/// Output port name of variable nodes
pub const VARIABLE_OUTPUT: &str = "Value";
/// Input port name of portal entries
pub const PORTAL_INPUT: &str = "In";
/// Output port name of portal exits
pub const PORTAL_OUTPUT: &str = "Out";

/// How a created element is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnFlags {
    /// Register the element in the graph
    #[default]
    Default,
    /// Build the element but do not register it (previews, ghosts)
    Orphan,
}

impl SpawnFlags {
    /// Whether the element stays out of the graph
    pub fn is_orphan(self) -> bool {
        self == Self::Orphan
    }
}

/// Result of a create operation
#[derive(Debug, Clone, PartialEq)]
pub enum Spawned<T> {
    /// The element was registered under this ID
    Registered(Guid),
    /// The element was built but not registered
    Orphan(T),
}

impl<T: GuidUpdate> Spawned<T> {
    /// ID of the created element
    pub fn guid(&self) -> Guid {
        match self {
            Self::Registered(guid) => *guid,
            Self::Orphan(element) => element.guid(),
        }
    }

    /// ID of the element if it was registered
    pub fn registered(&self) -> Option<Guid> {
        match self {
            Self::Registered(guid) => Some(*guid),
            Self::Orphan(_) => None,
        }
    }

    /// The element if it was not registered
    pub fn into_orphan(self) -> Option<T> {
        match self {
            Self::Registered(_) => None,
            Self::Orphan(element) => Some(element),
        }
    }

    /// Whether the element stayed out of the graph
    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::Orphan(_))
    }
}

/// Whether deleting a node also deletes its edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteConnections {
    /// Delete every edge touching the node first
    Cascade,
    /// Leave edges in place
    Keep,
}

/// Edge reordering among the edges of one output port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderType {
    /// Make the edge the first one
    MoveFirst,
    /// Swap with the previous edge
    MoveUp,
    /// Swap with the next edge
    MoveDown,
    /// Make the edge the last one
    MoveLast,
}

/// A node graph with its annotations and declarations
#[derive(Debug)]
pub struct GraphModel {
    /// Graph name
    name: String,
    /// Tunables
    settings: GraphSettings,
    /// Node and literal type provider
    stencil: Box<dyn Stencil>,
    /// Nodes, in creation order, indexed by GUID
    pub(crate) nodes: IndexMap<Guid, Node>,
    /// Edges; order matters for edges sharing a reorderable port
    pub(crate) edges: Vec<Edge>,
    /// Sticky notes
    pub(crate) sticky_notes: Vec<StickyNote>,
    /// Placemats
    pub(crate) placemats: Vec<Placemat>,
    /// Graph variables, in declaration panel order
    pub(crate) variable_declarations: Vec<VariableDeclaration>,
    /// Portal declarations
    pub(crate) portal_declarations: Vec<VariableDeclaration>,
    /// Changes since the last reset
    pub(crate) last_changes: ChangeList,
}

impl GraphModel {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>, stencil: impl Stencil + 'static) -> Self {
        Self::with_settings(name, stencil, GraphSettings::default())
    }

    /// Create a new empty graph with explicit settings
    pub fn with_settings(name: impl Into<String>, stencil: impl Stencil + 'static, settings: GraphSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            stencil: Box::new(stencil),
            nodes: IndexMap::new(),
            edges: Vec::new(),
            sticky_notes: Vec::new(),
            placemats: Vec::new(),
            variable_declarations: Vec::new(),
            portal_declarations: Vec::new(),
            last_changes: ChangeList::new(),
        }
    }

    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the graph
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Settings in use
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Replace the settings
    pub fn set_settings(&mut self, settings: GraphSettings) {
        self.settings = settings;
    }

    /// Node and literal type provider
    pub fn stencil(&self) -> &dyn Stencil {
        self.stencil.as_ref()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Get a node by ID
    pub fn node(&self, guid: Guid) -> Option<&Node> {
        self.nodes.get(&guid)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, guid: Guid) -> Option<&mut Node> {
        self.nodes.get_mut(&guid)
    }

    /// Get all nodes, in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = Guid> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get an edge by ID
    pub fn edge(&self, guid: Guid) -> Option<&Edge> {
        self.edges.iter().find(|e| e.guid == guid)
    }

    /// Get all edges, in order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get all sticky notes
    pub fn sticky_notes(&self) -> &[StickyNote] {
        &self.sticky_notes
    }

    /// Get a sticky note by ID
    pub fn sticky_note(&self, guid: Guid) -> Option<&StickyNote> {
        self.sticky_notes.iter().find(|s| s.guid == guid)
    }

    /// Get a mutable sticky note by ID
    pub fn sticky_note_mut(&mut self, guid: Guid) -> Option<&mut StickyNote> {
        self.sticky_notes.iter_mut().find(|s| s.guid == guid)
    }

    /// Get all placemats
    pub fn placemats(&self) -> &[Placemat] {
        &self.placemats
    }

    /// Get a placemat by ID
    pub fn placemat(&self, guid: Guid) -> Option<&Placemat> {
        self.placemats.iter().find(|p| p.guid == guid)
    }

    /// Get a mutable placemat by ID
    pub fn placemat_mut(&mut self, guid: Guid) -> Option<&mut Placemat> {
        self.placemats.iter_mut().find(|p| p.guid == guid)
    }

    /// Graph variable declarations, in panel order
    pub fn variable_declarations(&self) -> &[VariableDeclaration] {
        &self.variable_declarations
    }

    /// Portal declarations
    pub fn portal_declarations(&self) -> &[VariableDeclaration] {
        &self.portal_declarations
    }

    /// Any declaration by ID
    pub fn declaration(&self, guid: Guid) -> Option<&VariableDeclaration> {
        self.variable_declarations
            .iter()
            .chain(self.portal_declarations.iter())
            .find(|d| d.guid == guid)
    }

    /// Mutable access to any declaration by ID
    pub fn declaration_mut(&mut self, guid: Guid) -> Option<&mut VariableDeclaration> {
        self.variable_declarations
            .iter_mut()
            .chain(self.portal_declarations.iter_mut())
            .find(|d| d.guid == guid)
    }

    /// Nodes referencing a declaration
    pub fn find_references(&self, declaration: Guid) -> Vec<Guid> {
        self.nodes
            .values()
            .filter(|n| n.declaration() == Some(declaration))
            .map(|n| n.guid)
            .collect()
    }

    /// Connection queries over the edge list
    pub fn connections(&self) -> Connections<'_> {
        Connections::new(&self.edges)
    }

    /// Edges attached to a port, in edge order
    pub fn edges_for_port(&self, port: &PortRef) -> Vec<&Edge> {
        self.connections().edges_for_port(port).collect()
    }

    /// Edges attached to a node
    pub fn edges_for_node(&self, node: Guid) -> Vec<&Edge> {
        self.connections().edges_for_node(node).collect()
    }

    /// Ports connected to a port
    pub fn connected_ports(&self, port: &PortRef) -> Vec<PortRef> {
        self.connections().connected_ports(port).cloned().collect()
    }

    /// The edge connecting exactly `input` and `output`, if any
    pub fn edge_between(&self, input: &PortRef, output: &PortRef) -> Option<&Edge> {
        self.connections().edge_between(input, output)
    }

    /// Whether a port has at least one edge
    pub fn is_connected(&self, port: &PortRef) -> bool {
        self.connections().is_connected(port)
    }

    /// Resolve a port address to the live port
    pub fn resolve_port(&self, port: &PortRef) -> Result<&Port> {
        self.nodes
            .get(&port.node)
            .ok_or(GraphError::NodeNotFound(port.node))?
            .port(port)
            .ok_or_else(|| GraphError::PortNotFound(port.clone()))
    }

    // ------------------------------------------------------------------
    // Change list
    // ------------------------------------------------------------------

    /// Changes since the last reset
    pub fn last_changes(&self) -> &ChangeList {
        &self.last_changes
    }

    /// Mutable access for observers that annotate the current cycle
    pub fn last_changes_mut(&mut self) -> &mut ChangeList {
        &mut self.last_changes
    }

    /// Start a new, empty change list
    pub fn reset_change_list(&mut self) {
        self.last_changes = ChangeList::new();
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Create a node of type `type_id`.
    ///
    /// `type_id` may name a built-in portal type, a literal-value type of the
    /// stencil (producing a constant node) or a node type of the stencil. An
    /// empty `name` takes the type's display name.
    pub fn create_node(
        &mut self,
        type_id: &str,
        name: &str,
        position: [f32; 2],
        spawn_flags: SpawnFlags,
        guid: Option<Guid>,
    ) -> Result<Spawned<Node>> {
        self.create_node_with(type_id, name, position, spawn_flags, guid, |_| {})
    }

    /// Create a node, running `pre_define` before its ports are built
    pub fn create_node_with<F>(
        &mut self,
        type_id: &str,
        name: &str,
        position: [f32; 2],
        spawn_flags: SpawnFlags,
        guid: Option<Guid>,
        pre_define: F,
    ) -> Result<Spawned<Node>>
    where
        F: FnOnce(&mut Node),
    {
        let node = self.instantiate(type_id, name)?;
        self.spawn_node(node, position, spawn_flags, guid, pre_define)
    }

    /// Create a constant node for the data type `data_type`
    pub fn create_constant_node(
        &mut self,
        name: &str,
        data_type: &PortType,
        position: [f32; 2],
        spawn_flags: SpawnFlags,
        guid: Option<Guid>,
    ) -> Result<Spawned<Node>> {
        let type_id = self
            .stencil
            .literal_type_for(data_type)
            .ok_or_else(|| GraphError::NoConstantType(data_type.to_string()))?
            .to_string();
        self.create_node(&type_id, name, position, spawn_flags, guid)
    }

    /// Create a node reading `declaration`
    pub fn create_variable_node(
        &mut self,
        declaration: Guid,
        position: [f32; 2],
        spawn_flags: SpawnFlags,
        guid: Option<Guid>,
    ) -> Result<Spawned<Node>> {
        let title = self
            .variable_declarations
            .iter()
            .find(|d| d.guid == declaration)
            .ok_or(GraphError::DeclarationNotFound(declaration))?
            .name
            .clone();
        let node = Node::new(NodeKind::Variable { declaration }, title);
        self.spawn_node(node, position, spawn_flags, guid, |_| {})
    }

    /// Register an already defined node
    pub fn add_node(&mut self, mut node: Node) -> Result<Guid> {
        if node.guid.is_empty() {
            node.assign_guid(Guid::new());
        }
        if self.nodes.contains_key(&node.guid) {
            return Err(GraphError::DuplicateGuid(node.guid));
        }
        let guid = node.guid;
        tracing::debug!("Adding node {} ({})", node.title, guid);
        self.nodes.insert(guid, node);
        self.last_changes.mark_changed(guid);
        Ok(guid)
    }

    /// Copy `source` into this graph with a fresh ID, moved by `delta`.
    ///
    /// Ports are rebuilt by the define step and input defaults are copied,
    /// so the duplicate never shares literal values with the source.
    /// `mapping` receives `source -> duplicate`.
    pub fn duplicate_node(
        &mut self,
        source: &Node,
        mapping: &mut HashMap<Guid, Guid>,
        delta: [f32; 2],
    ) -> Result<Guid> {
        let mut copy = source.clone();
        copy.assign_guid(Guid::new());
        copy.destroyed = false;
        self.define_node(&mut copy);
        for (name, port) in copy.inputs.iter_mut() {
            if let Some(original) = source.inputs.get(name) {
                port.default_value = original.default_value.clone();
            }
        }
        copy.position = [source.position[0] + delta[0], source.position[1] + delta[1]];

        let guid = self.add_node(copy)?;
        mapping.insert(source.guid, guid);
        Ok(guid)
    }

    /// Give a new consumer of `output` its own copy of the source node.
    ///
    /// Applies to constant and variable nodes whose output is already
    /// connected: the node is duplicated below the original and the matching
    /// output of the duplicate is returned. Otherwise `output` is returned
    /// unchanged.
    pub fn create_itemized_node(&mut self, output: &PortRef) -> Result<PortRef> {
        if output.direction != PortDirection::Output {
            return Err(GraphError::WrongDirection(output.clone()));
        }
        self.resolve_port(output)?;
        if !self.is_connected(output) {
            return Ok(output.clone());
        }
        let source = match self.nodes.get(&output.node) {
            Some(node) if node.is_itemizable() => node.clone(),
            _ => return Ok(output.clone()),
        };

        let offset = [0.0, self.settings.itemize_offset];
        let guid = self.duplicate_node(&source, &mut HashMap::new(), offset)?;
        tracing::debug!("Itemized {} into {}", source.guid, guid);
        Ok(PortRef::output(guid, output.name.clone()))
    }

    /// Connect `output` to `input`, optionally itemizing the source first
    pub fn connect(&mut self, input: &PortRef, output: &PortRef, itemize: bool) -> Result<Guid> {
        if let Some(existing) = self.edge_between(input, output) {
            return Ok(existing.guid);
        }
        let output = if itemize {
            self.resolve_port(input)?;
            self.create_itemized_node(output)?
        } else {
            output.clone()
        };
        self.create_edge(input, &output)
    }

    /// Delete a node, and first its edges when `delete_connections` cascades.
    ///
    /// Deleting the last portal of a portal declaration also removes the
    /// declaration. Returns the removed node, marked destroyed.
    pub fn delete_node(&mut self, guid: Guid, delete_connections: DeleteConnections) -> Result<Node> {
        if !self.nodes.contains_key(&guid) {
            return Err(GraphError::NodeNotFound(guid));
        }

        if delete_connections == DeleteConnections::Cascade {
            let edges: Vec<Guid> = self.connections().edges_for_node(guid).map(|e| e.guid).collect();
            for edge in edges {
                self.delete_edge(edge)?;
            }
        }

        let mut node = self.nodes.shift_remove(&guid).ok_or(GraphError::NodeNotFound(guid))?;
        self.last_changes.deleted_elements += 1;
        self.collect_portal_declaration(&node);
        node.destroyed = true;
        tracing::debug!("Deleted node {} ({})", node.title, guid);
        Ok(node)
    }

    /// Delete several nodes. Fails without deleting anything if one is missing.
    pub fn delete_nodes(&mut self, guids: &[Guid], delete_connections: DeleteConnections) -> Result<Vec<Node>> {
        if let Some(missing) = guids.iter().find(|g| !self.nodes.contains_key(*g)) {
            return Err(GraphError::NodeNotFound(*missing));
        }
        let mut deleted = Vec::with_capacity(guids.len());
        for guid in guids {
            // A guid listed twice is gone after its first deletion.
            if self.nodes.contains_key(guid) {
                deleted.push(self.delete_node(*guid, delete_connections)?);
            }
        }
        Ok(deleted)
    }

    /// Remove a portal declaration once no portal node references it
    pub(crate) fn collect_portal_declaration(&mut self, removed: &Node) {
        let NodeKind::Portal { declaration, .. } = removed.kind else {
            return;
        };
        let still_used = self
            .nodes
            .values()
            .any(|n| n.is_portal() && n.declaration() == Some(declaration));
        if !still_used {
            self.portal_declarations.retain(|d| d.guid != declaration);
            tracing::debug!("Removed unused portal declaration {}", declaration);
        }
    }

    /// Build an undefined node for `type_id`
    fn instantiate(&self, type_id: &str, name: &str) -> Result<Node> {
        if let Some((role, flow)) = parse_portal_type_id(type_id) {
            let kind = NodeKind::Portal {
                declaration: Guid::nil(),
                role,
                flow,
            };
            let title = if name.is_empty() { "Portal" } else { name };
            return Ok(Node::new(kind, title));
        }

        if let Some(value) = self.stencil.literal_value(type_id) {
            let kind = NodeKind::Constant {
                type_id: type_id.to_string(),
                value,
            };
            let title = if name.is_empty() { type_id } else { name };
            return Ok(Node::new(kind, title));
        }

        if let Some(definition) = self.stencil.node_type(type_id) {
            let kind = NodeKind::Plain {
                type_id: type_id.to_string(),
            };
            let title = if name.is_empty() { definition.name.as_str() } else { name };
            let mut node = Node::new(kind, title);
            node.allow_self_connect = definition.allow_self_connect;
            return Ok(node);
        }

        Err(GraphError::InvalidNodeType(type_id.to_string()))
    }

    /// Assign identity, run the setup hook and the define step, then
    /// register unless orphaned. A registered portal left without a
    /// declaration gets a fresh one named after it.
    fn spawn_node<F>(
        &mut self,
        mut node: Node,
        position: [f32; 2],
        spawn_flags: SpawnFlags,
        guid: Option<Guid>,
        pre_define: F,
    ) -> Result<Spawned<Node>>
    where
        F: FnOnce(&mut Node),
    {
        let guid = guid.filter(|g| !g.is_empty()).unwrap_or_default();
        if !spawn_flags.is_orphan() && self.nodes.contains_key(&guid) {
            return Err(GraphError::DuplicateGuid(guid));
        }
        node.guid = guid;
        node.position = position;
        pre_define(&mut node);
        self.define_node(&mut node);

        if spawn_flags.is_orphan() {
            return Ok(Spawned::Orphan(node));
        }
        if matches!(&node.kind, NodeKind::Portal { declaration, .. } if declaration.is_empty()) {
            let declaration = self
                .create_graph_portal_declaration(&node.title, SpawnFlags::Default)
                .guid();
            tracing::debug!("Portal '{}' gets its own declaration {}", node.title, declaration);
            set_portal_declaration(&mut node, declaration);
        }
        Ok(Spawned::Registered(self.add_node(node)?))
    }

    /// Build the node's ports from its kind. Runs before the node is
    /// registered, so it never sees edges.
    pub(crate) fn define_node(&self, node: &mut Node) {
        let (inputs, outputs) = match &node.kind {
            NodeKind::Plain { type_id } => match self.stencil.node_type(type_id) {
                Some(definition) => (definition.inputs.clone(), definition.outputs.clone()),
                None => {
                    tracing::warn!("Unknown node type {} for node {}; keeping its ports", type_id, node.guid);
                    return;
                }
            },
            NodeKind::Constant { value, .. } => (vec![], vec![Port::output(CONSTANT_OUTPUT, value.port_type())]),
            NodeKind::Variable { declaration } => {
                let data_type = self
                    .declaration(*declaration)
                    .map_or(PortType::Any, |d| d.data_type.clone());
                (vec![], vec![Port::output(VARIABLE_OUTPUT, data_type)])
            }
            NodeKind::Portal { role, flow, .. } => {
                let port_type = match flow {
                    FlowKind::Execution => PortType::Exec,
                    FlowKind::Data => PortType::Any,
                };
                match role {
                    PortalRole::Entry => (vec![Port::input(PORTAL_INPUT, port_type)], vec![]),
                    PortalRole::Exit => (vec![], vec![Port::output(PORTAL_OUTPUT, port_type)]),
                }
            }
        };
        node.set_ports(inputs, outputs);
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Connect `output` to `input`.
    ///
    /// Returns the existing edge if this exact pair is already connected.
    /// Both endpoint nodes are notified before the edge is registered.
    pub fn create_edge(&mut self, input: &PortRef, output: &PortRef) -> Result<Guid> {
        if input.direction != PortDirection::Input {
            return Err(GraphError::WrongDirection(input.clone()));
        }
        if output.direction != PortDirection::Output {
            return Err(GraphError::WrongDirection(output.clone()));
        }
        let input_type = self.resolve_port(input)?.port_type.clone();
        let output_type = self.resolve_port(output)?.port_type.clone();

        if let Some(existing) = self.edge_between(input, output) {
            return Ok(existing.guid);
        }

        if let Some(node) = self.nodes.get_mut(&input.node) {
            node.on_connection(input, &output_type);
        }
        if let Some(node) = self.nodes.get_mut(&output.node) {
            node.on_connection(output, &input_type);
        }

        let edge = Edge::new(input.clone(), output.clone());
        let guid = edge.guid;
        self.edges.push(edge);
        self.last_changes.mark_changed(guid);
        self.last_changes.mark_changed(input.node);
        self.last_changes.mark_changed(output.node);
        tracing::debug!("Connected {} -> {}", output, input);
        Ok(guid)
    }

    /// Delete an edge, notifying both endpoint nodes first
    pub fn delete_edge(&mut self, guid: Guid) -> Result<Edge> {
        let index = self
            .connections()
            .position(guid)
            .ok_or(GraphError::EdgeNotFound(guid))?;
        let input = self.edges[index].input.clone();
        let output = self.edges[index].output.clone();

        let others = |port: &PortRef| self.edges.iter().any(|e| e.guid != guid && e.involves_port(port));
        let input_still_connected = others(&input);
        let output_still_connected = others(&output);

        if let Some(node) = self.nodes.get_mut(&input.node) {
            node.on_disconnection(&input, input_still_connected);
            self.last_changes.mark_changed(input.node);
        }
        if let Some(node) = self.nodes.get_mut(&output.node) {
            node.on_disconnection(&output, output_still_connected);
            self.last_changes.mark_changed(output.node);
        }

        let edge = self.edges.remove(index);
        self.last_changes.deleted_edges.push(edge.clone());
        self.last_changes.deleted_elements += 1;
        tracing::debug!("Disconnected {} -> {}", edge.output, edge.input);
        Ok(edge)
    }

    /// Delete several edges. Fails without deleting anything if one is missing.
    pub fn delete_edges(&mut self, guids: &[Guid]) -> Result<Vec<Edge>> {
        if let Some(missing) = guids.iter().find(|g| self.edge(**g).is_none()) {
            return Err(GraphError::EdgeNotFound(*missing));
        }
        let mut deleted = Vec::with_capacity(guids.len());
        for guid in guids {
            if self.edge(*guid).is_some() {
                deleted.push(self.delete_edge(*guid)?);
            }
        }
        Ok(deleted)
    }

    /// Move `edge` immediately before `reference` in the edge order.
    ///
    /// Only meaningful for edges of reorderable ports; callers check
    /// reorderability first.
    pub fn move_edge_before(&mut self, edge: Guid, reference: Guid) -> Result<()> {
        self.move_edge(edge, reference, 0)
    }

    /// Move `edge` immediately after `reference` in the edge order
    pub fn move_edge_after(&mut self, edge: Guid, reference: Guid) -> Result<()> {
        self.move_edge(edge, reference, 1)
    }

    fn move_edge(&mut self, edge: Guid, reference: Guid, shift: usize) -> Result<()> {
        let from = self.connections().position(edge).ok_or(GraphError::EdgeNotFound(edge))?;
        if self.connections().position(reference).is_none() {
            return Err(GraphError::EdgeNotFound(reference));
        }
        if edge == reference {
            return Ok(());
        }
        let moved = self.edges.remove(from);
        let to = self.connections().position(reference).map_or(self.edges.len(), |i| i + shift);
        self.edges.insert(to, moved);
        Ok(())
    }

    /// Reorder `edge` among the edges leaving the same output port.
    ///
    /// Does nothing when that port's edges are not reorderable.
    pub fn reorder_edge(&mut self, edge: Guid, reorder: ReorderType) -> Result<()> {
        let output = self.edge(edge).ok_or(GraphError::EdgeNotFound(edge))?.output.clone();
        let reorderable = self
            .nodes
            .get(&output.node)
            .and_then(|n| n.port(&output))
            .is_some_and(|p| p.reorderable_edges);
        if !reorderable {
            tracing::debug!("Ignoring reorder of {} on non-reorderable port {}", edge, output);
            return Ok(());
        }

        let siblings: Vec<Guid> = self.connections().edges_for_port(&output).map(|e| e.guid).collect();
        let Some(index) = siblings.iter().position(|g| *g == edge) else {
            return Ok(());
        };
        let last = siblings.len() - 1;
        match reorder {
            ReorderType::MoveFirst if index > 0 => self.move_edge_before(edge, siblings[0])?,
            ReorderType::MoveUp if index > 0 => self.move_edge_before(edge, siblings[index - 1])?,
            ReorderType::MoveDown if index < last => self.move_edge_after(edge, siblings[index + 1])?,
            ReorderType::MoveLast if index < last => self.move_edge_after(edge, siblings[last])?,
            _ => return Ok(()),
        }
        self.last_changes.mark_changed(output.node);
        Ok(())
    }

    /// Remove elements of any kind by ID, without cascading and without
    /// recording changes.
    ///
    /// Edges touching removed nodes are left dangling; run
    /// [`repair`](Self::repair) afterwards. Unused portal declarations are
    /// still collected. Returns the number of removed elements.
    pub fn delete_elements(&mut self, guids: &[Guid]) -> usize {
        let mut removed = 0;
        for guid in guids {
            if let Some(node) = self.nodes.shift_remove(guid) {
                self.collect_portal_declaration(&node);
                removed += 1;
            } else if let Some(index) = self.connections().position(*guid) {
                self.edges.remove(index);
                removed += 1;
            } else if let Some(index) = self.sticky_notes.iter().position(|s| s.guid == *guid) {
                self.sticky_notes.remove(index);
                removed += 1;
            } else if let Some(index) = self.placemats.iter().position(|p| p.guid == *guid) {
                self.placemats.remove(index);
                removed += 1;
            }
        }
        removed
    }

    // ------------------------------------------------------------------
    // Sticky notes and placemats
    // ------------------------------------------------------------------

    /// Create a sticky note
    pub fn create_sticky_note(&mut self, rect: Rect, spawn_flags: SpawnFlags) -> Spawned<StickyNote> {
        let note = StickyNote::new(rect);
        if spawn_flags.is_orphan() {
            return Spawned::Orphan(note);
        }
        let guid = note.guid;
        self.sticky_notes.push(note);
        self.last_changes.mark_changed(guid);
        Spawned::Registered(guid)
    }

    /// Delete sticky notes. Fails without deleting anything if one is missing.
    pub fn delete_sticky_notes(&mut self, guids: &[Guid]) -> Result<Vec<StickyNote>> {
        if let Some(missing) = guids.iter().find(|g| self.sticky_note(**g).is_none()) {
            return Err(GraphError::StickyNoteNotFound(*missing));
        }
        let mut deleted = Vec::with_capacity(guids.len());
        for guid in guids {
            if let Some(index) = self.sticky_notes.iter().position(|s| s.guid == *guid) {
                let mut note = self.sticky_notes.remove(index);
                note.destroyed = true;
                self.last_changes.deleted_elements += 1;
                deleted.push(note);
            }
        }
        Ok(deleted)
    }

    /// Create a placemat on top of every existing one
    pub fn create_placemat(&mut self, title: Option<&str>, rect: Rect, spawn_flags: SpawnFlags) -> Spawned<Placemat> {
        let title = title.unwrap_or(self.settings.default_placemat_name.as_str()).to_string();
        let placemat = Placemat::new(title, rect, self.placemat_top_z_order());
        if spawn_flags.is_orphan() {
            return Spawned::Orphan(placemat);
        }
        let guid = placemat.guid;
        self.placemats.push(placemat);
        self.last_changes.mark_changed(guid);
        Spawned::Registered(guid)
    }

    /// Z-order for a new placemat: one above the highest, or 1
    pub fn placemat_top_z_order(&self) -> i32 {
        self.placemats.iter().map(|p| p.z_order).max().map_or(1, |z| z + 1)
    }

    /// Delete placemats, re-exposing the elements they were hiding.
    /// Fails without deleting anything if one is missing.
    pub fn delete_placemats(&mut self, guids: &[Guid]) -> Result<Vec<Placemat>> {
        if let Some(missing) = guids.iter().find(|g| self.placemat(**g).is_none()) {
            return Err(GraphError::PlacematNotFound(*missing));
        }
        let mut deleted = Vec::with_capacity(guids.len());
        for guid in guids {
            if let Some(index) = self.placemats.iter().position(|p| p.guid == *guid) {
                let mut placemat = self.placemats.remove(index);
                self.last_changes
                    .changed_elements
                    .extend(placemat.hidden_elements.iter().copied());
                self.last_changes.deleted_elements += 1;
                placemat.destroyed = true;
                deleted.push(placemat);
            }
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Declare a graph variable
    pub fn create_graph_variable_declaration(
        &mut self,
        name: &str,
        data_type: PortType,
        modifiers: Modifiers,
        exposed: bool,
        initialization: Option<ConstantValue>,
        guid: Option<Guid>,
    ) -> Result<Guid> {
        let mut declaration = VariableDeclaration::graph_variable(name, data_type);
        if let Some(guid) = guid.filter(|g| !g.is_empty()) {
            if self.declaration(guid).is_some() {
                return Err(GraphError::DuplicateGuid(guid));
            }
            declaration.guid = guid;
        }
        declaration.modifiers = modifiers;
        declaration.exposed = exposed;
        declaration.initialization = initialization;

        let guid = declaration.guid;
        self.variable_declarations.push(declaration);
        self.last_changes.declarations_changed = true;
        tracing::debug!("Declared variable {} ({})", name, guid);
        Ok(guid)
    }

    /// Copy graph variables; other declarations are skipped.
    /// Returns the IDs of the copies, appended after the existing variables.
    pub fn duplicate_graph_variable_declarations(&mut self, guids: &[Guid]) -> Vec<Guid> {
        let copies: Vec<VariableDeclaration> = guids
            .iter()
            .filter_map(|g| self.variable_declarations.iter().find(|d| d.guid == *g))
            .filter(|d| d.is_graph_variable())
            .map(VariableDeclaration::duplicate)
            .collect();

        let ids: Vec<Guid> = copies.iter().map(|d| d.guid).collect();
        self.last_changes.changed_elements.extend(ids.iter().copied());
        self.variable_declarations.extend(copies);
        ids
    }

    /// Move a graph variable to `index` in the declaration order.
    ///
    /// `index` is a position in the list before removal; it is adjusted for
    /// the hole the removal leaves. Portal declarations are ignored.
    pub fn reorder_graph_variable_declaration(&mut self, guid: Guid, index: usize) -> Result<()> {
        let Some(old_index) = self.variable_declarations.iter().position(|d| d.guid == guid) else {
            if self.portal_declarations.iter().any(|d| d.guid == guid) {
                return Ok(());
            }
            return Err(GraphError::DeclarationNotFound(guid));
        };

        let declaration = self.variable_declarations.remove(old_index);
        let mut index = index;
        if index > old_index {
            index -= 1;
        }
        if index >= self.variable_declarations.len() {
            self.variable_declarations.push(declaration);
        } else {
            self.variable_declarations.insert(index, declaration);
        }

        self.last_changes.mark_changed(guid);
        self.last_changes.deleted_elements += 1;
        Ok(())
    }

    /// Delete declarations, and with `delete_usages` every node using them
    /// (edges included). Always marks the declaration panel dirty.
    ///
    /// Without `delete_usages` the variable nodes stay in the graph and fail
    /// [`check_integrity`](Self::check_integrity) until they are deleted.
    /// [`repair`](Self::repair) does not remove them.
    pub fn delete_variable_declarations(&mut self, guids: &[Guid], delete_usages: bool) -> Result<Vec<VariableDeclaration>> {
        let mut deleted = Vec::new();
        for guid in guids {
            self.last_changes.declarations_changed = true;
            if let Some(index) = self.variable_declarations.iter().position(|d| d.guid == *guid) {
                deleted.push(self.variable_declarations.remove(index));
            }
            if delete_usages {
                let usages = self.find_references(*guid);
                self.delete_nodes(&usages, DeleteConnections::Cascade)?;
            }
        }
        Ok(deleted)
    }

    /// Declare the shared identity of a portal pair
    pub fn create_graph_portal_declaration(&mut self, name: &str, spawn_flags: SpawnFlags) -> Spawned<VariableDeclaration> {
        let declaration = VariableDeclaration::edge_portal(name);
        if spawn_flags.is_orphan() {
            return Spawned::Orphan(declaration);
        }
        let guid = declaration.guid;
        self.portal_declarations.push(declaration);
        Spawned::Registered(guid)
    }

    // ------------------------------------------------------------------
    // Portals
    // ------------------------------------------------------------------

    /// Create the complementary portal of `portal`, sharing its declaration.
    ///
    /// Without an explicit position the new portal is placed
    /// `settings.portal_offset` to the right of an entry or to the left of
    /// an exit.
    pub fn create_opposite_portal(
        &mut self,
        portal: Guid,
        position: Option<[f32; 2]>,
        spawn_flags: SpawnFlags,
    ) -> Result<Spawned<Node>> {
        let node = self.nodes.get(&portal).ok_or(GraphError::NodeNotFound(portal))?;
        let NodeKind::Portal { declaration, role, flow } = node.kind else {
            return Err(GraphError::NotAPortal(portal));
        };
        let position = position.unwrap_or_else(|| {
            let dx = match role {
                PortalRole::Entry => self.settings.portal_offset,
                PortalRole::Exit => -self.settings.portal_offset,
            };
            [node.position[0] + dx, node.position[1]]
        });
        let title = node.title.clone();

        self.create_node_with(portal_type_id(role.opposite(), flow), &title, position, spawn_flags, None, |n| {
            set_portal_declaration(n, declaration);
        })
    }

    /// Create an entry portal suited to the output side of `edge`.
    ///
    /// The flavour follows the output port's data type. With no
    /// `declaration` a new portal declaration named after the port is made.
    pub fn create_entry_portal_from_edge(
        &mut self,
        edge: Guid,
        declaration: Option<Guid>,
        position: [f32; 2],
    ) -> Result<Guid> {
        let port = self.edge(edge).ok_or(GraphError::EdgeNotFound(edge))?.output.clone();
        self.create_portal_for_port(&port, PortalRole::Entry, declaration, position)
    }

    /// Create an exit portal suited to the input side of `edge`
    pub fn create_exit_portal_from_edge(
        &mut self,
        edge: Guid,
        declaration: Option<Guid>,
        position: [f32; 2],
    ) -> Result<Guid> {
        let port = self.edge(edge).ok_or(GraphError::EdgeNotFound(edge))?.input.clone();
        self.create_portal_for_port(&port, PortalRole::Exit, declaration, position)
    }

    /// Replace `edge` with an entry/exit portal pair.
    ///
    /// The entry is placed right of the output node and the exit left of the
    /// input node. Returns `(entry, exit)`.
    pub fn create_portals_from_edge(&mut self, edge: Guid) -> Result<(Guid, Guid)> {
        let (input, output) = {
            let e = self.edge(edge).ok_or(GraphError::EdgeNotFound(edge))?;
            (e.input.clone(), e.output.clone())
        };
        let offset = self.settings.portal_offset;
        let entry_pos = self.node(output.node).map_or([0.0, 0.0], |n| [n.position[0] + offset, n.position[1]]);
        let exit_pos = self.node(input.node).map_or([0.0, 0.0], |n| [n.position[0] - offset, n.position[1]]);

        let entry = self.create_entry_portal_from_edge(edge, None, entry_pos)?;
        let declaration = self.node(entry).and_then(Node::declaration);
        let exit = self.create_exit_portal_from_edge(edge, declaration, exit_pos)?;

        self.delete_edge(edge)?;
        self.create_edge(&PortRef::input(entry, PORTAL_INPUT), &output)?;
        self.create_edge(&input, &PortRef::output(exit, PORTAL_OUTPUT))?;
        Ok((entry, exit))
    }

    fn create_portal_for_port(
        &mut self,
        port: &PortRef,
        role: PortalRole,
        declaration: Option<Guid>,
        position: [f32; 2],
    ) -> Result<Guid> {
        let flow = self.resolve_port(port)?.flow_kind();
        if let Some(guid) = declaration {
            if !self.portal_declarations.iter().any(|d| d.guid == guid) {
                return Err(GraphError::DeclarationNotFound(guid));
            }
        }

        let declaration = match declaration {
            Some(guid) => guid,
            None => self.create_graph_portal_declaration(&port.name, SpawnFlags::Default).guid(),
        };
        let title = self.declaration(declaration).map(|d| d.name.clone()).unwrap_or_default();

        let spawned = self.create_node_with(
            portal_type_id(role, flow),
            &title,
            position,
            SpawnFlags::Default,
            None,
            |n| set_portal_declaration(n, declaration),
        )?;
        Ok(spawned.guid())
    }

    // ------------------------------------------------------------------
    // Compatibility
    // ------------------------------------------------------------------

    /// Ports an edge dragged from `start` may connect to.
    ///
    /// A candidate is rejected when its flow kind differs, when it sits on
    /// the start node and that node forbids self connection, when it sits on
    /// a portal sharing the start portal's declaration, or when it has the
    /// same direction as `start` (which also excludes `start` itself).
    ///
    /// The result is in reverse node/port order so the frontmost port, the
    /// last one drawn, comes first.
    pub fn get_compatible_ports(&self, start: &PortRef) -> Result<Vec<PortRef>> {
        let start_node = self.nodes.get(&start.node).ok_or(GraphError::NodeNotFound(start.node))?;
        let start_flow = self.resolve_port(start)?.flow_kind();
        let start_portal = match start_node.kind {
            NodeKind::Portal { declaration, .. } => Some(declaration),
            _ => None,
        };

        let mut compatible = Vec::new();
        for node in self.nodes.values() {
            if node.guid == start_node.guid && !start_node.allow_self_connect {
                continue;
            }
            if let (Some(shared), NodeKind::Portal { declaration, .. }) = (start_portal, &node.kind) {
                if *declaration == shared {
                    continue;
                }
            }
            for port in node.ports() {
                if port.flow_kind() != start_flow || port.direction == start.direction {
                    continue;
                }
                compatible.push(PortRef {
                    node: node.guid,
                    name: port.unique_name.clone(),
                    direction: port.direction,
                });
            }
        }

        compatible.reverse();
        Ok(compatible)
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new("Untitled", BasicStencil::default())
    }
}

fn set_portal_declaration(node: &mut Node, guid: Guid) {
    if let NodeKind::Portal { declaration, .. } = &mut node.kind {
        *declaration = guid;
    }
}
