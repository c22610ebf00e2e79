// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized graph layout and the load pass that upgrades it.
//!
//! Older documents stored edges, sticky notes and placemats in separate
//! single-type collections and could contain null node entries or elements
//! without a usable identifier. Loading migrates those collections, drops null
//! entries, gives fresh identifiers to nil or duplicated ones, rebuilds the
//! node index and repairs whatever is left dangling.

use crate::annotation::{Placemat, StickyNote};
use crate::config::GraphSettings;
use crate::declaration::VariableDeclaration;
use crate::edge::Edge;
use crate::error::Result;
use crate::graph::GraphModel;
use crate::guid::{ElementKind, ElementSlot, ElementStore, GuidRegistry, GuidRemap, GuidUpdate, NIL_TOKEN};
use crate::node::Node;
use crate::stencil::Stencil;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// On-disk form of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDocument {
    /// Graph name
    pub name: String,
    /// Nodes; `None` entries come from older files and are dropped on load
    pub nodes: Vec<Option<Node>>,
    /// Edges, in order
    pub edges: Vec<Edge>,
    /// Sticky notes
    pub sticky_notes: Vec<StickyNote>,
    /// Placemats
    pub placemats: Vec<Placemat>,
    /// Graph variables
    pub variable_declarations: Vec<VariableDeclaration>,
    /// Portal declarations
    pub portal_declarations: Vec<VariableDeclaration>,
    /// Edges stored separately by older files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legacy_edges: Vec<Edge>,
    /// Sticky notes stored separately by older files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legacy_sticky_notes: Vec<StickyNote>,
    /// Placemats stored separately by older files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legacy_placemats: Vec<Placemat>,
}

impl GraphDocument {
    /// Parse a document from RON
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize the document to RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Whether the document still uses a legacy layout
    pub fn has_legacy_data(&self) -> bool {
        !self.legacy_edges.is_empty()
            || !self.legacy_sticky_notes.is_empty()
            || !self.legacy_placemats.is_empty()
            || self.nodes.iter().any(Option::is_none)
    }
}

/// Element collections while identifiers are being normalized
#[derive(Debug, Default)]
struct Collections {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    sticky_notes: Vec<StickyNote>,
    placemats: Vec<Placemat>,
    variable_declarations: Vec<VariableDeclaration>,
    portal_declarations: Vec<VariableDeclaration>,
}

impl Collections {
    /// Unified collections of a document, legacy entries appended
    fn migrate(doc: GraphDocument) -> Self {
        let dropped = doc.nodes.iter().filter(|n| n.is_none()).count();
        if dropped > 0 {
            tracing::warn!("Dropping {} null node entries", dropped);
        }
        let migrated = doc.legacy_edges.len() + doc.legacy_sticky_notes.len() + doc.legacy_placemats.len();
        if migrated > 0 {
            tracing::info!("Migrating {} elements from legacy collections", migrated);
        }

        let mut edges = doc.edges;
        edges.extend(doc.legacy_edges);
        let mut sticky_notes = doc.sticky_notes;
        sticky_notes.extend(doc.legacy_sticky_notes);
        let mut placemats = doc.placemats;
        placemats.extend(doc.legacy_placemats);

        Self {
            nodes: doc.nodes.into_iter().flatten().collect(),
            edges,
            sticky_notes,
            placemats,
            variable_declarations: doc.variable_declarations,
            portal_declarations: doc.portal_declarations,
        }
    }

    fn take(model: &mut GraphModel) -> Self {
        Self {
            nodes: std::mem::take(&mut model.nodes).into_values().collect(),
            edges: std::mem::take(&mut model.edges),
            sticky_notes: std::mem::take(&mut model.sticky_notes),
            placemats: std::mem::take(&mut model.placemats),
            variable_declarations: std::mem::take(&mut model.variable_declarations),
            portal_declarations: std::mem::take(&mut model.portal_declarations),
        }
    }

    /// Give a fresh identifier to every element whose identifier is nil or
    /// already taken. Returns the number of reassigned elements.
    fn normalize_identifiers(&mut self) -> usize {
        let mut registry = GuidRegistry::new();
        let mut seen = HashSet::new();

        let guids = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (ElementSlot::new(ElementKind::Node, i), n.guid))
            .chain(
                self.edges
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (ElementSlot::new(ElementKind::Edge, i), e.guid)),
            )
            .chain(
                self.sticky_notes
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (ElementSlot::new(ElementKind::StickyNote, i), s.guid)),
            )
            .chain(
                self.placemats
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (ElementSlot::new(ElementKind::Placemat, i), p.guid)),
            )
            .chain(
                self.variable_declarations
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (ElementSlot::new(ElementKind::VariableDeclaration, i), d.guid)),
            )
            .chain(
                self.portal_declarations
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (ElementSlot::new(ElementKind::PortalDeclaration, i), d.guid)),
            );

        for (slot, guid) in guids {
            if guid.is_empty() || !seen.insert(guid) {
                // Duplicates keep references pointing at the first holder.
                registry.register(slot, NIL_TOKEN);
            }
        }

        if registry.is_empty() {
            return 0;
        }
        let mut remap = GuidRemap::new();
        let assigned = registry.resolve(self, &mut remap);
        tracing::warn!("Assigned fresh identifiers to {} elements", assigned);
        assigned
    }

    fn install(self, model: &mut GraphModel) {
        let mut nodes = IndexMap::with_capacity(self.nodes.len());
        for mut node in self.nodes {
            let guid = node.guid;
            node.assign_guid(guid);
            nodes.insert(guid, node);
        }
        model.nodes = nodes;
        model.edges = self.edges;
        model.sticky_notes = self.sticky_notes;
        model.placemats = self.placemats;
        model.variable_declarations = self.variable_declarations;
        model.portal_declarations = self.portal_declarations;
    }
}

impl ElementStore for Collections {
    fn element_mut(&mut self, slot: ElementSlot) -> Option<&mut dyn GuidUpdate> {
        let index = slot.index;
        match slot.kind {
            ElementKind::Node => self.nodes.get_mut(index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::Edge => self.edges.get_mut(index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::StickyNote => self.sticky_notes.get_mut(index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::Placemat => self.placemats.get_mut(index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::VariableDeclaration => self
                .variable_declarations
                .get_mut(index)
                .map(|e| e as &mut dyn GuidUpdate),
            ElementKind::PortalDeclaration => self
                .portal_declarations
                .get_mut(index)
                .map(|e| e as &mut dyn GuidUpdate),
        }
    }
}

impl GraphModel {
    /// Build a graph from a document, running the load pass.
    ///
    /// The returned graph satisfies its integrity checks and has an empty
    /// change list.
    pub fn from_document(doc: GraphDocument, stencil: impl Stencil + 'static, settings: GraphSettings) -> Self {
        let mut model = GraphModel::with_settings(doc.name.clone(), stencil, settings);
        let collections = Collections::migrate(doc);
        model.on_enable(collections);
        model.check_integrity(model.settings().load_check_verbosity);
        model.reset_change_list();
        tracing::info!(
            "Loaded graph {} ({} nodes, {} edges)",
            model.name(),
            model.node_count(),
            model.edge_count()
        );
        model
    }

    /// Snapshot the graph as a document
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            name: self.name().to_string(),
            nodes: self.nodes.values().cloned().map(Some).collect(),
            edges: self.edges.clone(),
            sticky_notes: self.sticky_notes.clone(),
            placemats: self.placemats.clone(),
            variable_declarations: self.variable_declarations.clone(),
            portal_declarations: self.portal_declarations.clone(),
            ..GraphDocument::default()
        }
    }

    /// Parse and load a graph from RON
    pub fn from_ron(s: &str, stencil: impl Stencil + 'static, settings: GraphSettings) -> Result<Self> {
        let doc = GraphDocument::from_ron(s)?;
        Ok(Self::from_document(doc, stencil, settings))
    }

    /// Serialize the graph to RON
    pub fn to_ron(&self) -> Result<String> {
        self.to_document().to_ron()
    }

    /// Save the graph to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved graph {} to {:?}", self.name(), path);
        Ok(())
    }

    /// Load a graph from a file
    pub fn load(path: &Path, stencil: impl Stencil + 'static, settings: GraphSettings) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model = Self::from_ron(&content, stencil, settings)?;
        tracing::info!("Loaded graph from {:?}", path);
        Ok(model)
    }

    /// Re-run the load pass after an external undo or redo replaced the
    /// graph's collections.
    ///
    /// The view must rebuild afterwards, so `requires_rebuild` is set.
    pub fn undo_redo_performed(&mut self) {
        let collections = Collections::take(self);
        self.on_enable(collections);
        self.last_changes.requires_rebuild = true;
    }

    fn on_enable(&mut self, mut collections: Collections) {
        collections.normalize_identifiers();
        collections.install(self);
        let repaired = self.repair();
        if repaired > 0 {
            tracing::warn!("Repaired {} elements in {}", repaired, self.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SpawnFlags;
    use crate::guid::Guid;
    use crate::integrity::Verbosity;
    use crate::library::create_scripting_registry;
    use crate::port::PortRef;
    use crate::stencil::BasicStencil;

    fn stencil() -> BasicStencil {
        BasicStencil::new(create_scripting_registry())
    }

    fn sample() -> GraphModel {
        let mut graph = GraphModel::new("sample", stencil());
        let a = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let b = graph.create_node("add", "", [200.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        graph.create_edge(&PortRef::input(b, "A"), &PortRef::output(a, "Result")).unwrap();
        graph.create_sticky_note(Default::default(), SpawnFlags::Default);
        graph
    }

    #[test]
    fn test_document_round_trip() {
        let graph = sample();
        let ron = graph.to_ron().unwrap();
        let loaded = GraphModel::from_ron(&ron, stencil(), GraphSettings::default()).unwrap();

        assert_eq!(loaded.name(), "sample");
        assert_eq!(loaded.to_document(), graph.to_document());
        assert!(!loaded.last_changes().has_any_topology_change());
    }

    #[test]
    fn test_legacy_collections_are_migrated() {
        let mut doc = sample().to_document();
        doc.legacy_edges = std::mem::take(&mut doc.edges);
        doc.legacy_sticky_notes = std::mem::take(&mut doc.sticky_notes);
        doc.nodes.insert(1, None);
        assert!(doc.has_legacy_data());

        let loaded = GraphModel::from_document(doc, stencil(), GraphSettings::default());
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edge_count(), 1);
        assert_eq!(loaded.sticky_notes().len(), 1);
        assert!(!loaded.to_document().has_legacy_data());
    }

    #[test]
    fn test_nil_and_duplicate_identifiers_are_replaced() {
        let mut doc = sample().to_document();
        let first = doc.nodes[0].clone().unwrap().guid;
        if let Some(node) = doc.nodes[1].as_mut() {
            node.guid = first;
        }
        doc.sticky_notes[0].guid = Guid::nil();

        let loaded = GraphModel::from_document(doc, stencil(), GraphSettings::default());
        assert_eq!(loaded.node_count(), 2);
        assert!(loaded.node(first).is_some());
        assert!(!loaded.sticky_notes()[0].guid.is_empty());
        assert!(loaded.nodes().all(|n| n.ports().all(|p| p.node == n.guid)));
        assert!(loaded.check_integrity(Verbosity::Verbose));
    }

    #[test]
    fn test_load_repairs_dangling_edges() {
        let mut doc = sample().to_document();
        doc.nodes.remove(0);

        let loaded = GraphModel::from_document(doc, stencil(), GraphSettings::default());
        assert_eq!(loaded.edge_count(), 0);
        assert!(loaded.check_integrity(Verbosity::Errors));
        assert!(!loaded.last_changes().has_any_topology_change());
    }

    #[test]
    fn test_undo_redo_reruns_load_pass() {
        let mut graph = sample();
        let first = graph.node_ids().next().unwrap();
        graph.nodes.shift_remove(&first);
        graph.reset_change_list();

        graph.undo_redo_performed();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.last_changes().requires_rebuild);
        assert!(graph.check_integrity(Verbosity::Errors));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("nodeweave-graph-{}.ron", uuid::Uuid::new_v4()));
        let graph = sample();
        graph.save(&path).unwrap();
        let loaded = GraphModel::load(&path, stencil(), GraphSettings::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.to_document(), graph.to_document());
    }
}
