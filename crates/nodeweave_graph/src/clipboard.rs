// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy and paste of graph fragments.

use crate::annotation::{Placemat, StickyNote};
use crate::edge::Edge;
use crate::error::Result;
use crate::graph::GraphModel;
use crate::guid::{ElementKind, ElementSlot, ElementStore, Guid, GuidRegistry, GuidRemap, GuidUpdate};
use crate::node::Node;
use crate::port::PortRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A copied fragment of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardContent {
    /// Copied nodes
    pub nodes: Vec<Node>,
    /// Edges between copied nodes
    pub edges: Vec<Edge>,
    /// Copied sticky notes
    pub sticky_notes: Vec<StickyNote>,
    /// Copied placemats
    pub placemats: Vec<Placemat>,
}

impl ClipboardContent {
    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.sticky_notes.is_empty() && self.placemats.is_empty()
    }

    /// Parse clipboard text
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize for the system clipboard
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string(self)?)
    }
}

impl ElementStore for ClipboardContent {
    fn element_mut(&mut self, slot: ElementSlot) -> Option<&mut dyn GuidUpdate> {
        match slot.kind {
            ElementKind::Node => self.nodes.get_mut(slot.index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::Edge => self.edges.get_mut(slot.index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::StickyNote => self.sticky_notes.get_mut(slot.index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::Placemat => self.placemats.get_mut(slot.index).map(|e| e as &mut dyn GuidUpdate),
            ElementKind::VariableDeclaration | ElementKind::PortalDeclaration => None,
        }
    }
}

impl GraphModel {
    /// Copy the selected elements.
    ///
    /// Edges are copied when both their endpoint nodes are selected.
    pub fn copy_elements(&self, guids: &[Guid]) -> ClipboardContent {
        let selected: HashSet<Guid> = guids.iter().copied().collect();
        ClipboardContent {
            nodes: self
                .nodes
                .values()
                .filter(|n| selected.contains(&n.guid))
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| selected.contains(&e.input.node) && selected.contains(&e.output.node))
                .cloned()
                .collect(),
            sticky_notes: self
                .sticky_notes
                .iter()
                .filter(|s| selected.contains(&s.guid))
                .cloned()
                .collect(),
            placemats: self
                .placemats
                .iter()
                .filter(|p| selected.contains(&p.guid))
                .cloned()
                .collect(),
        }
    }

    /// Paste a copied fragment, moved by `delta`.
    ///
    /// Nodes are duplicated, copied edges are re-wired between the
    /// duplicates, and notes and placemats get fresh identifiers. Placemats
    /// keep hiding the pasted counterparts of what they hid; references to
    /// elements outside the fragment are dropped. Returns the old-to-new
    /// identifier table.
    pub fn paste(&mut self, content: &ClipboardContent, delta: [f32; 2]) -> Result<GuidRemap> {
        let mut mapping = HashMap::new();
        for node in &content.nodes {
            self.duplicate_node(node, &mut mapping, delta)?;
        }

        for edge in &content.edges {
            let (Some(input), Some(output)) = (mapping.get(&edge.input.node), mapping.get(&edge.output.node)) else {
                continue;
            };
            let input = PortRef::input(*input, edge.input.name.clone());
            let output = PortRef::output(*output, edge.output.name.clone());
            if let Err(err) = self.create_edge(&input, &output) {
                tracing::warn!("Skipping pasted edge {}: {}", edge.guid, err);
            }
        }

        let mut annotations = ClipboardContent {
            sticky_notes: content.sticky_notes.clone(),
            placemats: content.placemats.clone(),
            ..ClipboardContent::default()
        };
        let mut registry = GuidRegistry::new();
        for (index, note) in annotations.sticky_notes.iter_mut().enumerate() {
            note.rect = note.rect.translated(delta);
            registry.register(ElementSlot::new(ElementKind::StickyNote, index), &note.guid.token());
        }
        for (index, placemat) in annotations.placemats.iter_mut().enumerate() {
            placemat.rect = placemat.rect.translated(delta);
            registry.register(ElementSlot::new(ElementKind::Placemat, index), &placemat.guid.token());
        }

        let mut remap = GuidRemap::from_mapping(&mapping);
        registry.resolve(&mut annotations, &mut remap);

        let pasted: HashSet<Guid> = remap.iter().map(|(_, guid)| guid).collect();
        for note in annotations.sticky_notes {
            self.last_changes.mark_changed(note.guid);
            self.sticky_notes.push(note);
        }
        // Copies stack above everything already in the graph, in their
        // original relative order.
        annotations.placemats.sort_by_key(|p| p.z_order);
        for mut placemat in annotations.placemats {
            placemat.hidden_elements.retain(|g| pasted.contains(g));
            placemat.z_order = self.placemat_top_z_order();
            self.last_changes.mark_changed(placemat.guid);
            self.placemats.push(placemat);
        }

        tracing::debug!("Pasted {} elements", remap.len());
        Ok(remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Rect;
    use crate::graph::SpawnFlags;
    use crate::integrity::Verbosity;
    use crate::library::create_scripting_registry;
    use crate::stencil::BasicStencil;

    fn graph() -> GraphModel {
        GraphModel::new("clip", BasicStencil::new(create_scripting_registry()))
    }

    #[test]
    fn test_copy_keeps_only_internal_edges() {
        let mut graph = graph();
        let a = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let b = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let c = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        graph.create_edge(&PortRef::input(b, "A"), &PortRef::output(a, "Result")).unwrap();
        graph.create_edge(&PortRef::input(c, "A"), &PortRef::output(b, "Result")).unwrap();

        let content = graph.copy_elements(&[a, b]);
        assert_eq!(content.nodes.len(), 2);
        assert_eq!(content.edges.len(), 1);
        assert!(graph.copy_elements(&[]).is_empty());
    }

    #[test]
    fn test_paste_rewires_copies() {
        let mut graph = graph();
        let a = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let b = graph.create_node("add", "", [100.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        graph.create_edge(&PortRef::input(b, "A"), &PortRef::output(a, "Result")).unwrap();

        let content = graph.copy_elements(&[a, b]);
        let remap = graph.paste(&content, [0.0, 50.0]).unwrap();
        let new_a = remap.resolve(&a).unwrap();
        let new_b = remap.resolve(&b).unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.node(new_b).unwrap().position, [100.0, 50.0]);
        assert!(graph
            .edge_between(&PortRef::input(new_b, "A"), &PortRef::output(new_a, "Result"))
            .is_some());
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.check_integrity(Verbosity::Errors));
    }

    #[test]
    fn test_paste_remaps_placemat_contents() {
        let mut graph = graph();
        let a = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let outside = graph.create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let note = graph.create_sticky_note(Rect::new(0.0, 0.0, 10.0, 10.0), SpawnFlags::Default).guid();
        let mat = graph.create_placemat(None, Rect::new(0.0, 0.0, 300.0, 300.0), SpawnFlags::Default).guid();
        graph.placemat_mut(mat).unwrap().hidden_elements = vec![a, note, outside];

        let content = graph.copy_elements(&[a, note, mat]);
        let remap = graph.paste(&content, [400.0, 0.0]).unwrap();

        let new_mat = remap.resolve(&mat).unwrap();
        let new_note = remap.resolve(&note).unwrap();
        let pasted = graph.placemat(new_mat).unwrap();
        assert_eq!(pasted.hidden_elements, vec![remap.resolve(&a).unwrap(), new_note]);
        assert_eq!(pasted.rect.x, 400.0);
        assert_eq!(pasted.z_order, 2);
        assert_eq!(graph.sticky_note(new_note).unwrap().rect.x, 400.0);
        assert_eq!(graph.placemat(mat).unwrap().hidden_elements, vec![a, note, outside]);
    }

    #[test]
    fn test_clipboard_text_round_trip() {
        let mut graph = graph();
        let a = graph.create_node("branch", "", [0.0, 0.0], SpawnFlags::Default, None).unwrap().guid();
        let content = graph.copy_elements(&[a]);
        let text = content.to_ron().unwrap();
        assert_eq!(ClipboardContent::from_ron(&text).unwrap(), content);
    }
}
