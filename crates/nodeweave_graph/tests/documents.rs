// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading, saving and upgrading graph documents.

mod common;

use common::{graph, spawn, stencil};
use nodeweave_graph::{
    GraphDocument, GraphModel, GraphSettings, Guid, PortRef, Rect, SpawnFlags, Verbosity,
};

fn scripted() -> GraphModel {
    let mut graph = graph();
    let tick = spawn(&mut graph, "event_tick", [0.0, 0.0]);
    let print = spawn(&mut graph, "print_string", [300.0, 0.0]);
    graph
        .create_edge(&PortRef::input(print, "Exec"), &PortRef::output(tick, "Exec"))
        .unwrap();
    let note = graph
        .create_sticky_note(Rect::new(0.0, 200.0, 150.0, 80.0), SpawnFlags::Default)
        .guid();
    let mat = graph
        .create_placemat(Some("Startup"), Rect::new(-20.0, -20.0, 500.0, 300.0), SpawnFlags::Default)
        .guid();
    if let Some(placemat) = graph.placemat_mut(mat) {
        placemat.collapsed = true;
        placemat.hidden_elements = vec![print, note];
    }
    graph
}

#[test]
fn test_minimal_document_loads_empty() {
    common::init_tracing();
    let graph = GraphModel::from_ron("(name: \"blank\")", stencil(), GraphSettings::default()).unwrap();
    assert_eq!(graph.name(), "blank");
    assert_eq!(graph.node_count(), 0);
    assert!(graph.check_integrity(Verbosity::Verbose));
}

#[test]
fn test_malformed_document_is_rejected() {
    common::init_tracing();
    let err = GraphModel::from_ron("(name: ", stencil(), GraphSettings::default());
    assert!(matches!(err, Err(nodeweave_graph::GraphError::Deserialization(_))));
}

#[test]
fn test_legacy_layout_upgrades_through_text() {
    let source = scripted();
    let mut doc = source.to_document();
    doc.legacy_edges = std::mem::take(&mut doc.edges);
    doc.legacy_sticky_notes = std::mem::take(&mut doc.sticky_notes);
    doc.legacy_placemats = std::mem::take(&mut doc.placemats);
    doc.nodes.push(None);
    let text = doc.to_ron().unwrap();
    assert!(text.contains("legacy_edges"));

    let loaded = GraphModel::from_ron(&text, stencil(), GraphSettings::default()).unwrap();
    assert_eq!(loaded.node_count(), 2);
    assert_eq!(loaded.edge_count(), 1);
    assert_eq!(loaded.sticky_notes().len(), 1);
    assert_eq!(loaded.placemats().len(), 1);
    assert_eq!(loaded.to_document(), source.to_document());
    assert!(!loaded.to_ron().unwrap().contains("legacy_edges"));
    assert!(!loaded.last_changes().has_any_topology_change());
}

#[test]
fn test_nil_placemat_identifier_is_replaced() {
    let source = scripted();
    let mut doc = source.to_document();
    doc.placemats[0].guid = Guid::nil();
    doc.sticky_notes[0].guid = Guid::nil();
    let hidden = doc.placemats[0].hidden_elements.clone();

    let loaded = GraphModel::from_document(doc, stencil(), GraphSettings::default());
    let placemat = &loaded.placemats()[0];
    assert!(!placemat.guid.is_empty());
    assert!(!loaded.sticky_notes()[0].guid.is_empty());
    assert_ne!(placemat.guid, loaded.sticky_notes()[0].guid);
    assert_eq!(placemat.hidden_elements, hidden);
    assert!(loaded.check_integrity(Verbosity::Errors));
}

#[test]
fn test_custom_settings_survive_load() {
    let settings = GraphSettings::from_ron("(portal_offset: 80.0, default_placemat_name: \"Group\")").unwrap();
    let text = scripted().to_ron().unwrap();
    let mut loaded = GraphModel::from_ron(&text, stencil(), settings).unwrap();

    let mat = loaded.create_placemat(None, Rect::default(), SpawnFlags::Default).guid();
    assert_eq!(loaded.placemat(mat).unwrap().title, "Group");
    assert_eq!(loaded.placemat(mat).unwrap().z_order, 2);
}

#[test]
fn test_document_default_is_empty() {
    let doc = GraphDocument::default();
    assert!(!doc.has_legacy_data());
    let graph = GraphModel::from_document(doc, stencil(), GraphSettings::default());
    assert_eq!(graph.edge_count(), 0);
}
