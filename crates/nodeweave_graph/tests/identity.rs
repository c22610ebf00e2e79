// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifier uniqueness under arbitrary editing sequences.

mod common;

use common::{graph, spawn};
use nodeweave_graph::{DeleteConnections, GraphModel, Guid, PortRef, Rect, SpawnFlags, Verbosity};
use proptest::prelude::*;
use std::collections::HashSet;

fn all_guids(graph: &GraphModel) -> Vec<Guid> {
    graph
        .node_ids()
        .chain(graph.edges().iter().map(|e| e.guid))
        .chain(graph.sticky_notes().iter().map(|s| s.guid))
        .chain(graph.placemats().iter().map(|p| p.guid))
        .chain(graph.variable_declarations().iter().map(|d| d.guid))
        .chain(graph.portal_declarations().iter().map(|d| d.guid))
        .collect()
}

fn apply(graph: &mut GraphModel, op: u8, i: usize, j: usize) {
    let nodes: Vec<Guid> = graph.node_ids().collect();
    match op % 6 {
        0 => {
            spawn(graph, "add", [i as f32, j as f32]);
        }
        1 if !nodes.is_empty() => {
            graph
                .delete_node(nodes[i % nodes.len()], DeleteConnections::Cascade)
                .unwrap();
        }
        2 if !nodes.is_empty() => {
            let input = PortRef::input(nodes[i % nodes.len()], "A");
            let output = PortRef::output(nodes[j % nodes.len()], "Result");
            graph.connect(&input, &output, false).unwrap();
        }
        3 if !nodes.is_empty() => {
            let selection: Vec<Guid> = nodes.iter().copied().take(i % nodes.len() + 1).collect();
            let content = graph.copy_elements(&selection);
            graph.paste(&content, [10.0, 10.0]).unwrap();
        }
        4 => {
            graph.create_sticky_note(Rect::default(), SpawnFlags::Default);
            graph.create_placemat(None, Rect::default(), SpawnFlags::Default);
        }
        5 => {
            let placemats: Vec<Guid> = graph.placemats().iter().map(|p| p.guid).collect();
            if let Some(mat) = placemats.get(i % placemats.len().max(1)) {
                let content = graph.copy_elements(&[*mat]);
                graph.paste(&content, [0.0, 0.0]).unwrap();
            }
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn prop_identifiers_stay_unique(
        ops in proptest::collection::vec((0u8..6, 0usize..16, 0usize..16), 0..40)
    ) {
        let mut graph = graph();
        for (op, i, j) in ops {
            apply(&mut graph, op, i, j);
        }

        let guids = all_guids(&graph);
        let unique: HashSet<Guid> = guids.iter().copied().collect();
        prop_assert_eq!(unique.len(), guids.len());
        prop_assert!(guids.iter().all(|g| !g.is_empty()));
        prop_assert!(graph.check_integrity(Verbosity::Errors));
    }

    #[test]
    fn prop_reload_preserves_graph(
        ops in proptest::collection::vec((0u8..6, 0usize..16, 0usize..16), 0..25)
    ) {
        let mut graph = graph();
        for (op, i, j) in ops {
            apply(&mut graph, op, i, j);
        }

        let text = graph.to_ron().unwrap();
        let loaded = GraphModel::from_ron(&text, common::stencil(), graph.settings().clone()).unwrap();
        prop_assert_eq!(loaded.to_document(), graph.to_document());
    }
}
