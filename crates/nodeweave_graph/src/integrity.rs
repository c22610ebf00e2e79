// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integrity checking and repair of a graph model.

use crate::graph::GraphModel;
use crate::guid::{ElementKind, Guid};
use crate::port::{PortDirection, PortRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How much an integrity check logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Log violations only
    #[default]
    Errors,
    /// Also log a successful check
    Verbose,
}

/// A broken structural invariant
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityViolation {
    /// Edge input does not resolve to an input port
    #[error("Edge {edge} has a dangling input {port}")]
    DanglingInput {
        /// Offending edge
        edge: Guid,
        /// Unresolved address
        port: PortRef,
    },

    /// Edge output does not resolve to an output port
    #[error("Edge {edge} has a dangling output {port}")]
    DanglingOutput {
        /// Offending edge
        edge: Guid,
        /// Unresolved address
        port: PortRef,
    },

    /// Node stored under a key other than its own ID
    #[error("Node {guid} is indexed under {key}")]
    NodeKeyMismatch {
        /// Index key
        key: Guid,
        /// Node ID
        guid: Guid,
    },

    /// Element without an identifier
    #[error("{0:?} without an identifier")]
    EmptyGuid(ElementKind),

    /// Identifier used by more than one element
    #[error("Identifier {0} is used by more than one element")]
    DuplicateGuid(Guid),

    /// Element flagged destroyed but still registered
    #[error("Destroyed element {0} is still registered")]
    DestroyedElement(Guid),

    /// Port stored under a key other than its unique name
    #[error("Port {name} of node {node} is stored under {key}")]
    PortKeyMismatch {
        /// Owning node
        node: Guid,
        /// Map key
        key: String,
        /// Port unique name
        name: String,
    },

    /// Port whose back-reference names another node
    #[error("Port {name} of node {node} points at node {owner}")]
    PortOwnerMismatch {
        /// Node holding the port
        node: Guid,
        /// Port unique name
        name: String,
        /// Node the port claims to belong to
        owner: Guid,
    },

    /// Variable node referencing an unknown graph variable
    #[error("Node {node} references missing variable {declaration}")]
    MissingVariable {
        /// Variable node
        node: Guid,
        /// Missing declaration
        declaration: Guid,
    },

    /// Variable node referencing a graph variable declared more than once
    #[error("Node {node} references variable {declaration}, which is declared more than once")]
    DuplicatedVariable {
        /// Variable node
        node: Guid,
        /// Duplicated declaration
        declaration: Guid,
    },

    /// Portal referencing an unknown portal declaration
    #[error("Portal {node} references missing portal declaration {declaration}")]
    MissingPortalDeclaration {
        /// Portal node
        node: Guid,
        /// Missing declaration
        declaration: Guid,
    },
}

/// Every violation found by one integrity pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    /// Violations, in discovery order
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    /// Whether no violation was found
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Whether the report is empty
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterate over violations
    pub fn iter(&self) -> impl Iterator<Item = &IntegrityViolation> {
        self.violations.iter()
    }

    fn push(&mut self, violation: IntegrityViolation) {
        self.violations.push(violation);
    }
}

impl GraphModel {
    /// Check the structural invariants, logging each violation.
    ///
    /// Never mutates the graph. Returns `true` when no violation was found.
    pub fn check_integrity(&self, verbosity: Verbosity) -> bool {
        let report = self.integrity_report();
        for violation in report.iter() {
            tracing::warn!("Integrity violation in {}: {}", self.name(), violation);
        }
        if report.is_ok() && verbosity == Verbosity::Verbose {
            tracing::info!("Integrity check succeeded for {}", self.name());
        }
        report.is_ok()
    }

    /// Collect every invariant violation without logging
    pub fn integrity_report(&self) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        self.check_edges(&mut report);
        self.check_nodes(&mut report);
        self.check_identifiers(&mut report);
        self.check_declarations(&mut report);
        report
    }

    fn port_resolves(&self, port: &PortRef, direction: PortDirection) -> bool {
        port.direction == direction
            && self
                .nodes
                .get(&port.node)
                .is_some_and(|node| node.port(port).is_some())
    }

    fn check_edges(&self, report: &mut IntegrityReport) {
        for edge in &self.edges {
            if !self.port_resolves(&edge.input, PortDirection::Input) {
                report.push(IntegrityViolation::DanglingInput {
                    edge: edge.guid,
                    port: edge.input.clone(),
                });
            }
            if !self.port_resolves(&edge.output, PortDirection::Output) {
                report.push(IntegrityViolation::DanglingOutput {
                    edge: edge.guid,
                    port: edge.output.clone(),
                });
            }
        }
    }

    fn check_nodes(&self, report: &mut IntegrityReport) {
        for (key, node) in &self.nodes {
            if *key != node.guid {
                report.push(IntegrityViolation::NodeKeyMismatch {
                    key: *key,
                    guid: node.guid,
                });
            }
            if node.destroyed {
                report.push(IntegrityViolation::DestroyedElement(node.guid));
            }
            for (key, port) in node.inputs.iter().chain(node.outputs.iter()) {
                if *key != port.unique_name {
                    report.push(IntegrityViolation::PortKeyMismatch {
                        node: node.guid,
                        key: key.clone(),
                        name: port.unique_name.clone(),
                    });
                }
                if port.node != node.guid {
                    report.push(IntegrityViolation::PortOwnerMismatch {
                        node: node.guid,
                        name: port.unique_name.clone(),
                        owner: port.node,
                    });
                }
            }
        }

        let destroyed = self
            .sticky_notes
            .iter()
            .filter(|s| s.destroyed)
            .map(|s| s.guid)
            .chain(self.placemats.iter().filter(|p| p.destroyed).map(|p| p.guid));
        for guid in destroyed {
            report.push(IntegrityViolation::DestroyedElement(guid));
        }
    }

    fn check_identifiers(&self, report: &mut IntegrityReport) {
        let all = self
            .nodes
            .values()
            .map(|n| (ElementKind::Node, n.guid))
            .chain(self.edges.iter().map(|e| (ElementKind::Edge, e.guid)))
            .chain(self.sticky_notes.iter().map(|s| (ElementKind::StickyNote, s.guid)))
            .chain(self.placemats.iter().map(|p| (ElementKind::Placemat, p.guid)))
            .chain(
                self.variable_declarations
                    .iter()
                    .map(|d| (ElementKind::VariableDeclaration, d.guid)),
            )
            .chain(
                self.portal_declarations
                    .iter()
                    .map(|d| (ElementKind::PortalDeclaration, d.guid)),
            );

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for (kind, guid) in all {
            if guid.is_empty() {
                report.push(IntegrityViolation::EmptyGuid(kind));
            } else if !seen.insert(guid) && reported.insert(guid) {
                report.push(IntegrityViolation::DuplicateGuid(guid));
            }
        }
    }

    fn check_declarations(&self, report: &mut IntegrityReport) {
        let mut declared: HashMap<Guid, usize> = HashMap::new();
        let mut other_kinds = HashSet::new();
        for declaration in &self.variable_declarations {
            if declaration.is_graph_variable() {
                *declared.entry(declaration.guid).or_default() += 1;
            } else {
                other_kinds.insert(declaration.guid);
            }
        }

        for node in self.nodes.values() {
            let Some(declaration) = node.declaration() else {
                continue;
            };
            if node.is_portal() {
                if !self.portal_declarations.iter().any(|d| d.guid == declaration) {
                    report.push(IntegrityViolation::MissingPortalDeclaration {
                        node: node.guid,
                        declaration,
                    });
                }
                continue;
            }
            // Only graph variables are held to the one-declaration rule.
            if other_kinds.contains(&declaration) {
                continue;
            }
            match declared.get(&declaration).copied().unwrap_or(0) {
                0 => report.push(IntegrityViolation::MissingVariable {
                    node: node.guid,
                    declaration,
                }),
                1 => {}
                _ => report.push(IntegrityViolation::DuplicatedVariable {
                    node: node.guid,
                    declaration,
                }),
            }
        }
    }

    /// Remove destroyed elements and edges whose ports no longer resolve.
    ///
    /// Edges are deleted through [`delete_edge`](Self::delete_edge) so the
    /// change list records them. Running it twice is the same as running it
    /// once. Returns the number of removed elements.
    pub fn repair(&mut self) -> usize {
        let mut removed = self.remove_destroyed();

        let dangling: Vec<Guid> = self
            .edges
            .iter()
            .filter(|e| {
                !self.port_resolves(&e.input, PortDirection::Input)
                    || !self.port_resolves(&e.output, PortDirection::Output)
            })
            .map(|e| e.guid)
            .collect();
        for guid in dangling {
            tracing::warn!("Removing dangling edge {}", guid);
            if self.delete_edge(guid).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Silently drop destroyed nodes and dangling edges.
    ///
    /// Unlike [`repair`](Self::repair) nothing is recorded in the change list.
    pub fn quick_cleanup(&mut self) -> usize {
        let destroyed: Vec<Guid> = self
            .nodes
            .values()
            .filter(|n| n.destroyed)
            .map(|n| n.guid)
            .collect();
        let mut removed = self.delete_elements(&destroyed);

        let before = self.edges.len();
        let edges = std::mem::take(&mut self.edges);
        let kept: Vec<_> = edges
            .into_iter()
            .filter(|e| {
                self.port_resolves(&e.input, PortDirection::Input)
                    && self.port_resolves(&e.output, PortDirection::Output)
            })
            .collect();
        self.edges = kept;
        removed += before - self.edges.len();
        removed
    }

    fn remove_destroyed(&mut self) -> usize {
        let destroyed: Vec<Guid> = self
            .nodes
            .values()
            .filter(|n| n.destroyed)
            .map(|n| n.guid)
            .collect();
        for guid in &destroyed {
            tracing::warn!("Removing destroyed node {}", guid);
        }
        let mut removed = self.delete_elements(&destroyed);

        let notes = self.sticky_notes.len();
        self.sticky_notes.retain(|s| !s.destroyed);
        let placemats = self.placemats.len();
        self.placemats.retain(|p| !p.destroyed);
        removed += notes - self.sticky_notes.len();
        removed += placemats - self.placemats.len();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{SpawnFlags, Spawned};
    use crate::library::create_scripting_registry;
    use crate::stencil::BasicStencil;

    fn connected_pair() -> (GraphModel, Guid, Guid, Guid) {
        let mut graph = GraphModel::new("check", BasicStencil::new(create_scripting_registry()));
        let a = graph
            .create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None)
            .map(|s| s.guid())
            .unwrap();
        let b = graph
            .create_node("add", "", [0.0, 0.0], SpawnFlags::Default, None)
            .map(|s| s.guid())
            .unwrap();
        let edge = graph
            .create_edge(&PortRef::input(b, "A"), &PortRef::output(a, "Result"))
            .unwrap();
        (graph, a, b, edge)
    }

    #[test]
    fn test_clean_graph_passes() {
        let (graph, ..) = connected_pair();
        assert!(graph.check_integrity(Verbosity::Verbose));
        assert!(graph.integrity_report().is_ok());
    }

    #[test]
    fn test_dangling_edge_is_reported() {
        let (mut graph, a, _, edge) = connected_pair();
        graph.delete_elements(&[a]);
        let report = graph.integrity_report();
        assert_eq!(report.len(), 1);
        assert!(matches!(
            &report.violations[0],
            IntegrityViolation::DanglingOutput { edge: e, .. } if *e == edge
        ));
        assert!(!graph.check_integrity(Verbosity::Errors));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let (mut graph, a, b, edge) = connected_pair();
        graph.delete_elements(&[a]);
        graph.reset_change_list();

        assert_eq!(graph.repair(), 1);
        assert!(graph.edge(edge).is_none());
        assert_eq!(graph.last_changes().deleted_edges.len(), 1);
        assert!(graph.last_changes().contains_changed(b));
        assert!(graph.check_integrity(Verbosity::Errors));

        assert_eq!(graph.repair(), 0);
    }

    #[test]
    fn test_quick_cleanup_is_silent() {
        let (mut graph, _, b, _) = connected_pair();
        graph.node_mut(b).unwrap().destroyed = true;
        graph.reset_change_list();

        assert_eq!(graph.quick_cleanup(), 2);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.last_changes().has_any_topology_change());
    }

    #[test]
    fn test_port_back_reference_is_checked() {
        let (mut graph, a, ..) = connected_pair();
        let stranger = Guid::new();
        graph.node_mut(a).unwrap().inputs.get_mut("A").unwrap().node = stranger;
        let report = graph.integrity_report();
        assert_eq!(
            report.violations,
            vec![IntegrityViolation::PortOwnerMismatch {
                node: a,
                name: "A".into(),
                owner: stranger,
            }]
        );
    }

    #[test]
    fn test_duplicate_identifier_is_reported_once() {
        let (mut graph, a, ..) = connected_pair();
        let note = graph.create_sticky_note(Default::default(), SpawnFlags::Default).guid();
        graph.sticky_note_mut(note).unwrap().guid = a;
        let mat = graph.create_placemat(None, Default::default(), SpawnFlags::Default);
        graph.placemat_mut(mat.guid()).unwrap().guid = a;

        let duplicates = graph
            .integrity_report()
            .violations
            .into_iter()
            .filter(|v| *v == IntegrityViolation::DuplicateGuid(a))
            .count();
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_variable_references_are_checked() {
        let (mut graph, ..) = connected_pair();
        let var = graph
            .create_graph_variable_declaration(
                "x",
                crate::port::PortType::Float,
                Default::default(),
                false,
                None,
                None,
            )
            .unwrap();
        let reader = match graph.create_variable_node(var, [0.0, 0.0], SpawnFlags::Default, None).unwrap() {
            Spawned::Registered(guid) => guid,
            Spawned::Orphan(_) => unreachable!(),
        };
        assert!(graph.integrity_report().is_ok());

        let copy = graph.variable_declarations[0].clone();
        graph.variable_declarations.push(copy);
        assert!(graph.integrity_report().iter().any(|v| matches!(
            v,
            IntegrityViolation::DuplicatedVariable { node, .. } if *node == reader
        )));

        graph.variable_declarations.clear();
        assert!(graph.integrity_report().iter().any(|v| matches!(
            v,
            IntegrityViolation::MissingVariable { node, declaration } if *node == reader && *declaration == var
        )));
    }

    #[test]
    fn test_only_graph_variables_need_one_declaration() {
        let (mut graph, ..) = connected_pair();
        let var = graph
            .create_graph_variable_declaration(
                "x",
                crate::port::PortType::Float,
                Default::default(),
                false,
                None,
                None,
            )
            .unwrap();
        let reader = graph
            .create_variable_node(var, [0.0, 0.0], SpawnFlags::Default, None)
            .unwrap()
            .guid();

        // Same identity, but an edge-portal marker instead of a graph variable.
        let mut marker = crate::declaration::VariableDeclaration::edge_portal("x");
        marker.guid = var;
        graph.variable_declarations = vec![marker.clone(), marker];
        assert!(!graph.integrity_report().iter().any(|v| matches!(
            v,
            IntegrityViolation::MissingVariable { node, .. } | IntegrityViolation::DuplicatedVariable { node, .. }
                if *node == reader
        )));
    }
}
