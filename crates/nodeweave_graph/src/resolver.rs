// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only port and connection queries over an edge list.

use crate::edge::Edge;
use crate::guid::Guid;
use crate::port::{PortDirection, PortRef};

/// Connection queries over a slice of edges, in edge order
#[derive(Debug, Clone, Copy)]
pub struct Connections<'a> {
    edges: &'a [Edge],
}

impl<'a> Connections<'a> {
    /// Create a view over `edges`
    pub fn new(edges: &'a [Edge]) -> Self {
        Self { edges }
    }

    /// Edges attached to a port
    pub fn edges_for_port<'p>(&self, port: &'p PortRef) -> impl Iterator<Item = &'a Edge> + 'p
    where
        'a: 'p,
    {
        self.edges.iter().filter(move |e| match port.direction {
            PortDirection::Input => e.input == *port,
            PortDirection::Output => e.output == *port,
        })
    }

    /// Edges attached to any port of a node
    pub fn edges_for_node(&self, node: Guid) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.involves_node(node))
    }

    /// Ports connected to a port
    pub fn connected_ports<'p>(&self, port: &'p PortRef) -> impl Iterator<Item = &'a PortRef> + 'p
    where
        'a: 'p,
    {
        self.edges_for_port(port).filter_map(move |e| e.peer_of(port))
    }

    /// The edge connecting exactly this pair, if any
    pub fn edge_between(&self, input: &PortRef, output: &PortRef) -> Option<&'a Edge> {
        self.edges.iter().find(|e| e.connects(input, output))
    }

    /// Whether a port has at least one edge
    pub fn is_connected(&self, port: &PortRef) -> bool {
        self.edges_for_port(port).next().is_some()
    }

    /// Position of an edge in the edge order
    pub fn position(&self, edge: Guid) -> Option<usize> {
        self.edges.iter().position(|e| e.guid == edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_follow_edge_order() {
        let a = Guid::new();
        let b = Guid::new();
        let c = Guid::new();
        let out = PortRef::output(a, "Out");
        let edges = vec![
            Edge::new(PortRef::input(b, "In"), out.clone()),
            Edge::new(PortRef::input(c, "In"), out.clone()),
        ];
        let conns = Connections::new(&edges);

        let peers: Vec<_> = conns.connected_ports(&out).map(|p| p.node).collect();
        assert_eq!(peers, vec![b, c]);
        assert_eq!(conns.edges_for_node(a).count(), 2);
        assert_eq!(conns.edges_for_node(b).count(), 1);
        assert!(conns.is_connected(&out));
        assert!(!conns.is_connected(&PortRef::output(b, "In")));
    }

    #[test]
    fn test_edge_between_matches_exact_pair() {
        let a = Guid::new();
        let b = Guid::new();
        let input = PortRef::input(b, "In");
        let output = PortRef::output(a, "Out");
        let edges = vec![Edge::new(input.clone(), output.clone())];
        let conns = Connections::new(&edges);

        assert_eq!(conns.edge_between(&input, &output).map(|e| e.guid), Some(edges[0].guid));
        assert!(conns.edge_between(&PortRef::input(b, "Other"), &output).is_none());
        assert_eq!(conns.position(edges[0].guid), Some(0));
    }
}
