// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.

use crate::guid::{Guid, GuidUpdate};
use crate::port::PortRef;
use serde::{Deserialize, Serialize};

/// A connection from an output port to an input port.
///
/// Endpoints are stored as port addresses, not live references, so an edge
/// survives its nodes being replaced by equivalent copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub guid: Guid,
    /// Input (destination) port
    pub input: PortRef,
    /// Output (source) port
    pub output: PortRef,
    /// Optional label
    #[serde(default)]
    pub label: String,
}

impl Edge {
    /// Create a new edge with a fresh ID
    pub fn new(input: PortRef, output: PortRef) -> Self {
        Self {
            guid: Guid::new(),
            input,
            output,
            label: String::new(),
        }
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node: Guid) -> bool {
        self.input.node == node || self.output.node == node
    }

    /// Check if this edge involves a specific port
    pub fn involves_port(&self, port: &PortRef) -> bool {
        self.input == *port || self.output == *port
    }

    /// Whether this edge connects exactly this pair
    pub fn connects(&self, input: &PortRef, output: &PortRef) -> bool {
        self.input == *input && self.output == *output
    }

    /// The endpoint opposite to `port`
    pub fn peer_of(&self, port: &PortRef) -> Option<&PortRef> {
        if self.input == *port {
            Some(&self.output)
        } else if self.output == *port {
            Some(&self.input)
        } else {
            None
        }
    }
}

impl GuidUpdate for Edge {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn assign_guid(&mut self, guid: Guid) {
        self.guid = guid;
    }
}
