// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory model of a node-graph editor.
//!
//! This crate owns the data behind a visual scripting canvas:
//! - Nodes with typed input/output ports
//! - Ordered edges between ports
//! - Sticky notes and placemats
//! - Graph variable and edge portal declarations
//!
//! ## Architecture
//!
//! [`GraphModel`] is the only mutator. Every operation validates before it
//! touches the graph and records what it did in a [`ChangeList`] that views
//! drain to refresh incrementally. Identity is handled by [`Guid`]s, with a
//! [`GuidRegistry`] reassigning identifiers when documents are loaded or
//! fragments pasted. Node and literal types come from a [`Stencil`].

pub mod annotation;
pub mod change_list;
pub mod clipboard;
pub mod config;
pub mod declaration;
pub mod edge;
pub mod error;
pub mod graph;
pub mod guid;
pub mod integrity;
pub mod library;
pub mod node;
pub mod persistence;
pub mod port;
pub mod resolver;
pub mod stencil;

pub use annotation::{Placemat, Rect, StickyNote};
pub use change_list::ChangeList;
pub use clipboard::ClipboardContent;
pub use config::GraphSettings;
pub use declaration::{Modifiers, VariableDeclaration, VariableKind};
pub use edge::Edge;
pub use error::{GraphError, Result};
pub use graph::{DeleteConnections, GraphModel, ReorderType, SpawnFlags, Spawned};
pub use guid::{Guid, GuidRegistry, GuidRemap};
pub use integrity::{IntegrityReport, IntegrityViolation, Verbosity};
pub use node::{Node, NodeKind, NodeRegistry, NodeType, PortalRole};
pub use persistence::GraphDocument;
pub use port::{ConstantValue, FlowKind, Port, PortDirection, PortRef, PortType};
pub use resolver::Connections;
pub use stencil::{BasicStencil, Stencil};
