// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph model operations.

use crate::guid::Guid;
use crate::port::PortRef;

/// Errors returned by [`GraphModel`](crate::GraphModel) operations.
///
/// Every variant is raised before any structural change is made, so a failed
/// call leaves the graph exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The requested type is neither a literal-value type nor a node type
    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    /// No literal-value type is registered for a data type
    #[error("No constant type for data type {0}")]
    NoConstantType(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(Guid),

    /// Edge not found
    #[error("Edge not found: {0}")]
    EdgeNotFound(Guid),

    /// Port not found on its node
    #[error("Port not found: {0}")]
    PortNotFound(PortRef),

    /// Port used in the wrong slot of an edge
    #[error("Port {0} has the wrong direction for this operation")]
    WrongDirection(PortRef),

    /// Sticky note not found
    #[error("Sticky note not found: {0}")]
    StickyNoteNotFound(Guid),

    /// Placemat not found
    #[error("Placemat not found: {0}")]
    PlacematNotFound(Guid),

    /// An element with this ID already exists
    #[error("Duplicate element ID: {0}")]
    DuplicateGuid(Guid),

    /// Declaration not found
    #[error("Declaration not found: {0}")]
    DeclarationNotFound(Guid),

    /// Node is not an edge portal
    #[error("Node is not an edge portal: {0}")]
    NotAPortal(Guid),

    /// Failed to read or write a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a graph or settings
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// Failed to parse a graph or settings
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] ron::error::SpannedError),
}

/// Result type for graph model operations
pub type Result<T> = std::result::Result<T, GraphError>;
