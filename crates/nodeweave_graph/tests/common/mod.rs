// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared helpers for integration tests.

#![allow(dead_code)]

use nodeweave_graph::library::create_scripting_registry;
use nodeweave_graph::{BasicStencil, GraphModel, Guid, SpawnFlags};

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodeweave_graph=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Stencil with the built-in scripting node types
pub fn stencil() -> BasicStencil {
    BasicStencil::new(create_scripting_registry())
}

/// Empty graph over the scripting stencil
pub fn graph() -> GraphModel {
    init_tracing();
    GraphModel::new("test", stencil())
}

/// Create a registered node at `position`
pub fn spawn(graph: &mut GraphModel, type_id: &str, position: [f32; 2]) -> Guid {
    graph
        .create_node(type_id, "", position, SpawnFlags::Default, None)
        .expect("node type is registered")
        .guid()
}
