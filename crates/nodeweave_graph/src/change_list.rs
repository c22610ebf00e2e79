// SPDX-License-Identifier: MIT OR Apache-2.0
//! Summary of mutations since the last reset, consumed by view refresh.

use crate::edge::Edge;
use crate::guid::Guid;

/// What changed during one editing cycle.
///
/// This is a lossy summary for incremental redraw, not an undo log; graph
/// correctness never depends on it.
#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    /// Edges removed from the graph
    pub deleted_edges: Vec<Edge>,
    /// Elements created or modified, in insertion order (duplicates allowed)
    pub changed_elements: Vec<Guid>,
    /// Elements the view should auto-align
    pub elements_to_auto_align: Vec<Guid>,
    /// Number of deleted elements
    pub deleted_elements: usize,
    /// The declaration panel needs a refresh
    pub declarations_changed: bool,
    /// The view must be rebuilt from scratch
    pub requires_rebuild: bool,
}

impl ChangeList {
    /// Create an empty change list
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything structural changed
    pub fn has_any_topology_change(&self) -> bool {
        self.declarations_changed || self.deleted_elements > 0 || !self.changed_elements.is_empty()
    }

    /// Record a changed element
    pub fn mark_changed(&mut self, guid: Guid) {
        self.changed_elements.push(guid);
    }

    /// Whether an element was recorded as changed
    pub fn contains_changed(&self, guid: Guid) -> bool {
        self.changed_elements.contains(&guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_no_topology_change() {
        assert!(!ChangeList::new().has_any_topology_change());
    }

    #[test]
    fn test_each_signal_counts_as_topology_change() {
        let mut list = ChangeList::new();
        list.declarations_changed = true;
        assert!(list.has_any_topology_change());

        let mut list = ChangeList::new();
        list.deleted_elements = 1;
        assert!(list.has_any_topology_change());

        let mut list = ChangeList::new();
        list.mark_changed(Guid::new());
        assert!(list.has_any_topology_change());
    }

    #[test]
    fn test_rebuild_flag_alone_is_not_topology_change() {
        let list = ChangeList {
            requires_rebuild: true,
            ..ChangeList::default()
        };
        assert!(!list.has_any_topology_change());
    }
}
