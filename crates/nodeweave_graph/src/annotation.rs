// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sticky notes and placemats.

use crate::guid::{Guid, GuidRemap, GuidUpdate};
use serde::{Deserialize, Serialize};

/// Position and size of a free-floating element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a rect
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Same size, moved by `delta`
    pub fn translated(self, delta: [f32; 2]) -> Self {
        Self {
            x: self.x + delta[0],
            y: self.y + delta[1],
            ..self
        }
    }
}

/// A free-floating text note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNote {
    /// Unique ID
    pub guid: Guid,
    /// Position and size
    pub rect: Rect,
    /// Title
    pub title: String,
    /// Body text
    pub contents: String,
    /// Theme name
    #[serde(default)]
    pub theme: String,
    /// Set once the note has been deleted
    #[serde(default)]
    pub destroyed: bool,
}

impl StickyNote {
    /// Create a note with a fresh ID
    pub fn new(rect: Rect) -> Self {
        Self {
            guid: Guid::new(),
            rect,
            title: String::new(),
            contents: String::new(),
            theme: String::new(),
            destroyed: false,
        }
    }
}

impl GuidUpdate for StickyNote {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn assign_guid(&mut self, guid: Guid) {
        self.guid = guid;
    }
}

/// A background rectangle grouping other elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemat {
    /// Unique ID
    pub guid: Guid,
    /// Position and size
    pub rect: Rect,
    /// Title
    pub title: String,
    /// Color (RGB)
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Stacking order; higher draws on top
    pub z_order: i32,
    /// Whether the placemat is collapsed
    #[serde(default)]
    pub collapsed: bool,
    /// Elements hidden while collapsed
    #[serde(default)]
    pub hidden_elements: Vec<Guid>,
    /// Set once the placemat has been deleted
    #[serde(default)]
    pub destroyed: bool,
}

impl Placemat {
    /// Create a placemat with a fresh ID
    pub fn new(title: impl Into<String>, rect: Rect, z_order: i32) -> Self {
        Self {
            guid: Guid::new(),
            rect,
            title: title.into(),
            color: None,
            z_order,
            collapsed: false,
            hidden_elements: Vec::new(),
            destroyed: false,
        }
    }
}

impl GuidUpdate for Placemat {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn assign_guid(&mut self, guid: Guid) {
        self.guid = guid;
    }

    fn remap_references(&mut self, remap: &GuidRemap) {
        for hidden in &mut self.hidden_elements {
            if let Some(new) = remap.resolve(hidden) {
                *hidden = new;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placemat_rewrites_hidden_elements() {
        let kept = Guid::new();
        let moved = Guid::new();
        let target = Guid::new();
        let mut placemat = Placemat::new("Group", Rect::default(), 1);
        placemat.hidden_elements = vec![kept, moved];

        let mut remap = GuidRemap::new();
        remap.insert(moved.token(), target);
        placemat.remap_references(&remap);

        assert_eq!(placemat.hidden_elements, vec![kept, target]);
    }

    #[test]
    fn test_rect_translation_keeps_size() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0).translated([5.0, -5.0]);
        assert_eq!(rect, Rect::new(15.0, 15.0, 100.0, 50.0));
    }
}
