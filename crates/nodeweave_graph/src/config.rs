// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph model settings.

use crate::error::Result;
use crate::integrity::Verbosity;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for graph model operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Horizontal distance between a portal and its generated opposite
    pub portal_offset: f32,
    /// Vertical distance between a node and its itemized duplicate
    pub itemize_offset: f32,
    /// Title given to placemats created without one
    pub default_placemat_name: String,
    /// Verbosity used by integrity checks run after loading
    pub load_check_verbosity: Verbosity,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            portal_offset: 150.0,
            itemize_offset: 30.0,
            default_placemat_name: "Placemat".to_string(),
            load_check_verbosity: Verbosity::Errors,
        }
    }
}

impl GraphSettings {
    /// Parse settings from RON; missing fields take their defaults
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize settings to RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = GraphSettings::from_ron("(portal_offset: 200.0)").unwrap();
        assert_eq!(settings.portal_offset, 200.0);
        assert_eq!(settings.default_placemat_name, "Placemat");
    }

    #[test]
    fn test_settings_serialization() {
        let settings = GraphSettings {
            itemize_offset: 45.0,
            ..GraphSettings::default()
        };
        let ron = settings.to_ron().unwrap();
        assert_eq!(GraphSettings::from_ron(&ron).unwrap(), settings);
    }

    #[test]
    fn test_settings_file_round_trip() {
        let path = std::env::temp_dir().join(format!("nodeweave-settings-{}.ron", uuid::Uuid::new_v4()));
        let settings = GraphSettings {
            portal_offset: 90.0,
            ..GraphSettings::default()
        };
        settings.save(&path).unwrap();
        let loaded = GraphSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }
}
