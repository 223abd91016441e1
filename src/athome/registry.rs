//! Known-remote registry
//!
//! This module keeps track of the remotes userspace has told us about,
//! whether each one is bound (has a long term key) or still in bind mode,
//! and whether the registry as a whole is accepting new remotes. The
//! registry can be persisted to a JSON file for reuse across restarts.

use crate::athome::constants::AAH_BT_LTK_SZ;
use crate::athome::types::MacAddr;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to write registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode registry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A remote userspace has added or asked us to bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownRemote {
    pub mac: MacAddr,

    /// Still waiting for the bind exchange to complete
    #[serde(default)]
    pub bind_mode: bool,

    /// Long term key handed to the link layer for encryption
    #[serde(default)]
    pub ltk: [u8; AAH_BT_LTK_SZ],
}

impl KnownRemote {
    pub fn is_bound(&self) -> bool {
        !self.bind_mode
    }
}

/// Registry storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownRegistry {
    /// Map of MAC address -> remote info
    pub remotes: HashMap<MacAddr, KnownRemote>,

    /// Registry-wide bind mode, set by userspace; not persisted
    #[serde(skip)]
    bind_mode: bool,
}

impl KnownRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from disk, starting empty if the file is missing or unreadable
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(registry) => {
                    debug!("Loaded remote registry from: {}", path.display());
                    registry
                }
                Err(e) => {
                    warn!("Failed to parse registry file: {}", e);
                    Self::new()
                }
            },
            Err(_) => {
                debug!("No existing registry file found at: {}", path.display());
                Self::new()
            }
        }
    }

    /// Save the registry to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RegistryError> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!("Saved remote registry to: {}", path.display());
        Ok(())
    }

    /// Add or update a bound remote
    pub fn add_bound(&mut self, mac: MacAddr, ltk: [u8; AAH_BT_LTK_SZ]) {
        info!("Registering bound remote: {}", mac);
        self.remotes.insert(
            mac,
            KnownRemote {
                mac,
                bind_mode: false,
                ltk,
            },
        );
    }

    /// Register a remote we want to bind to; keeps an existing key if there is one
    pub fn add_binding(&mut self, mac: MacAddr) {
        info!("Registering remote for binding: {}", mac);
        self.remotes
            .entry(mac)
            .and_modify(|r| r.bind_mode = true)
            .or_insert(KnownRemote {
                mac,
                bind_mode: true,
                ltk: [0; AAH_BT_LTK_SZ],
            });
    }

    /// Look up a remote by address
    pub fn find(&self, mac: &MacAddr) -> Option<&KnownRemote> {
        self.remotes.get(mac)
    }

    /// Remove a remote
    pub fn remove(&mut self, mac: &MacAddr) -> Option<KnownRemote> {
        self.remotes.remove(mac)
    }

    pub fn set_bind_mode(&mut self, enabled: bool) {
        if self.bind_mode != enabled {
            info!("Registry bind mode: {}", if enabled { "ON" } else { "OFF" });
        }
        self.bind_mode = enabled;
    }

    /// Whether userspace is currently accepting new remotes
    pub fn in_bind_mode(&self) -> bool {
        self.bind_mode
    }

    /// Get the number of known remotes
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// List all known remotes
    pub fn list_all(&self) -> Vec<&KnownRemote> {
        self.remotes.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr([last, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA])
    }

    #[test]
    fn test_registry_basic_operations() {
        let mut registry = KnownRegistry::new();
        assert!(registry.is_empty());

        registry.add_bound(mac(1), [7; AAH_BT_LTK_SZ]);
        assert_eq!(registry.len(), 1);

        let remote = registry.find(&mac(1)).unwrap();
        assert!(remote.is_bound());
        assert_eq!(remote.ltk, [7; AAH_BT_LTK_SZ]);

        assert!(registry.remove(&mac(1)).is_some());
        assert!(registry.find(&mac(1)).is_none());
    }

    #[test]
    fn test_binding_then_bound() {
        let mut registry = KnownRegistry::new();

        registry.add_binding(mac(2));
        assert!(registry.find(&mac(2)).unwrap().bind_mode);

        registry.add_bound(mac(2), [1; AAH_BT_LTK_SZ]);
        let remote = registry.find(&mac(2)).unwrap();
        assert!(!remote.bind_mode);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bind_mode_flag() {
        let mut registry = KnownRegistry::new();
        assert!(!registry.in_bind_mode());
        registry.set_bind_mode(true);
        assert!(registry.in_bind_mode());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "athome_registry_test_{}.json",
            std::process::id()
        ));

        let mut registry = KnownRegistry::new();
        registry.add_bound(mac(3), [9; AAH_BT_LTK_SZ]);
        registry.add_binding(mac(4));
        registry.set_bind_mode(true);
        registry.save(&path).unwrap();

        let loaded = KnownRegistry::load(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.find(&mac(3)).unwrap().ltk, [9; AAH_BT_LTK_SZ]);
        assert!(loaded.find(&mac(4)).unwrap().bind_mode);
        // bind mode is a runtime setting only
        assert!(!loaded.in_bind_mode());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let registry = KnownRegistry::load("/nonexistent/dir/athome_registry.json");
        assert!(registry.is_empty());
    }
}
