//! Process-wide feature flag store.
//!
//! Readers take a snapshot at the start of a call and never hold the lock
//! across an await, so a concurrent update only affects calls issued after it.

use std::sync::RwLock;
use tracing::info;
use unimem_types::config::{FeatureFlags, FeatureFlagsUpdate};

pub struct FeatureFlagStore {
    flags: RwLock<FeatureFlags>,
}

impl FeatureFlagStore {
    pub fn new(flags: FeatureFlags) -> Self {
        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Copy of the current flags.
    pub fn snapshot(&self) -> FeatureFlags {
        self.flags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply a partial update and return the resulting flags.
    pub fn update(&self, update: &FeatureFlagsUpdate) -> FeatureFlags {
        let mut flags = self.flags.write().unwrap_or_else(|e| e.into_inner());
        update.apply(&mut flags);
        info!(flags = ?*flags, "Feature flags updated");
        flags.clone()
    }
}

impl Default for FeatureFlagStore {
    fn default() -> Self {
        Self::new(FeatureFlags::default())
    }
}
