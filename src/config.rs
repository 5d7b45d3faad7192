//! The two-part switch that gates every correction.
//!
//! Fixing applies only when the Bek ordering is in use *and* the fix setting is
//! on. Both are plain values passed in at construction; nothing here reads
//! global state.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Settings key for applying the fix.
pub const FIX_MERGE_PARENTS_KEY: &str = "git.log.fix.merge.commits.parents.order";

/// Settings key for the Bek commit ordering.
pub const BEK_SORT_KEY: &str = "vcs.log.bek.sort";

fn enabled() -> bool {
    true
}

/// Feature switches for merge-parent correction.
///
/// Deserializes from a flat JSON settings object; unrelated keys are ignored
/// and missing keys default to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixConfig {
    /// The Bek ordering is in use, so its parent-order defect can occur.
    #[serde(rename = "vcs.log.bek.sort", default = "enabled")]
    pub bek_enabled: bool,

    /// Apply the correction.
    #[serde(rename = "git.log.fix.merge.commits.parents.order", default = "enabled")]
    pub fix_merge_parents_order: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            bek_enabled: true,
            fix_merge_parents_order: true,
        }
    }
}

impl FixConfig {
    /// Both switches off.
    pub fn disabled() -> Self {
        Self {
            bek_enabled: false,
            fix_merge_parents_order: false,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.bek_enabled && self.fix_merge_parents_order
    }

    /// Read switches from a JSON settings file.
    pub fn load(path: &Path) -> Result<Self, crate::FixerError> {
        let settings_error = |message: String| crate::FixerError::Settings {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| settings_error(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| settings_error(e.to_string()))
    }
}
