//! Explicit configuration threaded through `ExecContext`, replacing the
//! original's `g_configuration` global (spec.md §6 "Configuration";
//! SPEC_FULL.md DESIGN NOTES).

use fxhash::FxHashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Ordered search path for the (out-of-scope) library-node loader;
    /// carried here only as configuration state, since the loader itself
    /// is an external collaborator.
    pub library_search_path: Vec<PathBuf>,
    pub resource_hierarchy_file: Option<PathBuf>,
    pub debug: DebugConfig,
}

/// Named debug categories, gated per spec.md §7 ("Exec debug messages are
/// gated by named categories") so a disabled category costs only a flag
/// check.
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    enabled: FxHashMap<&'static str, bool>,
}

impl DebugConfig {
    pub fn enable(&mut self, category: &'static str) {
        self.enabled.insert(category, true);
    }

    pub fn disable(&mut self, category: &'static str) {
        self.enabled.insert(category, false);
    }

    pub fn is_enabled(&self, category: &str) -> bool {
        self.enabled.get(category).copied().unwrap_or(false)
    }
}

/// Emit a debug-level log line only if `$category` is enabled in
/// `$ctx.config.debug`, avoiding the formatting cost otherwise.
#[macro_export]
macro_rules! plexil_debug {
    ($config:expr, $category:expr, $($arg:tt)*) => {
        if $config.debug.is_enabled($category) {
            log::debug!("[{}] {}", $category, format!($($arg)*));
        }
    };
}
