//! Store configuration

use crate::serialization::{JsonSerializer, Serializer};
use saveback_core::{DEFAULT_DATA_DIR, SAVEBACK_ROOT_VAR};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a [`UserStore`](crate::store::UserStore)
#[derive(Clone)]
pub struct StoreConfig {
    /// Root directory all dataset files live under
    pub root: PathBuf,
    /// Directory component grouping dataset files under the root
    pub data_dir: String,
    /// Payload format strategy
    pub serializer: Arc<dyn Serializer>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        // Respect an explicit override, otherwise use the XDG data directory
        use saveback_utils::xdg::XdgPaths;
        let root = std::env::var(SAVEBACK_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| XdgPaths::data_dir());

        Self {
            root,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("root", &self.root)
            .field("data_dir", &self.data_dir)
            .field("serializer", &self.serializer.extension())
            .finish()
    }
}
