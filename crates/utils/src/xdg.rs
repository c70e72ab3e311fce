use saveback_core::APP_DIR_NAME;
use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for saveback
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_DATA_HOME/saveback or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join(APP_DIR_NAME)
    }

    /// Get XDG_STATE_HOME/saveback or fallback
    pub fn state_dir() -> PathBuf {
        env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/state"))
                    .unwrap_or_else(|| PathBuf::from(".local/state"))
            })
            .join(APP_DIR_NAME)
    }
}
