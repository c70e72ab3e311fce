/// Constants used throughout the saveback codebase
// Application directory name under the XDG data root
pub const APP_DIR_NAME: &str = "saveback";

// Default directory component that groups dataset files under the root
pub const DEFAULT_DATA_DIR: &str = "datasets";

// Suffix appended to a target path while its replacement is being written
pub const TMP_SUFFIX: &str = ".tmp";

// Environment variable names
pub const SAVEBACK_ROOT_VAR: &str = "SAVEBACK_ROOT";
pub const SAVEBACK_LOG_VAR: &str = "SAVEBACK_LOG";
