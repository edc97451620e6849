// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and log targets)
pub const APP_NAME_LOWER: &str = "trace_ingest";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".trace-ingest";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "trace-ingest.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACE_INGEST_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACE_INGEST_LOG";

// =============================================================================
// Args Parsing
// =============================================================================

/// Environment variable for the maximum message nesting depth
pub const ENV_ARGS_MAX_DEPTH: &str = "TRACE_INGEST_ARGS_MAX_DEPTH";

/// Environment variable for descriptor set paths (comma separated)
pub const ENV_DESCRIPTOR_SETS: &str = "TRACE_INGEST_DESCRIPTOR_SETS";

/// Default maximum message nesting depth
pub const DEFAULT_ARGS_MAX_DEPTH: usize = 64;

// =============================================================================
// Output
// =============================================================================

/// Environment variable for pretty-printed JSON output
pub const ENV_OUTPUT_PRETTY: &str = "TRACE_INGEST_PRETTY";
