/// Defaults and environment variable names

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "syskit";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_REFRESH_INTERVAL: &str = "1s";
pub const DEFAULT_DISPLAY_LIMIT: usize = 30;
pub const DEFAULT_KILL_COMMAND: &str = "kill -9 {pid}";
pub const DEFAULT_DISK_MOUNT: &str = "/";
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_THRESHOLD: f64 = 90.0;

/// Log file path; logging is off when unset
pub const LOG_PATH_ENV: &str = "SYSKIT_LOG_PATH";
/// Log level filter (error, warn, info, debug, trace)
pub const LOG_LEVEL_ENV: &str = "SYSKIT_LOG";

/// Gauges switch to the warning colour at this fraction of their threshold
pub const WARN_FRACTION: f64 = 0.75;
