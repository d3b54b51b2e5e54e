// src/constants.rs

/// The name of the directory holding fanrun configuration (inside the system config dir).
pub const APP_DIR_NAME: &str = "fanrun";

/// The name of the optional configuration file (inside the fanrun config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that points to an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "FANRUN_CONFIG";

/// Upper bound on the number of items a single range expression may produce.
pub const MAX_RANGE_ITEMS: usize = 1_000_000;

/// How many spawned-but-unfinished workers are allowed per execution slot.
pub const BACKLOG_PER_SLOT: usize = 4;

/// Exit code used when the run is interrupted by the user (Ctrl+C).
pub const EXIT_INTERRUPTED: i32 = 130;
