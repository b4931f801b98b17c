// src/infra/paths.rs — Config and data path management
//
// All paths respect the PARLAY_HOME environment variable for isolation.
// When unset, everything lives under ~/.parlay/.

use std::path::PathBuf;

/// Returns the PARLAY_HOME override, if set.
fn parlay_home() -> Option<PathBuf> {
    std::env::var_os("PARLAY_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the working directory when it cannot be determined.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $PARLAY_HOME/ or ~/.parlay/
pub fn config_dir() -> PathBuf {
    if let Some(home) = parlay_home() {
        return home;
    }
    dirs_home().join(".parlay")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// User scenario directory (extra `*.toml` scenario definitions)
pub fn scenarios_dir() -> PathBuf {
    config_dir().join("scenarios")
}
