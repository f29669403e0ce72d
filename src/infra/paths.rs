// src/infra/paths.rs — Config path resolution
//
// KOI_REFINE_HOME overrides everything. Otherwise config lives in ~/.koi-refine/.

use std::path::PathBuf;

/// Returns the KOI_REFINE_HOME override, if set.
fn refine_home() -> Option<PathBuf> {
    std::env::var_os("KOI_REFINE_HOME").map(PathBuf::from)
}

/// Configuration directory, or None when no home directory can be determined.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = refine_home() {
        return Some(home);
    }
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".koi-refine"))
}

/// Config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
