//! Shared environment configuration for the CLI binaries.
//!
//! `COLLAPSI_BASE_PATH` (default `"."`) is the single working-directory
//! knob: every binary chdirs there first so the default `data/` paths land
//! in one place.

use std::path::PathBuf;

/// Read `COLLAPSI_BASE_PATH`, chdir, print the result. Exits on failure.
pub fn init_base_path() -> PathBuf {
    let base_path = std::env::var("COLLAPSI_BASE_PATH").unwrap_or_else(|_| ".".to_string());
    if std::env::set_current_dir(&base_path).is_err() {
        eprintln!("Failed to change directory to {}", base_path);
        std::process::exit(1);
    }
    PathBuf::from(&base_path)
}

/// Default location of a data file, relative to the base path.
pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from("data").join(name)
}

/// Default solved database path.
pub fn default_db_path() -> PathBuf {
    data_path("solved_norm.db")
}

/// Default index file path.
pub fn default_index_path() -> PathBuf {
    data_path("norm_index.db")
}
