// src/infra/paths.rs — Config location
//
// GLITCHSCAN_HOME overrides everything. Otherwise the config lives in
// ~/.glitchscan/. Run artifacts (output, checkpoints) are always relative to
// the working directory unless configured otherwise.

use std::path::PathBuf;

/// Returns the GLITCHSCAN_HOME override, if set.
fn glitchscan_home() -> Option<PathBuf> {
    std::env::var_os("GLITCHSCAN_HOME").map(PathBuf::from)
}

/// Configuration directory: $GLITCHSCAN_HOME/ or ~/.glitchscan/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = glitchscan_home() {
        return Some(home);
    }
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".glitchscan"))
}

/// Config file path, `None` when no home directory can be determined.
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Default folder for intermediate results.
pub fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("intermediate_results")
}

/// Default result file.
pub fn default_output_path() -> PathBuf {
    PathBuf::from("glitch_tokens.csv")
}
