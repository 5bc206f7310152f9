pub mod error;
pub mod instance;
pub mod settings;

pub use error::*;
pub use instance::{InstanceSpec, NetworkRef};
pub use settings::{CloudSettings, SettingsOverrides};

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at an instance document
pub const ENV_CONFIG: &str = "RDS_CONFIG";

const CANDIDATES: [&str; 2] = ["rds.yaml", "rds.yml"];

/// rdsflow's directory under the user configuration directory
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rdsflow"))
}

/// Locate the instance document
///
/// Search order:
/// 1. `explicit` (the `--config` flag)
/// 2. `RDS_CONFIG` environment variable
/// 3. current directory: rds.yaml, rds.yml
/// 4. `<config dir>/rdsflow/rds.yaml`
///
/// A path given explicitly or through `RDS_CONFIG` must exist; it is never
/// silently skipped.
pub fn find_instance_file(explicit: Option<&Path>) -> Result<PathBuf> {
    let from_env = std::env::var(ENV_CONFIG)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let current_dir = std::env::current_dir()?;

    search(
        explicit.map(Path::to_path_buf).or(from_env),
        &current_dir,
        config_dir().as_deref(),
    )
}

fn search(direct: Option<PathBuf>, current_dir: &Path, global: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = direct {
        return if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::FileMissing(path))
        };
    }

    for filename in CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(dir) = global {
        let path = dir.join(CANDIDATES[0]);
        if path.exists() {
            return Ok(path);
        }
    }

    Err(ConfigError::InstanceFileNotFound)
}
