use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use presets::{CONFIG_FILE, LIBRARY_FILE};

pub const ENV_CONFIG_DIR: &str = "SPRITEGEN_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "SPRITEGEN_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "SPRITEGEN_OUTPUT_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Spritegen";
const APPLICATION: &str = "spritegen";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        let config_dir = resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir())
            .context("failed to resolve spritegen config directory")?;
        let data_dir = resolve_dir(ENV_DATA_DIR, project_dirs.data_dir())
            .context("failed to resolve spritegen data directory")?;
        let default_output = project_dirs.data_dir().join("exports");
        let output_dir = resolve_dir(ENV_OUTPUT_DIR, &default_output)
            .context("failed to resolve spritegen output directory")?;

        Ok(Self {
            config_dir,
            data_dir,
            output_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Default export directory; `config.toml` and `--out-dir` take precedence.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn library_file(&self) -> PathBuf {
        self.data_dir.join(LIBRARY_FILE)
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    Ok(default.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
