//! Project configuration (`config.json`).
//!
//! Every remote command needs the project's `config.json`: it names the
//! project code, the admin password and where the objectum service listens.
//! It is looked up in the current directory, then in its parent.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "config.json";

/// User the client authenticates as.
pub const ADMIN_USERNAME: &str = "admin";

/// Where the objectum service listens.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ObjectumEndpoint {
    pub host: String,
    pub port: u16,
}

/// The parts of a project's `config.json` this client uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project code, part of the service URL
    pub code: String,
    /// Password of the `admin` user
    pub admin_password: String,
    pub objectum: ObjectumEndpoint,
    /// Directory holding `config.json`
    #[serde(skip)]
    pub root: PathBuf,
}

impl ProjectConfig {
    /// Find `config.json` in `dir` or `dir/..` and load it.
    pub fn discover(dir: &Path) -> ConfigResult<Self> {
        let candidates = [dir.join(CONFIG_FILE), dir.join("..").join(CONFIG_FILE)];

        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::NotFound {
                dir: dir.to_path_buf(),
            })?;

        Self::load(path)
    }

    /// Load an explicit configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: ProjectConfig = serde_json::from_str(&content)?;
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Resolve from an explicit path, or by discovery from the working directory.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
                    path: PathBuf::from("."),
                    source,
                })?;
                Self::discover(&cwd)
            }
        }
    }

    /// Project endpoint of the objectum service.
    pub fn url(&self) -> String {
        format!(
            "http://{}:{}/projects/{}/",
            self.objectum.host, self.objectum.port, self.code
        )
    }

    /// Where record attachments are stored.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("public").join("files")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = r#"{
        "code": "shop",
        "rootDir": "/opt/objectum/projects/shop",
        "adminPassword": "D033E22AE348AEB5660FC2140AEC35850C4DA997",
        "port": 3100,
        "objectum": {"host": "127.0.0.1", "port": 8200}
    }"#;

    #[test]
    fn test_discover_in_current_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), CONFIG).unwrap();

        let config = ProjectConfig::discover(dir.path()).unwrap();
        assert_eq!(config.code, "shop");
        assert_eq!(config.url(), "http://127.0.0.1:8200/projects/shop/");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_discover_in_parent_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), CONFIG).unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();

        let config = ProjectConfig::discover(&bin).unwrap();
        assert_eq!(config.objectum.port, 8200);
        assert!(config.files_dir().ends_with("public/files"));
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir(&nested).unwrap();

        let err = ProjectConfig::discover(&nested).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_missing_required_key() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{"code": "shop"}"#).unwrap();

        let err = ProjectConfig::discover(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
