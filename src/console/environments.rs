//! Named environments of administration service endpoints, kept in a TOML file
//!
//! ```toml
//! [[environment]]
//! name = "production"
//!
//! [[environment.clusters]]
//! name = "web"
//! uri = "https://cache-admin.example.net"
//! user_name = "CORP\\ops"
//! token = "..."
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_ENVIRONMENTS_FILE: &str = "environments.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    pub name: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub clusters: Vec<ClusterEndpoint>,
}

impl Environment {
    pub fn cluster(&self, name: &str) -> Option<&ClusterEndpoint> {
        self.clusters
            .iter()
            .find(|cluster| cluster.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EnvironmentFile {
    #[serde(default, rename = "environment")]
    environments: Vec<Environment>,
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize environments: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("environment name must not be empty")]
    EmptyName,
    #[error("environment {0} not found")]
    UnknownEnvironment(String),
    #[error("cluster {cluster} not found in environment {environment}")]
    UnknownCluster { environment: String, cluster: String },
}

/// Every mutation is written back to disk before returning.
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    path: PathBuf,
}

impl EnvironmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as no environments.
    pub fn all(&self) -> Result<Vec<Environment>, EnvironmentError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "environment file not found");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| EnvironmentError::Read {
            path: self.path.clone(),
            source,
        })?;
        let file: EnvironmentFile =
            toml::from_str(&content).map_err(|source| EnvironmentError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(file.environments)
    }

    pub fn get(&self, name: &str) -> Result<Environment, EnvironmentError> {
        self.all()?
            .into_iter()
            .find(|environment| environment.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EnvironmentError::UnknownEnvironment(name.to_string()))
    }

    /// Replaces an environment with the same name, otherwise appends it.
    pub fn add_or_update(&self, environment: Environment) -> Result<(), EnvironmentError> {
        if environment.name.trim().is_empty() {
            return Err(EnvironmentError::EmptyName);
        }

        let mut environments = self.all()?;
        match environments
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&environment.name))
        {
            Some(existing) => *existing = environment.clone(),
            None => environments.push(environment.clone()),
        }

        self.save(environments)?;
        info!(environment = %environment.name, clusters = environment.clusters.len(), "environment saved");
        Ok(())
    }

    /// Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> Result<bool, EnvironmentError> {
        let mut environments = self.all()?;
        let before = environments.len();
        environments.retain(|environment| !environment.name.eq_ignore_ascii_case(name));
        if environments.len() == before {
            return Ok(false);
        }

        self.save(environments)?;
        info!(environment = %name, "environment removed");
        Ok(true)
    }

    pub fn find_cluster(
        &self,
        environment: &str,
        cluster: &str,
    ) -> Result<ClusterEndpoint, EnvironmentError> {
        self.get(environment)?
            .cluster(cluster)
            .cloned()
            .ok_or_else(|| EnvironmentError::UnknownCluster {
                environment: environment.to_string(),
                cluster: cluster.to_string(),
            })
    }

    fn save(&self, environments: Vec<Environment>) -> Result<(), EnvironmentError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EnvironmentError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(&EnvironmentFile { environments })?;
        std::fs::write(&self.path, content).map_err(|source| EnvironmentError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
