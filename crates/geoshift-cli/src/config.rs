use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geoshift_migrate::ReferenceSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG: &str = "geoshift.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown environment '{name}' (configured: {known})")]
    UnknownEnvironment { name: String, known: String },
}

/// Contents of `geoshift.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoshiftConfig {
    #[serde(default = "default_environment")]
    pub default_environment: String,
    /// Directory receiving one sub-directory per run.
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
    #[serde(default = "default_environments")]
    pub environments: BTreeMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Reference tables reloaded by `refresh`, in order.
    #[serde(default)]
    pub reference: Vec<ReferenceSource>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Workspace snapshot file.
    pub workspace: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_plan_path")]
    pub plan: PathBuf,
    #[serde(default = "default_rules_path")]
    pub rules: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            plan: default_plan_path(),
            rules: default_rules_path(),
        }
    }
}

impl Default for GeoshiftConfig {
    fn default() -> Self {
        Self {
            default_environment: default_environment(),
            run_dir: default_run_dir(),
            environments: default_environments(),
            paths: PathsConfig::default(),
            reference: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

/// Environment after selector resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    pub name: String,
    pub workspace: PathBuf,
}

impl GeoshiftConfig {
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: GeoshiftConfig = toml::from_str(content)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Resolve the environment selector; unknown names are rejected before
    /// any workspace is opened.
    pub fn environment(&self, selector: Option<&str>) -> Result<ResolvedEnvironment, ConfigError> {
        let name = selector.unwrap_or(&self.default_environment);
        let environment =
            self.environments
                .get(name)
                .ok_or_else(|| ConfigError::UnknownEnvironment {
                    name: name.to_string(),
                    known: self
                        .environments
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", "),
                })?;
        Ok(ResolvedEnvironment {
            name: name.to_string(),
            workspace: self.resolve(&environment.workspace),
        })
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Load `path`, or `geoshift.toml` when it exists, or built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<GeoshiftConfig, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    if !required && !path.exists() {
        return Ok(GeoshiftConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    GeoshiftConfig::parse(&content, base_dir)
}

fn default_environment() -> String {
    "local".to_string()
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_environments() -> BTreeMap<String, EnvironmentConfig> {
    BTreeMap::from([(
        "local".to_string(),
        EnvironmentConfig {
            workspace: PathBuf::from("workspace.json"),
        },
    )])
}

fn default_plan_path() -> PathBuf {
    PathBuf::from("migration.json")
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules/rules.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_environment = "dev"
run_dir = "artifacts/runs"

[environments.local]
workspace = "workspaces/local.json"

[environments.dev]
workspace = "/srv/geoshift/dev.json"

[paths]
plan = "plans/migration.json"

[[reference]]
table = "Counties"
source = "sgid://UtahCountyBoundaries/0"
"#;

    #[test]
    fn parses_environments_and_resolves_relative_paths() {
        let config = GeoshiftConfig::parse(SAMPLE, Path::new("/etc/geoshift")).expect("parse");

        let dev = config.environment(None).expect("default environment");
        assert_eq!(dev.name, "dev");
        assert_eq!(dev.workspace, PathBuf::from("/srv/geoshift/dev.json"));

        let local = config.environment(Some("local")).expect("local");
        assert_eq!(
            local.workspace,
            PathBuf::from("/etc/geoshift/workspaces/local.json")
        );

        assert_eq!(config.paths.plan, PathBuf::from("plans/migration.json"));
        assert_eq!(config.paths.rules, PathBuf::from("rules/rules.json"));
        assert_eq!(config.reference.len(), 1);
        assert_eq!(config.reference[0].table, "Counties");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let config = GeoshiftConfig::parse(SAMPLE, Path::new(".")).expect("parse");

        let err = config.environment(Some("prod")).expect_err("unknown");
        assert!(matches!(err, ConfigError::UnknownEnvironment { ref name, .. } if name == "prod"));
        assert!(err.to_string().contains("dev, local"));
    }

    #[test]
    fn defaults_provide_a_local_environment() {
        let config = GeoshiftConfig::default();
        let local = config.environment(None).expect("local");
        assert_eq!(local.workspace, PathBuf::from("./workspace.json"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(GeoshiftConfig::parse("colour = \"blue\"", Path::new(".")).is_err());
    }
}
