//! Workspace Migrator
//!
//! Replays a project-management export into a target workspace:
//! - Export adapter serving one collection per entity kind
//! - Remote API client for the target workspace
//! - Phased pipeline with bounded concurrency and a shared identifier map
//! - Progress events and a per-phase report

pub mod error;
pub mod events;
pub mod export;
pub mod migration;
pub mod model;
pub mod remote;

use error::MigrationError;
use migration::limiter::DEFAULT_CONCURRENCY;
use migration::RunSettings;
use model::TargetId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub target: TargetYamlConfig,
    pub migration: MigrationYamlConfig,
    pub export: ExportYamlConfig,
}

/// Target workspace section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetYamlConfig {
    pub api_url: String,
    pub organization_id: Option<String>,
    pub access_token: Option<String>,
}

impl Default for TargetYamlConfig {
    fn default() -> Self {
        Self {
            api_url: remote::http::DEFAULT_API_URL.into(),
            organization_id: None,
            access_token: None,
        }
    }
}

/// Pipeline tuning section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationYamlConfig {
    pub concurrency: usize,
}

impl Default for MigrationYamlConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Source export section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportYamlConfig {
    pub path: String,
}

impl Default for ExportYamlConfig {
    fn default() -> Self {
        Self {
            path: "export.json".into(),
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Target organization; required before a run can start
    pub organization_id: Option<String>,
    pub access_token: Option<String>,
    pub concurrency: usize,
    pub export_path: PathBuf,
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default. CLI flags are applied on top by
    /// the binary.
    ///
    /// If `yaml_path` is None, tries "migrator.yaml" in CWD. If the file
    /// doesn't exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self, MigrationError> {
        let yaml = Self::load_yaml(yaml_path)?;

        let concurrency = match std::env::var("MIGRATOR_CONCURRENCY") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                MigrationError::InvalidConfig(format!(
                    "MIGRATOR_CONCURRENCY must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            Err(_) => yaml.migration.concurrency,
        };

        Ok(Self {
            api_url: std::env::var("MIGRATOR_API_URL").unwrap_or(yaml.target.api_url),
            organization_id: std::env::var("MIGRATOR_ORGANIZATION_ID")
                .ok()
                .or(yaml.target.organization_id),
            access_token: std::env::var("MIGRATOR_ACCESS_TOKEN")
                .ok()
                .or(yaml.target.access_token),
            concurrency,
            export_path: std::env::var("MIGRATOR_EXPORT_PATH")
                .unwrap_or(yaml.export.path)
                .into(),
        })
    }

    /// Validate and convert into the settings a run needs.
    pub fn run_settings(&self) -> Result<RunSettings, MigrationError> {
        let workspace = self
            .organization_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(MigrationError::MissingConfig("organization id"))?;
        if self.concurrency == 0 {
            return Err(MigrationError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(RunSettings::new(TargetId::new(workspace)).with_concurrency(self.concurrency))
    }

    /// Load and parse a YAML config file.
    ///
    /// A missing file means env vars / defaults. A file that exists but
    /// does not parse is rejected rather than silently ignored.
    fn load_yaml(yaml_path: Option<&Path>) -> Result<YamlConfig, MigrationError> {
        let default_path = Path::new("migrator.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = serde_yaml::from_str(&contents).map_err(|e| {
                    MigrationError::InvalidConfig(format!(
                        "failed to parse {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                Ok(YamlConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
target:
  api_url: http://localhost:9000/api
  organization_id: "1200"
  access_token: secret

migration:
  concurrency: 16

export:
  path: /data/export.json
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.target.api_url, "http://localhost:9000/api");
        assert_eq!(config.target.organization_id, Some("1200".into()));
        assert_eq!(config.target.access_token, Some("secret".into()));
        assert_eq!(config.migration.concurrency, 16);
        assert_eq!(config.export.path, "/data/export.json");
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.target.api_url, "https://app.asana.com/api/1.0");
        assert!(config.target.organization_id.is_none());
        assert_eq!(config.migration.concurrency, 300);
        assert_eq!(config.export.path, "export.json");
    }

    #[test]
    fn test_partial_yaml_keeps_section_defaults() {
        let yaml = r#"
target:
  organization_id: "42"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.target.organization_id, Some("42".into()));
        assert_eq!(config.target.api_url, "https://app.asana.com/api/1.0");
        assert_eq!(config.migration.concurrency, 300);
    }

    fn config(organization_id: Option<&str>, concurrency: usize) -> Config {
        Config {
            api_url: "http://localhost".into(),
            organization_id: organization_id.map(String::from),
            access_token: None,
            concurrency,
            export_path: "export.json".into(),
        }
    }

    #[test]
    fn test_run_settings_requires_organization() {
        let err = config(None, 10).run_settings().unwrap_err();
        assert!(matches!(err, MigrationError::MissingConfig(_)));

        let err = config(Some("  "), 10).run_settings().unwrap_err();
        assert!(matches!(err, MigrationError::MissingConfig(_)));
    }

    #[test]
    fn test_run_settings_rejects_zero_concurrency() {
        let err = config(Some("42"), 0).run_settings().unwrap_err();
        assert!(matches!(err, MigrationError::InvalidConfig(_)));
    }

    #[test]
    fn test_run_settings() {
        let settings = config(Some("42"), 7).run_settings().unwrap();
        assert_eq!(settings.workspace, TargetId::new("42"));
        assert_eq!(settings.concurrency, 7);
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "MIGRATOR_ORGANIZATION_ID",
                "MIGRATOR_API_URL",
                "MIGRATOR_ACCESS_TOKEN",
                "MIGRATOR_CONCURRENCY",
                "MIGRATOR_EXPORT_PATH",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
target:
  organization_id: "yaml-org"
  api_url: http://yaml-host/api
migration:
  concurrency: 12
export:
  path: yaml-export.json
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("migrator.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.organization_id, Some("yaml-org".into()));
        assert_eq!(config.api_url, "http://yaml-host/api");
        assert_eq!(config.concurrency, 12);
        assert_eq!(config.export_path, PathBuf::from("yaml-export.json"));
        assert!(config.access_token.is_none());

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("MIGRATOR_ORGANIZATION_ID", "env-org");
        std::env::set_var("MIGRATOR_CONCURRENCY", "3");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.organization_id, Some("env-org".into()));
        assert_eq!(config.concurrency, 3);
        // YAML value still used where no env override
        assert_eq!(config.api_url, "http://yaml-host/api");

        // --- Phase 3: Malformed YAML is rejected, not replaced by defaults ---
        let broken_path = dir.path().join("broken.yaml");
        std::fs::write(&broken_path, "target: [organization_id: \"x\"").unwrap();
        let err = Config::from_yaml_and_env(Some(&broken_path)).unwrap_err();
        match err {
            MigrationError::InvalidConfig(msg) => assert!(msg.contains("broken.yaml"), "got {msg}"),
            other => panic!("unexpected error: {other}"),
        }

        // --- Phase 4: Unparsable concurrency is rejected ---
        std::env::set_var("MIGRATOR_CONCURRENCY", "lots");
        let err = Config::from_yaml_and_env(Some(&file_path)).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidConfig(_)));

        clear_env();

        // --- Phase 5: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-migrator-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.concurrency, 300);
        assert!(config.organization_id.is_none());
        assert!(matches!(
            config.run_settings(),
            Err(MigrationError::MissingConfig(_))
        ));
    }
}
