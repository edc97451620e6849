use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ARGS_MAX_DEPTH};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Args parser configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ArgsFileConfig {
    pub max_depth: Option<usize>,
    pub descriptor_sets: Option<Vec<PathBuf>>,
}

/// Output configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OutputFileConfig {
    pub pretty: Option<bool>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub args: Option<ArgsFileConfig>,
    pub output: Option<OutputFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Names of top-level keys this version does not know
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(args) = other.args {
            let current = self.args.get_or_insert_with(ArgsFileConfig::default);
            if args.max_depth.is_some() {
                tracing::trace!(max_depth = ?args.max_depth, "Merging args.max_depth");
                current.max_depth = args.max_depth;
            }
            if args.descriptor_sets.is_some() {
                tracing::trace!(descriptor_sets = ?args.descriptor_sets, "Merging args.descriptor_sets");
                current.descriptor_sets = args.descriptor_sets;
            }
        }

        if let Some(output) = other.output {
            let current = self.output.get_or_insert_with(OutputFileConfig::default);
            if output.pretty.is_some() {
                tracing::trace!(pretty = ?output.pretty, "Merging output.pretty");
                current.pretty = output.pretty;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ArgsConfig {
    pub max_depth: usize,
    pub descriptor_sets: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub pretty: bool,
}

/// Final merged application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub args: ArgsConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.trace-ingest/trace-ingest.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let profile = get_profile_config_path().filter(|path| path.exists());
        Self::load_layers(cli, profile.as_deref(), Path::new(CONFIG_FILE_NAME))
    }

    fn load_layers(cli: &CliConfig, profile: Option<&Path>, local: &Path) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = profile {
            let profile_config = FileConfig::load_from_file(profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else if local.exists() {
            Some(local.to_path_buf())
        } else {
            None
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let file_args = file_config.args.unwrap_or_default();
        let file_output = file_config.output.unwrap_or_default();

        let max_depth = cli
            .max_depth
            .or(file_args.max_depth)
            .unwrap_or(DEFAULT_ARGS_MAX_DEPTH);

        let descriptor_sets = if cli.descriptor_sets.is_empty() {
            file_args.descriptor_sets.unwrap_or_default()
        } else {
            cli.descriptor_sets.clone()
        };
        let descriptor_sets = descriptor_sets
            .iter()
            .map(|path| expand_path(&path.to_string_lossy()))
            .collect();

        let pretty = cli.pretty.or(file_output.pretty).unwrap_or(false);

        let config = Self {
            args: ArgsConfig {
                max_depth,
                descriptor_sets,
            },
            output: OutputConfig { pretty },
        };
        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.args.max_depth == 0 {
            anyhow::bail!("Configuration error: args.max_depth must be greater than 0");
        }
        Ok(())
    }
}

/// Get the profile config path (~/.trace-ingest/trace-ingest.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_file_config_parse_sections() {
        let json = r#"{
            "args": { "max_depth": 16, "descriptor_sets": ["/tmp/a.pb"] },
            "output": { "pretty": true },
            "unknown_field": 1
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let args = config.args.as_ref().unwrap();
        assert_eq!(args.max_depth, Some(16));
        assert_eq!(
            args.descriptor_sets,
            Some(vec![PathBuf::from("/tmp/a.pb")])
        );
        assert_eq!(config.output.as_ref().unwrap().pretty, Some(true));
        assert_eq!(config.unknown_fields(), vec!["unknown_field"]);
    }

    #[test]
    fn test_file_config_merge_prefers_other() {
        let mut base: FileConfig =
            serde_json::from_str(r#"{ "args": { "max_depth": 8 }, "output": { "pretty": true } }"#)
                .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "args": { "descriptor_sets": ["/x.pb"] } }"#).unwrap();

        base.merge(overlay);

        let args = base.args.unwrap();
        assert_eq!(args.max_depth, Some(8));
        assert_eq!(args.descriptor_sets, Some(vec![PathBuf::from("/x.pb")]));
        assert_eq!(base.output.unwrap().pretty, Some(true));
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig::load_layers(&CliConfig::default(), None, &dir.path().join("none.json"))
                .unwrap();

        assert_eq!(config.args.max_depth, DEFAULT_ARGS_MAX_DEPTH);
        assert!(config.args.descriptor_sets.is_empty());
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_layers_apply_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let profile = write_config(
            dir.path(),
            "profile.json",
            r#"{ "args": { "max_depth": 10, "descriptor_sets": ["/p.pb"] }, "output": { "pretty": true } }"#,
        );
        let local = write_config(dir.path(), "local.json", r#"{ "args": { "max_depth": 20 } }"#);

        let config = AppConfig::load_layers(&CliConfig::default(), Some(&profile), &local).unwrap();
        assert_eq!(config.args.max_depth, 20);
        assert_eq!(config.args.descriptor_sets, vec![PathBuf::from("/p.pb")]);
        assert!(config.output.pretty);

        let cli = CliConfig {
            max_depth: Some(30),
            pretty: Some(false),
            ..Default::default()
        };
        let config = AppConfig::load_layers(&cli, Some(&profile), &local).unwrap();
        assert_eq!(config.args.max_depth, 30);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_explicit_config_replaces_local() {
        let dir = tempfile::tempdir().unwrap();
        let local = write_config(dir.path(), "local.json", r#"{ "args": { "max_depth": 20 } }"#);
        let explicit = write_config(dir.path(), "explicit.json", r#"{ "args": { "max_depth": 5 } }"#);

        let cli = CliConfig {
            config: Some(explicit),
            ..Default::default()
        };
        let config = AppConfig::load_layers(&cli, None, &local).unwrap();
        assert_eq!(config.args.max_depth, 5);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            config: Some(dir.path().join("missing.json")),
            ..Default::default()
        };
        let err = AppConfig::load_layers(&cli, None, &dir.path().join("none.json")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            max_depth: Some(0),
            ..Default::default()
        };
        assert!(AppConfig::load_layers(&cli, None, &dir.path().join("none.json")).is_err());
    }
}
