//! Configuration file loader for web-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".web-publisher.yaml";

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublisherConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for `project_path` with the process environment
    pub fn from_env<P: Into<PathBuf>>(project_path: P) -> Self {
        Self {
            project_path: project_path.into(),
            cli_args: None,
            env: env::vars().collect(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "hosting.domain")
    pub field: String,

    /// Error message
    pub message: String,

    /// Expected type/value
    pub expected: Option<String>,

    /// Actual type/value
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.web-publisher.yaml)
    /// 4. Global config (~/.web-publisher.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let mut configs: Vec<PublisherConfig> = Vec::new();

        // 5. Default values (lowest priority)
        configs.push(PublisherConfig::default());

        // 4. Global config
        if let Some(global_config) = Self::load_global_config(&options.env).await? {
            configs.push(global_config);
        }

        // 3. Project config
        if let Some(project_config) = Self::load_project_config(&options.project_path).await? {
            configs.push(project_config);
        }

        // 2. Environment variables
        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        // 1. CLI arguments (highest priority)
        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);
        let expanded_config = Self::expand_env_vars(merged_config, &options.env);

        let validation = Self::validate(&expanded_config);
        for warning in &validation.warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }
        if !validation.valid {
            return Err(PublishError::Config(Self::format_validation_result(
                &validation,
            )));
        }

        Ok(expanded_config)
    }

    /// Load global configuration from ~/.web-publisher.yaml
    async fn load_global_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<PublisherConfig>, PublishError> {
        // No home directory simply means no global config
        let Some(home_dir) = env.get("HOME") else {
            return Ok(None);
        };
        let global_config_path = PathBuf::from(home_dir).join(CONFIG_FILENAME);

        Self::load_config_file(&global_config_path, HashSet::new()).await
    }

    /// Load project configuration from ./.web-publisher.yaml
    async fn load_project_config(
        project_path: &Path,
    ) -> Result<Option<PublisherConfig>, PublishError> {
        let project_config_path = project_path.join(CONFIG_FILENAME);

        Self::load_config_file(&project_config_path, HashSet::new()).await
    }

    /// Load configuration from YAML file
    ///
    /// `visited` holds the files already on the `extends` chain.
    fn load_config_file(
        file_path: &Path,
        mut visited: HashSet<PathBuf>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PublisherConfig>, PublishError>>
                + Send
                + '_,
        >,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            let canonical = file_path
                .canonicalize()
                .unwrap_or_else(|_| file_path.to_path_buf());
            if !visited.insert(canonical) {
                return Err(PublishError::Config(format!(
                    "circular extends: {} is already part of the chain",
                    file_path.display()
                )));
            }

            debug!(path = %file_path.display(), "loading config file");

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishError::Config(format!("Failed to read config file: {}", e))
            })?;

            let config: PublisherConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::Config(format!("Failed to parse YAML config: {}", e))
            })?;

            // Handle extends if present
            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| PublishError::Config("Invalid config file path".to_string()))?
                    .join(extends_path);

                if let Some(base_config) = Self::load_config_file(&base_path, visited).await? {
                    return Ok(Some(Self::merge_configs(vec![base_config, config])));
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublisherConfig> {
        let mut config = PublisherConfig {
            version: String::new(),
            hosting: None,
            build: None,
            directory: None,
            ..Default::default()
        };
        let mut has_changes = false;

        // PUBLISH_PROJECT_NAME -> project.name
        if let Some(name) = env.get("PUBLISH_PROJECT_NAME") {
            config.project = Some(ProjectConfig {
                name: Some(name.clone()),
            });
            has_changes = true;
        }

        // PUBLISH_DOMAIN -> hosting.domain
        if let Some(domain) = env.get("PUBLISH_DOMAIN") {
            config.hosting.get_or_insert_with(HostingConfig::default).domain =
                Some(domain.clone());
            has_changes = true;
        }

        // PUBLISH_HOSTING_ROOT -> hosting.root
        if let Some(root) = env.get("PUBLISH_HOSTING_ROOT") {
            config.hosting.get_or_insert_with(HostingConfig::default).root =
                Some(PathBuf::from(root));
            has_changes = true;
        }

        // PUBLISH_CREATOR_HANDLE -> identity.creatorHandle
        if let Some(handle) = env.get("PUBLISH_CREATOR_HANDLE") {
            config.identity = Some(IdentityConfig {
                creator_handle: Some(handle.clone()),
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublisherConfig>) -> PublisherConfig {
        let mut result = PublisherConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, field by field
    fn merge_into(target: &mut PublisherConfig, source: PublisherConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_vars) = source.variables {
            let target_vars = target.variables.get_or_insert_with(HashMap::new);
            target_vars.extend(source_vars);
        }

        if let Some(source_project) = source.project {
            let target_project = target.project.get_or_insert_with(ProjectConfig::default);
            if source_project.name.is_some() {
                target_project.name = source_project.name;
            }
        }

        if let Some(source_hosting) = source.hosting {
            let target_hosting = target.hosting.get_or_insert_with(HostingConfig::default);
            if source_hosting.domain.is_some() {
                target_hosting.domain = source_hosting.domain;
            }
            if source_hosting.root.is_some() {
                target_hosting.root = source_hosting.root;
            }
        }

        if let Some(source_identity) = source.identity {
            let target_identity = target.identity.get_or_insert_with(IdentityConfig::default);
            if source_identity.creator_handle.is_some() {
                target_identity.creator_handle = source_identity.creator_handle;
            }
        }

        if let Some(source_build) = source.build {
            let target_build = target.build.get_or_insert_with(BuildConfig::default);
            if source_build.command.is_some() {
                target_build.command = source_build.command;
            }
            if source_build.args.is_some() {
                target_build.args = source_build.args;
            }
            if source_build.source_dir.is_some() {
                target_build.source_dir = source_build.source_dir;
            }
            if source_build.output_dir.is_some() {
                target_build.output_dir = source_build.output_dir;
            }
            if source_build.timeout_secs.is_some() {
                target_build.timeout_secs = source_build.timeout_secs;
            }
        }

        if let Some(source_directory) = source.directory {
            let target_directory = target.directory.get_or_insert_with(DirectoryConfig::default);
            if source_directory.limit.is_some() {
                target_directory.limit = source_directory.limit;
            }
        }
    }

    /// Expand `${VAR}` references in string values
    ///
    /// Config `variables` take precedence over the environment.
    fn expand_env_vars(mut config: PublisherConfig, env: &HashMap<String, String>) -> PublisherConfig {
        let mut lookup = env.clone();
        if let Some(variables) = &config.variables {
            lookup.extend(variables.clone());
        }

        if let Some(project) = &mut config.project
            && let Some(name) = &project.name
        {
            project.name = Some(Self::expand_string(name, &lookup));
        }

        if let Some(hosting) = &mut config.hosting {
            if let Some(domain) = &hosting.domain {
                hosting.domain = Some(Self::expand_string(domain, &lookup));
            }
            if let Some(root) = &hosting.root {
                let expanded = Self::expand_string(&root.to_string_lossy(), &lookup);
                hosting.root = Some(PathBuf::from(expanded));
            }
        }

        if let Some(identity) = &mut config.identity
            && let Some(handle) = &identity.creator_handle
        {
            identity.creator_handle = Some(Self::expand_string(handle, &lookup));
        }

        if let Some(build) = &mut config.build
            && let Some(args) = &build.args
        {
            build.args = Some(
                args.iter()
                    .map(|arg| Self::expand_string(arg, &lookup))
                    .collect(),
            );
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let mut result = input.to_string();
        for cap in ENV_VAR_PATTERN.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(value) = env.get(var_name) {
                result = result.replace(&format!("${{{}}}", var_name), value);
            } else {
                warn!("environment variable {} not found", var_name);
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublisherConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Check version (required)
        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some("string (e.g., \"1.0\")".to_string()),
                actual: Some("empty".to_string()),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some("Currently supported version is \"1.0\" only".to_string()),
            });
        }

        // 2. Hosting
        if let Some(hosting) = &config.hosting
            && let Some(domain) = &hosting.domain
        {
            if domain.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: "hosting.domain".to_string(),
                    message: "domain must not be empty".to_string(),
                    expected: Some("host name (e.g., \"example.com\")".to_string()),
                    actual: Some("empty".to_string()),
                });
            } else if domain.contains("://") || domain.contains('/') {
                errors.push(ConfigValidationError {
                    field: "hosting.domain".to_string(),
                    message: "domain must be a bare host name".to_string(),
                    expected: Some("host name (e.g., \"example.com\")".to_string()),
                    actual: Some(domain.clone()),
                });
            }
        }

        // 3. Build
        if let Some(build) = &config.build {
            Self::validate_build(build, &mut errors, &mut warnings);
        }

        // 4. Directory
        if config.directory.as_ref().and_then(|d| d.limit) == Some(0) {
            errors.push(ConfigValidationError {
                field: "directory.limit".to_string(),
                message: "limit must be greater than zero".to_string(),
                expected: Some("positive integer".to_string()),
                actual: Some("0".to_string()),
            });
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate build configuration
    fn validate_build(
        build: &BuildConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if let Some(command) = &build.command
            && command.trim().is_empty()
        {
            errors.push(ConfigValidationError {
                field: "build.command".to_string(),
                message: "command must not be empty".to_string(),
                expected: Some("non-empty string".to_string()),
                actual: Some("empty".to_string()),
            });
        }

        if build.timeout_secs == Some(0) {
            errors.push(ConfigValidationError {
                field: "build.timeoutSecs".to_string(),
                message: "timeout must be greater than zero".to_string(),
                expected: Some("positive integer".to_string()),
                actual: Some("0".to_string()),
            });
        }

        if build.command.is_some() && build.source_dir.is_some() {
            warnings.push(ConfigValidationWarning {
                field: "build.sourceDir".to_string(),
                message: "sourceDir is ignored when command is set".to_string(),
                suggestion: Some("Remove one of build.command or build.sourceDir".to_string()),
            });
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    lines.push(format!("    Expected: {}", expected));
                    lines.push(format!("    Actual: {}", actual));
                }
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
