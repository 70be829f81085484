//! Configuration management for the jsh server.
//!
//! Configuration is layered from three sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML, optional)
//! 3. Environment variables (override)
//!
//! Environment variables use the `JSH_` prefix and `__` as the nested key
//! separator, so `JSH_SERVER__PORT=9090` overrides `server.port`.
//!
//! # Example YAML Configuration
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! api:
//!   prefix: /api
//!   delete_status: 204
//!   cors: true
//! resources:
//!   - type: user
//!     seed:
//!       - attributes: { name: alice }
//!     actions:
//!       - name: deactivate
//!         set: { active: false }
//!     children:
//!       - type: post
//! ```

use std::collections::HashSet;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// API settings
    #[serde(default)]
    pub api: ApiSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Resources served by the API, each backed by an in-memory store
    #[serde(default)]
    pub resources: Vec<ResourceSettings>,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    jsh_api::DEFAULT_BODY_LIMIT
}

/// Routing and response policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApiSettings {
    /// Path prefix every resource is mounted under, e.g. `/api`
    #[serde(default)]
    pub prefix: String,

    /// Status written on a successful delete: 200 or 204
    #[serde(default = "default_delete_status")]
    pub delete_status: u16,

    /// Answer CORS preflights from any origin
    #[serde(default)]
    pub cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delete_status: default_delete_status(),
            cors: false,
        }
    }
}

fn default_delete_status() -> u16 {
    200
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One resource type and its nested children.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResourceSettings {
    /// Singular resource type, e.g. `user` (served at `/users`)
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resources nested under `/{types}/:id`
    #[serde(default)]
    pub children: Vec<ResourceSettings>,

    /// Custom actions served at `PATCH /{types}/:id/{name}`
    #[serde(default)]
    pub actions: Vec<ActionSettings>,

    /// Objects the store starts with
    #[serde(default)]
    pub seed: Vec<SeedObject>,
}

impl ResourceSettings {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            children: Vec::new(),
            actions: Vec::new(),
            seed: Vec::new(),
        }
    }
}

/// An action that merges fixed attributes into the target object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionSettings {
    pub name: String,

    #[serde(default)]
    pub set: Map<String, Value>,
}

/// A pre-loaded object. Without an id the store assigns one.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SeedObject {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigLoadError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::build(Some(path))
    }

    /// Load configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::build(None)
    }

    fn build(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ServerConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        // JSH_SERVER__PORT -> server.port
        let config = builder
            .add_source(
                Environment::with_prefix("JSH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::invalid(
                "server.port must be greater than 0",
            ));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(ConfigLoadError::invalid(
                "server.body_limit_bytes must be greater than 0",
            ));
        }

        if !matches!(self.api.delete_status, 200 | 204) {
            return Err(ConfigLoadError::invalid(format!(
                "api.delete_status must be 200 or 204, got: {}",
                self.api.delete_status
            )));
        }

        validate_resources(&self.resources, "resources")
    }

    /// Bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Checks one level of the resource tree, then recurses into children.
fn validate_resources(resources: &[ResourceSettings], path: &str) -> Result<(), ConfigLoadError> {
    let mut seen = HashSet::new();
    for (i, resource) in resources.iter().enumerate() {
        let here = format!("{path}[{i}]");
        let resource_type = resource.resource_type.trim();
        if resource_type.is_empty() {
            return Err(ConfigLoadError::invalid(format!(
                "{here}.type must not be empty"
            )));
        }
        if !seen.insert(resource_type) {
            return Err(ConfigLoadError::invalid(format!(
                "{here}.type '{resource_type}' is declared more than once"
            )));
        }

        let mut actions = HashSet::new();
        for action in &resource.actions {
            if action.name.trim().is_empty() {
                return Err(ConfigLoadError::invalid(format!(
                    "{here}.actions: action name must not be empty"
                )));
            }
            if !actions.insert(action.name.as_str()) {
                return Err(ConfigLoadError::invalid(format!(
                    "{here}.actions: '{}' is declared more than once",
                    action.name
                )));
            }
        }

        validate_resources(&resource.children, &format!("{here}.children"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{contents}").unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let file = yaml_file(
            r#"
server:
  host: "127.0.0.1"
  port: 9090
  body_limit_bytes: 2048

api:
  prefix: /api
  delete_status: 204
  cors: true

logging:
  level: debug
  json: true

resources:
  - type: user
    seed:
      - id: "7"
        attributes:
          name: alice
    actions:
      - name: deactivate
        set:
          active: false
    children:
      - type: post
"#,
        );

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.body_limit_bytes, 2048);
        assert_eq!(config.api.prefix, "/api");
        assert_eq!(config.api.delete_status, 204);
        assert!(config.api.cors);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        assert_eq!(config.resources.len(), 1);
        let user = &config.resources[0];
        assert_eq!(user.resource_type, "user");
        assert_eq!(user.children[0].resource_type, "post");
        assert_eq!(user.seed[0].id.as_deref(), Some("7"));
        assert_eq!(user.seed[0].attributes["name"], "alice");
        assert_eq!(user.actions[0].name, "deactivate");
        assert_eq!(user.actions[0].set["active"], false);
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let file = yaml_file(
            r#"
server:
  host: "127.0.0.1"
  port: 8080
"#,
        );

        std::env::set_var("JSH_SERVER__PORT", "9999");
        std::env::set_var("JSH_LOGGING__LEVEL", "warn");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("JSH_SERVER__PORT");
        std::env::remove_var("JSH_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_from_env_uses_defaults() {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.delete_status, 200);
        assert_eq!(config.server.body_limit_bytes, jsh_api::DEFAULT_BODY_LIMIT);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_reported() {
        let err = ServerConfig::load("/nonexistent/jsh.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_invalid_file_values_are_rejected() {
        let file = yaml_file(
            r#"
api:
  delete_status: 202
"#,
        );
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("api.delete_status"));
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("server.port"));

        let mut config = ServerConfig::default();
        config.server.body_limit_bytes = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("body_limit_bytes"));

        let mut config = ServerConfig::default();
        config.api.delete_status = 404;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.api.delete_status = 204;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resource_validation() {
        let mut config = ServerConfig::default();
        config.resources = vec![ResourceSettings::new("user"), ResourceSettings::new("user")];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("resources[1].type"), "{err}");

        let mut user = ResourceSettings::new("user");
        user.children = vec![ResourceSettings::new(" ")];
        config.resources = vec![user];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("resources[0].children[0].type"), "{err}");

        // The same type may appear at different levels of the tree.
        let mut user = ResourceSettings::new("user");
        user.children = vec![ResourceSettings::new("user")];
        config.resources = vec![user];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_action_is_rejected() {
        let mut user = ResourceSettings::new("user");
        user.actions = vec![
            ActionSettings {
                name: "ban".into(),
                set: Map::new(),
            },
            ActionSettings {
                name: "ban".into(),
                set: Map::new(),
            },
        ];
        let config = ServerConfig {
            resources: vec![user],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("'ban'"));
    }
}
