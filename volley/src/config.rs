//! Configuration document loading
//!
//! The config file is YAML and is parsed once, up front. Everything past this
//! point consumes the already-validated structures; a missing or malformed
//! file is fatal before any task starts.

use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::errors::VolleyError;

/// One remote deployment destination plus the branches to deploy there.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Host address
    pub host: String,

    /// SSH user
    pub user: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Branch names to deploy, in order
    #[serde(default)]
    pub branches: Vec<String>,
}

fn default_ssh_port() -> u16 {
    22
}

/// Project identity shared read-only across all targets and branches.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    /// Project name, used in image tags and container names
    pub name: String,

    /// Port the container listens on
    pub port: u16,
}

/// SMTP endpoint for email notifications.
///
/// The `user` doubles as the From address.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

/// Email notification settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub recipients: Vec<String>,

    pub smtp: Option<SmtpConfig>,
}

/// Chat notification settings. Each channel is an incoming-webhook URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// The whole configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub targets: Vec<Target>,

    pub project: Project,

    #[serde(default)]
    pub notification: NotificationConfig,

    /// Container registry identifier, e.g. `registry.example.com/team`
    pub registry: String,
}

/// Load and parse the configuration document at `path`.
pub async fn load(path: &Path) -> Result<Config, VolleyError> {
    let contents = fs::read_to_string(path).await.map_err(|e| {
        VolleyError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;

    let config: Config = serde_yaml::from_str(&contents)
        .map_err(|e| VolleyError::ConfigError(format!("cannot parse {}: {}", path.display(), e)))?;

    if config.email_enabled_without_smtp() {
        return Err(VolleyError::ConfigError(
            "email notifications enabled but no smtp endpoint configured".to_string(),
        ));
    }

    Ok(config)
}

impl Config {
    fn email_enabled_without_smtp(&self) -> bool {
        self.notification.email.enable && self.notification.email.smtp.is_none()
    }
}
