//! Service settings loaded from TOML
use crate::error::{ActionLinkError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of every action link route.
    pub base_path: String,
    /// Where a full reload lands when the request carries no referer.
    pub default_redirect: String,
    /// CSRF key; a fresh one is generated at startup when unset.
    pub token_key: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_path: "/action-link".to_string(),
            default_redirect: "/".to_string(),
            token_key: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| ActionLinkError::Config(format!("Invalid TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ActionLinkError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') {
            return Err(ActionLinkError::Config(format!(
                "base_path `{}` must start with `/`",
                self.base_path
            )));
        }
        if self.base_path.len() > 1 && self.base_path.ends_with('/') {
            return Err(ActionLinkError::Config(format!(
                "base_path `{}` must not end with `/`",
                self.base_path
            )));
        }
        if self.default_redirect.is_empty() {
            return Err(ActionLinkError::Config("default_redirect is empty".into()));
        }
        Ok(())
    }
}
