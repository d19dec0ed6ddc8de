//! Registry settings

use crate::digest::DigestAlgorithm;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings for a [`Registry`](super::Registry)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Label attached to every log line the registry emits
    pub name: String,
    /// Algorithm for trees built through [`Registry::empty_tree`](super::Registry::empty_tree)
    pub digest: DigestAlgorithm,
}

impl Settings {
    pub fn new(name: impl Into<String>) -> Self {
        Settings {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("registry name must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            name: "config".to_string(),
            digest: DigestAlgorithm::default(),
        }
    }
}
