//! Loading and saving provider definitions
//!
//! The file format is a JSON document:
//!
//! ```json
//! {
//!   "Providers": [
//!     {
//!       "ProviderName": "Console",
//!       "ProviderType": "ConsoleProvider",
//!       "ProviderInfo": { "LogLevel": "LOG_ALL", "ShowEventColors": true }
//!     }
//!   ]
//! }
//! ```

use super::error::{LoggerError, Result};
use super::properties::{PropertyValue, ProviderProperties, ProviderType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source and destination of provider definitions
pub trait ConfigManager: Send + Sync {
    fn load(&self) -> Result<Vec<ProviderDefinition>>;

    fn save(&self, definitions: &[ProviderDefinition]) -> Result<()>;
}

/// Serializable description of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderDefinition {
    pub provider_name: String,
    pub provider_type: ProviderType,
    #[serde(default)]
    pub provider_info: BTreeMap<String, PropertyValue>,
}

impl ProviderDefinition {
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            provider_name: name.into(),
            provider_type,
            provider_info: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.provider_info.insert(key.into(), value.into());
        self
    }

    /// Validated property bag for this definition
    pub fn to_properties(&self) -> Result<ProviderProperties> {
        let mut properties =
            ProviderProperties::new(self.provider_name.clone(), self.provider_type.clone());
        properties.set_provider_info(self.provider_info.clone())?;
        Ok(properties)
    }

    pub fn from_properties(properties: &ProviderProperties) -> Self {
        Self {
            provider_name: properties.name().to_string(),
            provider_type: properties.provider_type().clone(),
            provider_info: properties.options().clone(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigDocument {
    #[serde(default)]
    providers: Vec<ProviderDefinition>,
}

/// JSON file backed [`ConfigManager`]
///
/// A missing file loads as an empty list. Saves are written to a sibling
/// temp file and renamed over the target.
#[derive(Debug, Clone)]
pub struct FileConfigManager {
    path: PathBuf,
}

impl FileConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigManager for FileConfigManager {
    fn load(&self) -> Result<Vec<ProviderDefinition>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| {
            LoggerError::io_operation(
                "reading provider configuration",
                self.path.display().to_string(),
                e,
            )
        })?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: ConfigDocument = serde_json::from_str(&text)?;
        Ok(document.providers)
    }

    fn save(&self, definitions: &[ProviderDefinition]) -> Result<()> {
        let document = ConfigDocument {
            providers: definitions.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| {
            LoggerError::io_operation(
                "writing provider configuration",
                temp.display().to_string(),
                e,
            )
        })?;
        fs::rename(&temp, &self.path).map_err(|e| {
            LoggerError::io_operation(
                "replacing provider configuration",
                self.path.display().to_string(),
                e,
            )
        })
    }
}

/// In-memory [`ConfigManager`], handy for tests and embedded setups
#[derive(Debug, Default)]
pub struct MemoryConfigManager {
    definitions: RwLock<Vec<ProviderDefinition>>,
}

impl MemoryConfigManager {
    pub fn new(definitions: Vec<ProviderDefinition>) -> Self {
        Self {
            definitions: RwLock::new(definitions),
        }
    }
}

impl ConfigManager for MemoryConfigManager {
    fn load(&self) -> Result<Vec<ProviderDefinition>> {
        Ok(self.definitions.read().clone())
    }

    fn save(&self, definitions: &[ProviderDefinition]) -> Result<()> {
        *self.definitions.write() = definitions.to_vec();
        Ok(())
    }
}
