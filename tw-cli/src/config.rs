//! toolwire configuration loader.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tw_core::{ToolCallAdapter, ToolSpec, VendorId, VendorProfile};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolwireConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    /// Extra vendors that reuse a built-in wire shape.
    #[serde(default)]
    pub vendors: Vec<CustomVendorConfig>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Vendor used when a command does not pass `--vendor`.
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
        }
    }
}

fn default_vendor() -> String {
    VendorId::OPENAI.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomVendorConfig {
    pub id: String,
    /// Built-in vendor whose wire shape this vendor speaks.
    pub base: String,
    /// Overrides the base vendor's description strictness.
    #[serde(default)]
    pub strict_descriptions: Option<bool>,
    /// Added to the base vendor's sentinel list.
    #[serde(default)]
    pub absent_id_sentinels: Vec<String>,
}

impl ToolwireConfig {
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);

        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::from_toml_str(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!("read config {}: {e}", path.display()));
            }
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        tracing::info!(
            path = %path.display(),
            vendor = %cfg.general.vendor,
            tool_count = cfg.tools.len(),
            custom_vendor_count = cfg.vendors.len(),
            "config loaded"
        );
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_vendor_override(std::env::var("TOOLWIRE_VENDOR").ok());
    }

    fn apply_vendor_override(&mut self, vendor: Option<String>) {
        if let Some(v) = vendor {
            if !v.trim().is_empty() {
                self.general.vendor = v;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.general.vendor.trim().is_empty() {
            return Err(anyhow::anyhow!("general.vendor is required"));
        }

        let builtin: Vec<VendorId> = VendorProfile::builtin().into_iter().map(|p| p.id).collect();
        let mut custom_ids = HashSet::new();
        for vendor in &self.vendors {
            let id = VendorId::new(&vendor.id);
            if id.as_str().is_empty() {
                return Err(anyhow::anyhow!("vendors[].id must not be empty"));
            }
            if builtin.contains(&id) {
                return Err(anyhow::anyhow!(
                    "vendors[].id {id} collides with a built-in vendor"
                ));
            }
            if !custom_ids.insert(id.clone()) {
                return Err(anyhow::anyhow!("vendors[].id {id} is declared twice"));
            }
            if !builtin.contains(&VendorId::new(&vendor.base)) {
                return Err(anyhow::anyhow!(
                    "vendor {id}: base {:?} is not a built-in vendor",
                    vendor.base
                ));
            }
        }

        let mut tool_names = HashSet::new();
        for tool in &self.tools {
            tw_core::validate_tool_name_all_providers(&tool.name)
                .map_err(|e| anyhow::anyhow!("tools[{}]: {e}", tool.name))?;
            if tool.parameters.as_object().is_none() {
                return Err(anyhow::anyhow!(
                    "tools[{}]: parameters must be an object schema",
                    tool.name
                ));
            }
            if !tool_names.insert(tool.name.as_str()) {
                return Err(anyhow::anyhow!("tools[{}] is declared twice", tool.name));
            }
        }

        let adapter = self.build_adapter()?;
        adapter
            .profile(&self.default_vendor())
            .map_err(|e| anyhow::anyhow!("general.vendor: {e}"))?;
        Ok(())
    }

    pub fn default_vendor(&self) -> VendorId {
        VendorId::new(&self.general.vendor)
    }

    /// Built-in vendors plus every configured custom vendor.
    pub fn build_adapter(&self) -> anyhow::Result<ToolCallAdapter> {
        let mut adapter = ToolCallAdapter::new();
        for vendor in &self.vendors {
            let base = VendorId::new(&vendor.base);
            let mut profile = adapter
                .profile(&base)
                .map_err(|e| anyhow::anyhow!("vendor {}: {e}", vendor.id))?
                .aliased(VendorId::new(&vendor.id));
            if let Some(strict) = vendor.strict_descriptions {
                profile.strict_descriptions = strict;
            }
            profile
                .absent_id_sentinels
                .extend(vendor.absent_id_sentinels.iter().cloned());
            adapter.register(profile);
        }
        Ok(adapter)
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".toolwire").join("config.toml")
}
