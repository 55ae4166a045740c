use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Rebuilder configuration, loaded from vkstate.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebuildConfig {
    #[serde(default)]
    pub scratch: ScratchConfig,
    #[serde(default)]
    pub rebuild: RebuildOptions,
}

/// Sizing of the per-(device, queue family) staging memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Logical staging capacity before the overcommit factor
    #[serde(default = "default_memory_size")]
    pub memory_size: u64,
    /// Every staged request of S bytes takes overcommit * S bytes
    #[serde(default = "default_overcommit")]
    pub overcommit: u64,
    /// Allocation granularity inside the staging memory
    #[serde(default = "default_alignment")]
    pub alignment: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildOptions {
    /// Stage captured buffer contents
    #[serde(default = "default_true")]
    pub prime_buffers: bool,
    /// Stage captured image contents
    #[serde(default = "default_true")]
    pub prime_images: bool,
    /// Re-map memories that were mapped at capture time
    #[serde(default = "default_true")]
    pub restore_mappings: bool,
    /// Re-record command buffers that were recording or completed
    #[serde(default = "default_true")]
    pub rerecord_command_buffers: bool,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            memory_size: default_memory_size(),
            overcommit: default_overcommit(),
            alignment: default_alignment(),
        }
    }
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            prime_buffers: true,
            prime_images: true,
            restore_mappings: true,
            rerecord_command_buffers: true,
        }
    }
}

impl ScratchConfig {
    /// Bytes reserved in staging memory for a request of `size` bytes.
    pub fn request_size(&self, size: u64) -> u64 {
        round_up(size.saturating_mul(self.overcommit.max(1)), self.alignment)
    }

    /// Size of each staging memory allocation.
    pub fn allocation_size(&self) -> u64 {
        self.request_size(self.memory_size)
    }
}

fn round_up(v: u64, align: u64) -> u64 {
    if align == 0 {
        v
    } else {
        v.div_ceil(align) * align
    }
}

impl RebuildConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: RebuildConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    /// A file that exists but does not parse also falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "ignoring config: {e:#}");
                Self::default()
            }
        }
    }
}

/// Config file path: `$VKSTATE_CONFIG` if set, else `./vkstate.toml`.
pub fn default_config_path() -> String {
    std::env::var("VKSTATE_CONFIG").unwrap_or_else(|_| "vkstate.toml".to_string())
}

fn default_memory_size() -> u64 {
    64 * 1024 * 1024
}

fn default_overcommit() -> u64 {
    2
}

fn default_alignment() -> u64 {
    256
}

fn default_true() -> bool {
    true
}
