// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ProfileName;
use crate::error::Result;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "PDFWERK_CONFIG";

/// Persistent application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub compression: CompressionConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_address: String,
    /// TCP port (default 5000).
    pub port: u16,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Parent directory for per-request scratch directories. `None` uses the
    /// system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            port: 5000,
            max_upload_bytes: 50 * 1024 * 1024,
            work_dir: None,
        }
    }
}

/// Knobs for the compression pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Recompress distinct images of a document on the rayon pool.
    pub parallel_images: bool,
    /// Images whose larger side is at or below this are never re-encoded.
    pub min_dimension_px: u32,
    /// Target used when a size-mode request omits `target_size`.
    pub default_target_mb: f64,
    /// Profile used when a quality-mode request omits `quality`.
    pub default_profile: ProfileName,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            parallel_images: true,
            min_dimension_px: 1000,
            default_target_mb: 2.0,
            default_profile: ProfileName::Medium,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file. A missing file yields the defaults; a
    /// file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write settings as pretty JSON.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
