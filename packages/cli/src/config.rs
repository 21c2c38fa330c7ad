use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use worksheet_editor::SegmentKind;
use worksheet_host::HostOptions;

pub const DEFAULT_CONFIG_NAME: &str = "worksheet.config.json";

/// Worksheet configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched when a command is given no path
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Type of the first segment in a new worksheet
    #[serde(default)]
    pub default_segment: SegmentKind,

    /// Worksheet file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Options for commands that run a live session
    #[serde(default)]
    pub host: HostOptions,
}

fn default_src_dir() -> String {
    ".".to_string()
}

fn default_extension() -> String {
    "clj".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to source directory
    pub fn get_src_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.src_dir)
    }

    /// Whether `path` looks like a worksheet
    pub fn is_worksheet(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext == self.extension.as_str())
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            default_segment: SegmentKind::default(),
            extension: default_extension(),
            host: HostOptions::default(),
        }
    }
}
