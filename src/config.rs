use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::aggregation::DEFAULT_MONTHLY_GOAL_HOURS;
use crate::storage_guard::DEFAULT_QUOTA_BYTES;

const APP_DIR: &str = "timewise";
const CONFIG_FILE: &str = "config.json";
const STORAGE_FILE: &str = "storage.json";

/// アプリケーションの設定。
///
/// 設定ファイルに書かれていない項目は既定値を使う。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 保存ファイルを置くディレクトリ。
    pub data_dir: PathBuf,
    /// ストレージ全体の上限(バイト)。
    pub quota_bytes: usize,
    /// 月間の目標時間。
    pub monthly_goal_hours: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            data_dir,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            monthly_goal_hours: DEFAULT_MONTHLY_GOAL_HOURS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 既定の設定ファイルのパス。
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// 既定の場所から設定を読み込む。
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 指定されたファイルから設定を読み込む。ファイルが無ければ既定値を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Config file {:?} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
            }
        };

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }
}
