//! エントリーを保存するキーバリューストア。
//!
//! 保存先は[StorageMedium]で抽象化している。テストや組み込み用の[MemoryStorage]と、
//! CLIで利用するJSONファイルの[FileStorage]がある。

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::StorageError;

/// 文字列のキーと値を保存するストア。
pub trait StorageMedium {
    /// キーに対応する値を返す。無ければ`None`。
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 値を書き込む。ストア自身の容量を超える場合は`StorageError::QuotaExceeded`を返す。
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 保存されている全てのキーと値を返す。
    fn items(&self) -> Result<Vec<(String, String)>, StorageError>;
}

/// メモリ上のストア。
///
/// `with_capacity`で容量を与えると、超える書き込みを拒否する。
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    capacity: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    fn usage_after(&self, key: &str, value: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
            + key.len()
            + value.len()
    }
}

impl StorageMedium for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(capacity) = self.capacity {
            let required = self.usage_after(key, value);
            if required > capacity {
                return Err(StorageError::QuotaExceeded {
                    required,
                    quota: capacity,
                });
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn items(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// 1つのJSONファイルにキーと値のマップを保存するストア。
///
/// 呼び出しごとにファイルを読み書きするので、書き込みの直後の読み込みは必ずその内容を返す。
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// 新しい`FileStorage`を返す。親ディレクトリが無ければ作成する。
    pub fn new(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(map)?;
        // 書き込み途中で壊れないように一時ファイルから置き換える
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote storage file {:?}", self.path);
        Ok(())
    }
}

impl StorageMedium for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn items(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self.read_map()?.into_iter().collect())
    }
}
