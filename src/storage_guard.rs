use log::{debug, error, warn};

use crate::error::StorageError;
use crate::storage::StorageMedium;

/// ストレージ全体に想定する上限。
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// 使用率がこの値を超えたら警告する。
pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;

/// キーと値を保存したときのおおよそのバイト数。
pub fn estimate_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// 書き込みの前にクォータを確認するストレージのラッパー。
///
/// 確認は書き込み前の一度だけで、書き込みに失敗してもリトライはしない。
pub struct StorageGuard<M: StorageMedium> {
    medium: M,
    quota: usize,
}

impl<M: StorageMedium> StorageGuard<M> {
    /// 既定の5MiBのクォータで`StorageGuard`を返す。
    pub fn new(medium: M) -> Self {
        Self::with_quota(medium, DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(medium: M, quota: usize) -> Self {
        Self { medium, quota }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    #[cfg(test)]
    fn medium(&self) -> &M {
        &self.medium
    }

    /// 保存されている全てのキーと値のバイト数の合計。
    ///
    /// ストアが読めない場合は0とみなす。
    pub fn current_usage(&self) -> usize {
        match self.medium.items() {
            Ok(items) => items.iter().map(|(k, v)| estimate_size(k, v)).sum(),
            Err(e) => {
                error!("Failed to read storage while estimating usage: {}", e);
                0
            }
        }
    }

    pub fn would_exceed_quota(&self, new_value_bytes: usize) -> bool {
        self.current_usage() + new_value_bytes > self.quota
    }

    pub fn usage_percentage(&self) -> f64 {
        self.current_usage() as f64 / self.quota as f64 * 100.0
    }

    pub fn is_near_capacity(&self) -> bool {
        self.usage_percentage() > WARNING_THRESHOLD_PERCENT
    }

    /// クォータを確認してから書き込む。
    ///
    /// 上書きであっても既存の値を含めた使用量に新しい値を足して判定する。
    pub fn try_write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let usage = self.current_usage();
        let new_bytes = estimate_size(key, value);
        debug!(
            "Current storage usage: {} bytes, new data size: {} bytes, limit: {} bytes",
            usage, new_bytes, self.quota
        );
        if usage + new_bytes > self.quota {
            warn!("Local storage is nearly full! Please backup and clear some data.");
            return Err(StorageError::QuotaExceeded {
                required: usage + new_bytes,
                quota: self.quota,
            });
        }

        self.medium.set_item(key, value).map_err(|e| {
            match &e {
                StorageError::QuotaExceeded { .. } => warn!("Local storage is already full!"),
                _ => error!("Failed to save data: {}", e),
            }
            e
        })
    }

    /// `try_write`の結果を真偽値で返す。書き込めなかった場合は`false`。
    pub fn guarded_write(&mut self, key: &str, value: &str) -> bool {
        self.try_write(key, value).is_ok()
    }

    pub fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.medium.get_item(key)
    }
}
