use chrono::NaiveDate;
use log::{error, info, warn};

use crate::error::StorageError;
use crate::notify::{ChangeBridge, Subscription};
use crate::storage::StorageMedium;
use crate::storage_guard::StorageGuard;
use crate::time_entry::{
    decode_entries, encode_entries, EntryId, EntryPatch, NewEntry, StoredEntries, TimeEntry,
};

/// エントリーの一覧を保存するキー。
pub const ENTRIES_KEY: &str = "timeEntries";

/// 更新、削除の対象となるエントリーの選び方。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryMatcher {
    /// idが一致するエントリー。
    Id(EntryId),
    /// 同じ日付の全てのエントリー。
    Date(NaiveDate),
    /// idを除く全ての項目が一致するエントリー。
    Exact(TimeEntry),
}

impl EntryMatcher {
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        match self {
            EntryMatcher::Id(id) => entry.id == *id,
            EntryMatcher::Date(date) => entry.date == *date,
            EntryMatcher::Exact(target) => entry.same_record(target),
        }
    }
}

/// タイムエントリーを保存、取得するためのリポジトリ。
#[cfg_attr(test, mockall::automock)]
pub trait EntryRepository {
    /// 保存されているエントリーを読み込む。
    ///
    /// 保存データが無い場合や壊れている場合は空を返す。
    fn load(&self) -> Vec<TimeEntry>;

    /// 全てのエントリーを追加順に返す。
    fn list(&self) -> Vec<TimeEntry>;

    /// エントリーを末尾に追加する。検証は呼び出し側で行う。
    ///
    /// # Arguments
    ///
    /// * `entry` - 追加するエントリー
    fn add(&mut self, entry: NewEntry) -> Result<TimeEntry, StorageError>;

    /// 一致したエントリーを更新し、更新した件数を返す。
    ///
    /// # Arguments
    ///
    /// * `matcher` - 更新対象の選び方
    /// * `patch` - 変更する項目
    fn update(&mut self, matcher: &EntryMatcher, patch: &EntryPatch) -> Result<usize, StorageError>;

    /// 一致したエントリーを削除し、削除した件数を返す。
    ///
    /// # Arguments
    ///
    /// * `matcher` - 削除対象の選び方
    fn remove(&mut self, matcher: &EntryMatcher) -> Result<usize, StorageError>;
}

/// キーバリューストアにエントリーを保存するリポジトリ。
///
/// 変更を保存した後に`ChangeBridge`で購読者に通知する。
pub struct LocalEntryRepository<M: StorageMedium> {
    guard: StorageGuard<M>,
    bridge: ChangeBridge,
}

impl<M: StorageMedium> LocalEntryRepository<M> {
    /// 新しい`LocalEntryRepository`を返す。
    ///
    /// # Arguments
    ///
    /// * `guard` - 書き込み前にクォータを確認するストレージ
    /// * `bridge` - 変更を通知する先
    pub fn new(guard: StorageGuard<M>, bridge: ChangeBridge) -> Self {
        Self { guard, bridge }
    }

    pub fn guard(&self) -> &StorageGuard<M> {
        &self.guard
    }

    pub fn subscribe(&self) -> Subscription {
        self.bridge.subscribe()
    }

    /// 変更のために保存データを読み込む。
    ///
    /// 読めなかったレコードも含めて返すので、書き戻しても保存データは失われない。
    /// 値全体が配列として読めない場合は上書きしないようにエラーにする。
    fn load_for_update(&self) -> Result<StoredEntries, StorageError> {
        match self.guard.read(ENTRIES_KEY)? {
            Some(json) => decode_entries(&json).map_err(StorageError::Unreadable),
            None => Ok(StoredEntries::default()),
        }
    }

    /// 一覧全体を保存し、成功したら通知する。
    fn persist(&mut self, stored: &StoredEntries) -> Result<(), StorageError> {
        let json = encode_entries(stored)?;
        self.guard.try_write(ENTRIES_KEY, &json)?;
        if self.guard.is_near_capacity() {
            warn!(
                "Storage usage is at {:.1}% of the quota",
                self.guard.usage_percentage()
            );
        }
        self.bridge.broadcast();
        Ok(())
    }
}

impl<M: StorageMedium> EntryRepository for LocalEntryRepository<M> {
    fn load(&self) -> Vec<TimeEntry> {
        let json = match self.guard.read(ENTRIES_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return vec![],
            Err(e) => {
                error!("Error loading entries: {}", e);
                return vec![];
            }
        };

        match decode_entries(&json) {
            Ok(stored) => stored.entries,
            Err(e) => {
                warn!("Stored time entries are malformed, treating as empty: {}", e);
                vec![]
            }
        }
    }

    fn list(&self) -> Vec<TimeEntry> {
        self.load()
    }

    fn add(&mut self, entry: NewEntry) -> Result<TimeEntry, StorageError> {
        let mut stored = self.load_for_update()?;
        let entry = entry.into_entry(stored.next_id());
        stored.entries.push(entry.clone());

        self.persist(&stored)?;
        info!("Added time entry {} for {}", entry.id, entry.date);

        Ok(entry)
    }

    fn update(
        &mut self,
        matcher: &EntryMatcher,
        patch: &EntryPatch,
    ) -> Result<usize, StorageError> {
        let mut stored = self.load_for_update()?;
        let mut updated = 0;
        for entry in stored.entries.iter_mut().filter(|e| matcher.matches(e)) {
            *entry = patch.apply(entry);
            updated += 1;
        }
        if updated == 0 {
            info!("No time entry matched {:?}, nothing to update", matcher);
            return Ok(0);
        }

        self.persist(&stored)?;
        info!("Updated {} time entr(ies)", updated);

        Ok(updated)
    }

    fn remove(&mut self, matcher: &EntryMatcher) -> Result<usize, StorageError> {
        let mut stored = self.load_for_update()?;
        let before = stored.entries.len();
        stored.entries.retain(|e| !matcher.matches(e));
        let removed = before - stored.entries.len();
        if removed == 0 {
            info!("No time entry matched {:?}, nothing to remove", matcher);
            return Ok(0);
        }

        self.persist(&stored)?;
        info!("Removed {} time entr(ies)", removed);

        Ok(removed)
    }
}
