use thiserror::Error;

/// ストレージへの読み書きで発生するエラー。
#[derive(Debug, Error)]
pub enum StorageError {
    /// 書き込むとクォータを超えてしまう。
    #[error("Storage quota exceeded: {required} bytes required, quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize storage data: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 保存されている値がエントリーの配列として読めない。上書きせずに残す。
    #[error("Stored time entries are unreadable, refusing to overwrite them: {0}")]
    Unreadable(#[source] serde_json::Error),
}

/// 入力されたエントリーが保存できる状態にない場合のエラー。
///
/// リポジトリを呼び出す前に検出する。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a date")]
    MissingDate,

    #[error("Add hours spent in the ministry")]
    NoHours,

    #[error("Select at least one type of ministry")]
    NoActivity,
}

/// 活動の種類として解釈できない文字列。
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown activity: {0}")]
pub struct ParseActivityError(pub String);
