use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ParseActivityError, ValidationError};

/// 保存時の日付フォーマット。日付のみが意味を持つので時刻は常に0時とする。
const STORED_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00";

/// エントリーの識別子。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntryId)
    }
}

/// 奉仕活動の種類。
///
/// 宣言順がラベルの並び順になる。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Activity {
    HouseToHouse,
    BibleStudy,
    ReturnVisit,
    CartWitnessing,
    LetterWriting,
    InformalWitnessing,
    Others,
}

impl Activity {
    pub const ALL: [Activity; 7] = [
        Activity::HouseToHouse,
        Activity::BibleStudy,
        Activity::ReturnVisit,
        Activity::CartWitnessing,
        Activity::LetterWriting,
        Activity::InformalWitnessing,
        Activity::Others,
    ];

    /// 表示用のラベル。保存データの`activities`にもこの文字列が入る。
    pub fn label(self) -> &'static str {
        match self {
            Activity::HouseToHouse => "House to House",
            Activity::BibleStudy => "Bible Study",
            Activity::ReturnVisit => "Return Visit",
            Activity::CartWitnessing => "Cart Witnessing",
            Activity::LetterWriting => "Letter Writing",
            Activity::InformalWitnessing => "Informal Witnessing",
            Activity::Others => "Others",
        }
    }

    /// コマンドラインで指定する名前。
    pub fn name(self) -> &'static str {
        match self {
            Activity::HouseToHouse => "house-to-house",
            Activity::BibleStudy => "bible-study",
            Activity::ReturnVisit => "return-visit",
            Activity::CartWitnessing => "cart-witnessing",
            Activity::LetterWriting => "letter-writing",
            Activity::InformalWitnessing => "informal-witnessing",
            Activity::Others => "others",
        }
    }

    /// ラベルから種類を引く。知らないラベルは`None`。
    pub fn from_label(label: &str) -> Option<Activity> {
        Activity::ALL.into_iter().find(|a| a.label() == label)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Activity {
    type Err = ParseActivityError;

    /// `house-to-house`形式の名前か、大文字小文字を無視したラベルを受け付ける。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Activity::ALL
            .into_iter()
            .find(|a| a.name() == needle || a.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseActivityError(s.to_string()))
    }
}

/// 7種類の活動フラグ。エントリーの活動は常にこちらを正とする。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ActivityFlags {
    pub house_to_house: bool,
    pub bible_study: bool,
    pub return_visit: bool,
    pub cart_witnessing: bool,
    pub letter_writing: bool,
    pub informal_witnessing: bool,
    pub others: bool,
}

impl ActivityFlags {
    pub fn from_activities<I: IntoIterator<Item = Activity>>(activities: I) -> Self {
        let mut flags = Self::default();
        activities.into_iter().for_each(|a| flags.set(a, true));
        flags
    }

    /// ラベルの列からフラグを作る。知らないラベルは無視する。
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_activities(
            labels
                .into_iter()
                .filter_map(|label| Activity::from_label(label.as_ref())),
        )
    }

    pub fn is_set(&self, activity: Activity) -> bool {
        match activity {
            Activity::HouseToHouse => self.house_to_house,
            Activity::BibleStudy => self.bible_study,
            Activity::ReturnVisit => self.return_visit,
            Activity::CartWitnessing => self.cart_witnessing,
            Activity::LetterWriting => self.letter_writing,
            Activity::InformalWitnessing => self.informal_witnessing,
            Activity::Others => self.others,
        }
    }

    pub fn set(&mut self, activity: Activity, value: bool) {
        let flag = match activity {
            Activity::HouseToHouse => &mut self.house_to_house,
            Activity::BibleStudy => &mut self.bible_study,
            Activity::ReturnVisit => &mut self.return_visit,
            Activity::CartWitnessing => &mut self.cart_witnessing,
            Activity::LetterWriting => &mut self.letter_writing,
            Activity::InformalWitnessing => &mut self.informal_witnessing,
            Activity::Others => &mut self.others,
        };
        *flag = value;
    }

    /// 立っているフラグを宣言順で返す。
    pub fn activities(&self) -> Vec<Activity> {
        Activity::ALL
            .into_iter()
            .filter(|a| self.is_set(*a))
            .collect()
    }

    /// 立っているフラグのラベルを宣言順で返す。
    pub fn labels(&self) -> Vec<&'static str> {
        self.activities().into_iter().map(Activity::label).collect()
    }

    pub fn any(&self) -> bool {
        Activity::ALL.into_iter().any(|a| self.is_set(a))
    }
}

/// 1日分の奉仕活動の記録。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub ministry_hours: u32,
    pub bible_studies: u32,
    pub flags: ActivityFlags,
}

impl TimeEntry {
    /// 表示用の活動ラベル。フラグから毎回導出する。
    pub fn activities(&self) -> Vec<&'static str> {
        self.flags.labels()
    }

    /// idを除いた全項目が一致するかどうか。
    pub fn same_record(&self, other: &TimeEntry) -> bool {
        self.date == other.date
            && self.ministry_hours == other.ministry_hours
            && self.bible_studies == other.bible_studies
            && self.activities() == other.activities()
    }
}

/// 検証済みの新規エントリー。idはリポジトリが採番する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub ministry_hours: u32,
    pub bible_studies: u32,
    pub flags: ActivityFlags,
}

impl NewEntry {
    pub fn into_entry(self, id: EntryId) -> TimeEntry {
        TimeEntry {
            id,
            date: self.date,
            ministry_hours: self.ministry_hours,
            bible_studies: self.bible_studies,
            flags: self.flags,
        }
    }
}

/// 入力フォームの内容。`validate`を通したものだけがリポジトリに渡る。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub date: Option<NaiveDate>,
    pub ministry_hours: u32,
    pub bible_studies: u32,
    pub flags: ActivityFlags,
}

impl EntryDraft {
    /// 日付、時間、活動の順に検証する。
    pub fn validate(self) -> Result<NewEntry, ValidationError> {
        let date = self.date.ok_or(ValidationError::MissingDate)?;
        if self.ministry_hours == 0 {
            return Err(ValidationError::NoHours);
        }
        if !self.flags.any() {
            return Err(ValidationError::NoActivity);
        }

        Ok(NewEntry {
            date,
            ministry_hours: self.ministry_hours,
            bible_studies: self.bible_studies,
            flags: self.flags,
        })
    }
}

/// 既存エントリーへの部分更新。`None`の項目は変更しない。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub ministry_hours: Option<u32>,
    pub bible_studies: Option<u32>,
    pub flags: Option<ActivityFlags>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self == &EntryPatch::default()
    }

    pub fn apply(&self, entry: &TimeEntry) -> TimeEntry {
        TimeEntry {
            id: entry.id,
            date: self.date.unwrap_or(entry.date),
            ministry_hours: self.ministry_hours.unwrap_or(entry.ministry_hours),
            bible_studies: self.bible_studies.unwrap_or(entry.bible_studies),
            flags: self.flags.unwrap_or(entry.flags),
        }
    }

    /// 更新後の内容を検証するための下書きを作る。
    pub fn to_draft(&self, entry: &TimeEntry) -> EntryDraft {
        let patched = self.apply(entry);
        EntryDraft {
            date: Some(patched.date),
            ministry_hours: patched.ministry_hours,
            bible_studies: patched.bible_studies,
            flags: patched.flags,
        }
    }
}

/// 永続化されたエントリーをデシリアライズするための構造体。
///
/// 古いデータにはidやフラグが無く、`activities`のラベルだけを持つものがある。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<EntryId>,
    date: String,
    #[serde(default)]
    ministry_hours: Option<u32>,
    #[serde(default)]
    bible_studies: Option<u32>,
    house_to_house: Option<bool>,
    bible_study: Option<bool>,
    return_visit: Option<bool>,
    cart_witnessing: Option<bool>,
    letter_writing: Option<bool>,
    informal_witnessing: Option<bool>,
    others: Option<bool>,
    #[serde(default)]
    activities: Vec<String>,
}

impl StoredTimeEntry {
    fn flags(&self) -> ActivityFlags {
        let fields = [
            self.house_to_house,
            self.bible_study,
            self.return_visit,
            self.cart_witnessing,
            self.letter_writing,
            self.informal_witnessing,
            self.others,
        ];
        if fields.iter().all(Option::is_none) {
            return ActivityFlags::from_labels(&self.activities);
        }

        let mut flags = ActivityFlags::default();
        Activity::ALL
            .into_iter()
            .zip(fields)
            .for_each(|(activity, value)| flags.set(activity, value.unwrap_or(false)));
        flags
    }
}

impl From<&TimeEntry> for StoredTimeEntry {
    fn from(entry: &TimeEntry) -> Self {
        let flags = entry.flags;
        Self {
            id: Some(entry.id),
            date: entry.date.format(STORED_DATE_FORMAT).to_string(),
            ministry_hours: Some(entry.ministry_hours),
            bible_studies: Some(entry.bible_studies),
            house_to_house: Some(flags.house_to_house),
            bible_study: Some(flags.bible_study),
            return_visit: Some(flags.return_visit),
            cart_witnessing: Some(flags.cart_witnessing),
            letter_writing: Some(flags.letter_writing),
            informal_witnessing: Some(flags.informal_witnessing),
            others: Some(flags.others),
            activities: entry.activities().into_iter().map(String::from).collect(),
        }
    }
}

/// 保存された日付文字列から暦日を取り出す。
///
/// `YYYY-MM-DD`、タイムゾーン無しの日時、RFC 3339の日時を受け付ける。
/// タイムゾーン付きの日時はローカル時刻に変換してから日付を取る。
pub fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime.date());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|datetime| datetime.with_timezone(&Local).date_naive())
}

/// 保存データを読み込んだ結果。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredEntries {
    /// 読み込めたエントリー。保存されていた順。
    pub entries: Vec<TimeEntry>,
    /// エントリーとして読めなかったレコード。書き戻すときもそのまま残す。
    pub unreadable: Vec<serde_json::Value>,
}

impl StoredEntries {
    /// 新しいエントリーに割り当てるid。読めなかったレコードのidとも重ならない。
    pub fn next_id(&self) -> EntryId {
        EntryId(max_id(&self.entries, &self.unreadable) + 1)
    }
}

fn max_id(entries: &[TimeEntry], unreadable: &[serde_json::Value]) -> u64 {
    entries
        .iter()
        .map(|entry| entry.id.0)
        .chain(unreadable.iter().filter_map(raw_id))
        .max()
        .unwrap_or(0)
}

fn raw_id(value: &serde_json::Value) -> Option<u64> {
    value.get("id").and_then(serde_json::Value::as_u64)
}

/// 保存されたJSON配列をエントリーの列にする。
///
/// レコードは1件ずつ読み、形が合わないものや日付が読めないものは`unreadable`に残す。
/// idの無いエントリーには、既存の最大idの次から出現順に採番する。
/// 同じ入力からは常に同じidが得られる。配列でなければエラー。
pub fn decode_entries(json: &str) -> serde_json::Result<StoredEntries> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;

    let mut readable = Vec::new();
    let mut unreadable = Vec::new();
    for value in values {
        let record = match StoredTimeEntry::deserialize(&value) {
            Ok(record) => record,
            Err(e) => {
                warn!("Keeping unreadable time entry as is: {}", e);
                unreadable.push(value);
                continue;
            }
        };
        match parse_stored_date(&record.date) {
            Some(date) => readable.push((record, date)),
            None => {
                warn!("Keeping time entry with unreadable date as is: {:?}", record.date);
                unreadable.push(value);
            }
        }
    }

    let mut next_id = readable
        .iter()
        .filter_map(|(record, _)| record.id.map(|id| id.0))
        .chain(unreadable.iter().filter_map(raw_id))
        .max()
        .unwrap_or(0)
        + 1;

    let entries = readable
        .into_iter()
        .map(|(record, date)| {
            let id = record.id.unwrap_or_else(|| {
                let id = EntryId(next_id);
                next_id += 1;
                id
            });
            TimeEntry {
                id,
                date,
                ministry_hours: record.ministry_hours.unwrap_or(0),
                bible_studies: record.bible_studies.unwrap_or(0),
                flags: record.flags(),
            }
        })
        .collect();

    Ok(StoredEntries {
        entries,
        unreadable,
    })
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredRecord<'a> {
    Entry(StoredTimeEntry),
    Raw(&'a serde_json::Value),
}

/// 保存用のJSON配列にする。読めなかったレコードは読めたエントリーの後ろに元の形で書く。
pub fn encode_entries(stored: &StoredEntries) -> serde_json::Result<String> {
    let records: Vec<StoredRecord> = stored
        .entries
        .iter()
        .map(|entry| StoredRecord::Entry(StoredTimeEntry::from(entry)))
        .chain(stored.unreadable.iter().map(StoredRecord::Raw))
        .collect();
    serde_json::to_string(&records)
}
