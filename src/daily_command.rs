use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;

use crate::aggregation::entries_on;
use crate::datetime;
use crate::repository::EntryRepository;
use crate::time_entry::TimeEntry;

/// 日毎の情報を出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DailyArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,
}

pub struct DailyCommand<'a, T: EntryRepository> {
    repository: &'a T,
}

impl<'a, T: EntryRepository> DailyCommand<'a, T> {
    /// 新しい`DailyCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーを保存しているリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `daily`サブコマンドの処理を行う。
    ///
    /// 指定された日付のタイムエントリーを取得する。
    /// 日付が指定されていない場合は、Localタイムゾーンで今日の日付を利用する。
    ///
    /// # Arguments
    ///
    /// * `daily` - `daily`サブコマンドの引数
    pub fn run(&self, daily: DailyArgs) -> Result<Vec<TimeEntry>> {
        let date = daily.date.unwrap_or_else(datetime::today);
        info!("Date: {}", date);

        let time_entries = entries_on(&self.repository.list(), date);
        info!("{} time entries found.", time_entries.len());

        Ok(time_entries)
    }
}

/// 日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
