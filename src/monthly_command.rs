use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::info;

use crate::aggregation::{activity_counts, entries_in_month, ActivityCounts, GoalProgress};
use crate::datetime;
use crate::report::MonthlyReport;
use crate::repository::EntryRepository;
use crate::time_entry::TimeEntry;

/// `monthly`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct MonthlyArgs {
    #[clap(
        short = 'm',
        long = "month",
        help = "Sets a custom month in the format YYYY-MM",
        parse(try_from_str = parse_month),
    )]
    pub month: Option<NaiveDate>,

    #[clap(long = "report", help = "Print only the report text to share")]
    pub report: bool,
}

/// 1か月分の集計結果。
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// 月のエントリー。日付の新しい順。
    pub entries: Vec<TimeEntry>,
    pub report: MonthlyReport,
    pub goal: GoalProgress,
    pub counts: ActivityCounts,
}

pub struct MonthlyCommand<'a, T: EntryRepository> {
    repository: &'a T,
    goal_hours: u32,
}

impl<'a, T: EntryRepository> MonthlyCommand<'a, T> {
    /// 新しい`MonthlyCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーを保存しているリポジトリ
    /// * `goal_hours` - 月間の目標時間
    pub fn new(repository: &'a T, goal_hours: u32) -> Self {
        Self {
            repository,
            goal_hours,
        }
    }

    /// `monthly`サブコマンドの処理を行う。
    ///
    /// 指定された月のtime entryを集計する。
    /// 月が指定されていない場合は、Localタイムゾーンで今月を利用する。
    ///
    /// # Arguments
    ///
    /// * `monthly` - `monthly`サブコマンドの引数
    pub fn run(&self, monthly: MonthlyArgs) -> Result<MonthlySummary> {
        let month = match monthly.month {
            Some(month) => month,
            None => datetime::today()
                .with_day(1)
                .context("Failed to set day")?,
        };
        info!("Month: {}", month.format("%Y-%m"));

        let all_entries = self.repository.list();
        let entries = entries_in_month(&all_entries, month);
        info!("{} time entries found.", entries.len());

        let report = MonthlyReport::for_month(&all_entries, month);
        let goal = GoalProgress::new(report.total_hours, self.goal_hours);
        let counts = activity_counts(&entries);

        Ok(MonthlySummary {
            entries,
            report,
            goal,
            counts,
        })
    }
}

/// 月をパースする。
fn parse_month(s: &str) -> Result<NaiveDate> {
    let target_date = s.to_string() + "-01";
    NaiveDate::parse_from_str(&target_date, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse month: {}", s))
}
