use anyhow::Result;
use log::info;

use crate::aggregation::{
    activity_counts_for_service_year, monthly_buckets_for_service_year, service_year_of,
    yearly_totals, ActivityCounts, Metric, MonthlyBucket, YearlyTotals,
};
use crate::datetime;
use crate::repository::EntryRepository;

/// `yearly`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct YearlyArgs {
    #[clap(
        short = 'y',
        long = "year",
        help = "Sets the service year, e.g. 2025 for September 2024 to August 2025"
    )]
    pub year: Option<i32>,
}

/// 奉仕年度の集計結果。
#[derive(Debug, Clone, PartialEq)]
pub struct YearlySummary {
    pub totals: YearlyTotals,
    pub hours: Vec<MonthlyBucket>,
    pub studies: Vec<MonthlyBucket>,
    pub counts: ActivityCounts,
}

pub struct YearlyCommand<'a, T: EntryRepository> {
    repository: &'a T,
}

impl<'a, T: EntryRepository> YearlyCommand<'a, T> {
    /// 新しい`YearlyCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `yearly`サブコマンドの処理を行う。
    ///
    /// 年度が指定されていない場合は、今日が属する奉仕年度を利用する。
    pub fn run(&self, yearly: YearlyArgs) -> Result<YearlySummary> {
        let service_year = yearly
            .year
            .unwrap_or_else(|| service_year_of(datetime::today()));
        info!(
            "Service year: {} (September {} to August {})",
            service_year,
            service_year - 1,
            service_year
        );

        let entries = self.repository.list();

        Ok(YearlySummary {
            totals: yearly_totals(&entries, service_year),
            hours: monthly_buckets_for_service_year(&entries, service_year, Metric::Hours),
            studies: monthly_buckets_for_service_year(&entries, service_year, Metric::Studies),
            counts: activity_counts_for_service_year(&entries, service_year),
        })
    }
}
