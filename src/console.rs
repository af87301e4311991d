use std::io::Write;

use anyhow::{Context, Result};

use crate::aggregation::{
    split_half_years, ActivityCounts, GoalProgress, MonthlyBucket, YearlyTotals,
};
use crate::report::MonthlyReport;
use crate::time_entry::TimeEntry;

/// Consoleに集計結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;

    /// 月の合計、目標までの残り、活動の内訳を表示する。
    fn show_monthly_summary(
        &mut self,
        report: &MonthlyReport,
        goal: &GoalProgress,
        counts: &ActivityCounts,
    ) -> Result<()>;

    /// 奉仕年度の合計、平均、月ごとの内訳を表示する。
    fn show_yearly_summary(
        &mut self,
        totals: &YearlyTotals,
        hours: &[MonthlyBucket],
        studies: &[MonthlyBucket],
        counts: &ActivityCounts,
    ) -> Result<()>;
}

/// 集計結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    fn show_counts(&mut self, counts: &ActivityCounts) -> Result<()> {
        writeln!(self.writer, "## Activities").context("Failed to write heading")?;
        for (activity, count) in counts.iter() {
            writeln!(self.writer, "- {}: {}", activity, count)
                .with_context(|| format!("Failed to write activity count: {}", activity))?;
        }
        Ok(())
    }

    fn show_half(&mut self, title: &str, buckets: &[MonthlyBucket]) -> Result<()> {
        writeln!(self.writer, "- {}", title).context("Failed to write half year title")?;
        for bucket in buckets {
            writeln!(self.writer, "  - {}: {}", bucket.month_name(), bucket.value)
                .with_context(|| format!("Failed to write bucket: {:?}", bucket))?;
        }
        Ok(())
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 新しい日付から順にlist形式で表示する。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by(|a, b| b.date.cmp(&a.date));

        for entry in sorted_entries {
            let hours = if entry.ministry_hours == 1 { "hour" } else { "hours" };
            let studies = if entry.bible_studies == 0 {
                String::new()
            } else if entry.bible_studies == 1 {
                ", 1 Bible study".to_string()
            } else {
                format!(", {} Bible studies", entry.bible_studies)
            };
            writeln!(
                self.writer,
                "- [{}] {}: {} {}{} ({})",
                entry.id,
                entry.date.format("%Y-%m-%d"),
                entry.ministry_hours,
                hours,
                studies,
                entry.activities().join(", ")
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_monthly_summary(
        &mut self,
        report: &MonthlyReport,
        goal: &GoalProgress,
        counts: &ActivityCounts,
    ) -> Result<()> {
        writeln!(self.writer, "# {}", report.month.format("%B %Y"))
            .context("Failed to write heading")?;
        writeln!(self.writer, "- Hours: {}", report.total_hours).context("Failed to write hours")?;
        writeln!(self.writer, "- Bible studies: {}", report.total_studies)
            .context("Failed to write studies")?;
        writeln!(
            self.writer,
            "- Goal: {} hours ({} hours left, {:.0}%)",
            goal.goal_hours,
            goal.hours_left(),
            goal.ratio() * 100.0
        )
        .context("Failed to write goal")?;
        self.show_counts(counts)
    }

    fn show_yearly_summary(
        &mut self,
        totals: &YearlyTotals,
        hours: &[MonthlyBucket],
        studies: &[MonthlyBucket],
        counts: &ActivityCounts,
    ) -> Result<()> {
        writeln!(
            self.writer,
            "# Service Year {}/{}",
            totals.service_year - 1,
            totals.service_year
        )
        .context("Failed to write heading")?;
        writeln!(
            self.writer,
            "- Hours: {} (average {:.1} per month)",
            totals.total_hours, totals.average_hours
        )
        .context("Failed to write hours")?;
        writeln!(
            self.writer,
            "- Bible studies: {} (average {:.1} per month)",
            totals.total_studies, totals.average_studies
        )
        .context("Failed to write studies")?;

        for (title, buckets) in [("Hours", hours), ("Bible studies", studies)] {
            writeln!(self.writer, "## {}", title).context("Failed to write heading")?;
            let (first, second) = split_half_years(buckets);
            self.show_half("September - February", first)?;
            self.show_half("March - August", second)?;
        }

        self.show_counts(counts)
    }
}
