use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::aggregation::{sum_hours_in_month, sum_studies_in_month};
use crate::time_entry::TimeEntry;

/// 月次報告として共有するテキスト。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlyReport {
    /// 報告する月の1日。
    pub month: NaiveDate,
    pub total_hours: u32,
    pub total_studies: u32,
}

impl MonthlyReport {
    /// `reference`の属する月の報告を作る。
    pub fn for_month(entries: &[TimeEntry], reference: NaiveDate) -> Self {
        Self {
            month: reference.with_day(1).unwrap_or(reference),
            total_hours: sum_hours_in_month(entries, reference),
            total_studies: sum_studies_in_month(entries, reference),
        }
    }

    pub fn shared_in_ministry(&self) -> bool {
        self.total_hours > 0
    }
}

/// 時間が0なら時間の行を、研究が0なら研究の行を省く。
impl fmt::Display for MonthlyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Report:", self.month.format("%B %Y"))?;
        writeln!(
            f,
            "Shared in Ministry: {}",
            if self.shared_in_ministry() { "Yes" } else { "No" }
        )?;
        if self.total_hours > 0 {
            writeln!(f, "{} Hours", self.total_hours)?;
        }
        if self.total_studies > 0 {
            let noun = if self.total_studies == 1 { "Study" } else { "Studies" };
            write!(f, "{} Bible {}", self.total_studies, noun)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;

    use super::MonthlyReport;
    use crate::time_entry::{Activity, ActivityFlags, EntryId, TimeEntry};

    fn march(hours: u32, studies: u32) -> MonthlyReport {
        MonthlyReport {
            month: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total_hours: hours,
            total_studies: studies,
        }
    }

    #[rstest]
    #[case::full(
        march(12, 3),
        "March 2024 Report:\nShared in Ministry: Yes\n12 Hours\n3 Bible Studies"
    )]
    #[case::single_study(
        march(5, 1),
        "March 2024 Report:\nShared in Ministry: Yes\n5 Hours\n1 Bible Study"
    )]
    #[case::no_studies(march(5, 0), "March 2024 Report:\nShared in Ministry: Yes\n5 Hours\n")]
    #[case::nothing(march(0, 0), "March 2024 Report:\nShared in Ministry: No\n")]
    #[case::studies_only(
        march(0, 2),
        "March 2024 Report:\nShared in Ministry: No\n2 Bible Studies"
    )]
    fn test_report_text(#[case] report: MonthlyReport, #[case] expected: &str) {
        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn test_for_month_sums_only_that_month() {
        let flags = ActivityFlags::from_activities([Activity::Others]);
        let entries = vec![
            TimeEntry {
                id: EntryId(1),
                date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                ministry_hours: 4,
                bible_studies: 1,
                flags,
            },
            TimeEntry {
                id: EntryId(2),
                date: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
                ministry_hours: 9,
                bible_studies: 9,
                flags,
            },
        ];

        let reference = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let report = MonthlyReport::for_month(&entries, reference);

        assert_eq!(report, march(4, 1));
    }
}
