//! エントリーの集計。
//!
//! 全て副作用の無い関数で、渡されたエントリーの列だけから結果を計算する。
//! 奉仕年度は9月から翌年8月までの12か月で、終わりの8月が属する年で呼ぶ。

use chrono::{Datelike, Month, NaiveDate};

use crate::time_entry::{Activity, TimeEntry};

/// 奉仕年度の月を年度の順に並べたもの。
pub const SERVICE_YEAR_MONTHS: [Month; 12] = [
    Month::September,
    Month::October,
    Month::November,
    Month::December,
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
];

/// 年間の平均はデータのある月数に関わらずこの値で割る。
pub const MONTHS_IN_SERVICE_YEAR: u32 = 12;

pub const DEFAULT_MONTHLY_GOAL_HOURS: u32 = 50;

/// 集計する値の種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Hours,
    Studies,
}

impl Metric {
    pub fn value(self, entry: &TimeEntry) -> u32 {
        match self {
            Metric::Hours => entry.ministry_hours,
            Metric::Studies => entry.bible_studies,
        }
    }
}

pub fn is_same_month(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year() && date.month() == reference.month()
}

fn sum_in_month(entries: &[TimeEntry], reference: NaiveDate, metric: Metric) -> u32 {
    entries
        .iter()
        .filter(|entry| is_same_month(entry.date, reference))
        .map(|entry| metric.value(entry))
        .sum()
}

/// `reference`と同じ年月のエントリーの時間の合計。
pub fn sum_hours_in_month(entries: &[TimeEntry], reference: NaiveDate) -> u32 {
    sum_in_month(entries, reference, Metric::Hours)
}

/// `reference`と同じ年月のエントリーの聖書研究の合計。
pub fn sum_studies_in_month(entries: &[TimeEntry], reference: NaiveDate) -> u32 {
    sum_in_month(entries, reference, Metric::Studies)
}

/// 日付の新しい順に並べる。同じ日付の間では元の順序を保つ。
pub fn sort_by_date_desc(entries: &mut [TimeEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

/// 指定した日のエントリー。
pub fn entries_on(entries: &[TimeEntry], date: NaiveDate) -> Vec<TimeEntry> {
    entries
        .iter()
        .filter(|entry| entry.date == date)
        .cloned()
        .collect()
}

/// `reference`と同じ年月のエントリーを日付の新しい順で返す。
pub fn entries_in_month(entries: &[TimeEntry], reference: NaiveDate) -> Vec<TimeEntry> {
    let mut month_entries: Vec<TimeEntry> = entries
        .iter()
        .filter(|entry| is_same_month(entry.date, reference))
        .cloned()
        .collect();
    sort_by_date_desc(&mut month_entries);
    month_entries
}

/// 活動の種類ごとの件数。並びは活動の宣言順。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivityCounts([u32; 7]);

impl ActivityCounts {
    pub fn get(&self, activity: Activity) -> u32 {
        self.0[Self::index(activity)]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Activity, u32)> + '_ {
        Activity::ALL.into_iter().zip(self.0.iter().copied())
    }

    fn index(activity: Activity) -> usize {
        Activity::ALL
            .iter()
            .position(|a| *a == activity)
            .unwrap_or_default()
    }
}

/// 活動の種類ごとに、そのフラグが立っているエントリーの件数を数える。
pub fn activity_counts(entries: &[TimeEntry]) -> ActivityCounts {
    entries.iter().fold(ActivityCounts::default(), |mut counts, entry| {
        entry
            .flags
            .activities()
            .into_iter()
            .for_each(|activity| counts.0[ActivityCounts::index(activity)] += 1);
        counts
    })
}

/// 奉仕年度の範囲。`service_year - 1`年9月から`service_year`年8月まで。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceYearWindow {
    pub service_year: i32,
}

impl ServiceYearWindow {
    /// 開始月の0始まりの番号(9月)。
    pub const START_MONTH_INDEX: u32 = 8;
    /// 終了月の0始まりの番号(8月)。
    pub const THROUGH_MONTH_INDEX: u32 = 7;

    pub fn start_year(&self) -> i32 {
        self.service_year - 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let month_index = date.month0();
        (date.year() == self.start_year() && month_index >= Self::START_MONTH_INDEX)
            || (date.year() == self.service_year && month_index <= Self::THROUGH_MONTH_INDEX)
    }

    /// 年度内の12か月を(年, 月)の組で年度の順に返す。
    pub fn months(&self) -> impl Iterator<Item = (i32, Month)> + '_ {
        SERVICE_YEAR_MONTHS.into_iter().map(move |month| {
            if month.number_from_month() - 1 >= Self::START_MONTH_INDEX {
                (self.start_year(), month)
            } else {
                (self.service_year, month)
            }
        })
    }
}

pub fn service_year_window(service_year: i32) -> ServiceYearWindow {
    ServiceYearWindow { service_year }
}

/// 日付が属する奉仕年度。9月以降は翌年の年度になる。
pub fn service_year_of(date: NaiveDate) -> i32 {
    if date.month0() >= ServiceYearWindow::START_MONTH_INDEX {
        date.year() + 1
    } else {
        date.year()
    }
}

pub fn filter_by_service_year(entries: &[TimeEntry], service_year: i32) -> Vec<TimeEntry> {
    let window = service_year_window(service_year);
    entries
        .iter()
        .filter(|entry| window.contains(entry.date))
        .cloned()
        .collect()
}

pub fn activity_counts_for_service_year(
    entries: &[TimeEntry],
    service_year: i32,
) -> ActivityCounts {
    activity_counts(&filter_by_service_year(entries, service_year))
}

/// 月ごとの集計値。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: Month,
    pub value: u32,
}

impl MonthlyBucket {
    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }
}

/// 奉仕年度の12か月それぞれについて`metric`を合計する。
///
/// 9月から8月の順で必ず12個返す。エントリーの無い月は0。
pub fn monthly_buckets_for_service_year(
    entries: &[TimeEntry],
    service_year: i32,
    metric: Metric,
) -> Vec<MonthlyBucket> {
    let year_entries = filter_by_service_year(entries, service_year);
    service_year_window(service_year)
        .months()
        .map(|(year, month)| {
            let value = year_entries
                .iter()
                .filter(|entry| {
                    entry.date.year() == year && entry.date.month() == month.number_from_month()
                })
                .map(|entry| metric.value(entry))
                .sum();
            MonthlyBucket { year, month, value }
        })
        .collect()
}

/// 前半(9月から2月)と後半(3月から8月)に分ける。
pub fn split_half_years(buckets: &[MonthlyBucket]) -> (&[MonthlyBucket], &[MonthlyBucket]) {
    buckets.split_at(buckets.len().min(6))
}

/// 奉仕年度の合計と月平均。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearlyTotals {
    pub service_year: i32,
    pub total_hours: u32,
    pub total_studies: u32,
    pub average_hours: f64,
    pub average_studies: f64,
}

pub fn yearly_totals(entries: &[TimeEntry], service_year: i32) -> YearlyTotals {
    let year_entries = filter_by_service_year(entries, service_year);
    let total_hours: u32 = year_entries.iter().map(|e| e.ministry_hours).sum();
    let total_studies: u32 = year_entries.iter().map(|e| e.bible_studies).sum();

    YearlyTotals {
        service_year,
        total_hours,
        total_studies,
        average_hours: f64::from(total_hours) / f64::from(MONTHS_IN_SERVICE_YEAR),
        average_studies: f64::from(total_studies) / f64::from(MONTHS_IN_SERVICE_YEAR),
    }
}

/// 月間目標に対する進み具合。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoalProgress {
    pub total_hours: u32,
    pub goal_hours: u32,
}

impl GoalProgress {
    pub fn new(total_hours: u32, goal_hours: u32) -> Self {
        Self {
            total_hours,
            goal_hours,
        }
    }

    pub fn hours_left(&self) -> u32 {
        self.goal_hours.saturating_sub(self.total_hours)
    }

    /// 達成率。1.0で頭打ちにする。
    pub fn ratio(&self) -> f64 {
        if self.goal_hours == 0 {
            return 1.0;
        }
        (f64::from(self.total_hours) / f64::from(self.goal_hours)).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Month, NaiveDate};
    use rstest::rstest;

    use super::*;
    use crate::time_entry::{ActivityFlags, EntryId, TimeEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        id: u64,
        day: NaiveDate,
        hours: u32,
        studies: u32,
        activities: &[Activity],
    ) -> TimeEntry {
        TimeEntry {
            id: EntryId(id),
            date: day,
            ministry_hours: hours,
            bible_studies: studies,
            flags: ActivityFlags::from_activities(activities.iter().copied()),
        }
    }

    /// 2023年から2025年の各月15日にエントリーを1件ずつ作る。時間は月番号、研究は1。
    fn three_years() -> Vec<TimeEntry> {
        (2023..=2025)
            .flat_map(|y| (1..=12).map(move |m| (y, m)))
            .enumerate()
            .map(|(i, (y, m))| entry(i as u64, date(y, m, 15), m, 1, &[Activity::Others]))
            .collect()
    }

    #[test]
    fn test_sum_in_month() {
        let entries = vec![
            entry(1, date(2024, 3, 1), 2, 1, &[]),
            entry(2, date(2024, 3, 31), 3, 0, &[]),
            entry(3, date(2024, 4, 1), 5, 2, &[]),
            entry(4, date(2023, 3, 10), 7, 1, &[]),
        ];

        assert_eq!(sum_hours_in_month(&entries, date(2024, 3, 20)), 5);
        assert_eq!(sum_studies_in_month(&entries, date(2024, 3, 20)), 1);
        assert_eq!(sum_hours_in_month(&entries, date(2024, 5, 1)), 0);
    }

    #[test]
    fn test_activity_counts() {
        let entries = vec![
            entry(1, date(2024, 3, 1), 2, 0, &[Activity::HouseToHouse, Activity::ReturnVisit]),
            entry(2, date(2024, 3, 2), 2, 0, &[Activity::HouseToHouse]),
            entry(3, date(2024, 3, 3), 2, 0, &[]),
        ];

        let counts = activity_counts(&entries);

        assert_eq!(counts.get(Activity::HouseToHouse), 2);
        assert_eq!(counts.get(Activity::ReturnVisit), 1);
        assert_eq!(counts.get(Activity::Others), 0);
        assert_eq!(counts.iter().count(), 7);
        assert_eq!(counts.iter().next(), Some((Activity::HouseToHouse, 2)));
    }

    #[test]
    fn test_service_year_window() {
        let window = service_year_window(2025);

        assert_eq!(ServiceYearWindow::START_MONTH_INDEX, 8);
        assert_eq!(ServiceYearWindow::THROUGH_MONTH_INDEX, 7);
        assert_eq!(window.start_year(), 2024);
        let months: Vec<(i32, Month)> = window.months().collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], (2024, Month::September));
        assert_eq!(months[3], (2024, Month::December));
        assert_eq!(months[4], (2025, Month::January));
        assert_eq!(months[11], (2025, Month::August));
    }

    #[rstest]
    #[case::september_belongs_to_next(date(2024, 9, 15), 2025, true)]
    #[case::december(date(2024, 12, 31), 2025, true)]
    #[case::january(date(2025, 1, 1), 2025, true)]
    #[case::august(date(2025, 8, 31), 2025, true)]
    #[case::previous_august(date(2024, 8, 31), 2025, false)]
    #[case::next_september(date(2025, 9, 1), 2025, false)]
    #[case::january_of_current(date(2024, 1, 10), 2024, true)]
    #[case::january_of_next(date(2024, 1, 10), 2025, false)]
    fn test_window_contains(
        #[case] day: NaiveDate,
        #[case] service_year: i32,
        #[case] expected: bool,
    ) {
        assert_eq!(service_year_window(service_year).contains(day), expected);
    }

    #[rstest]
    #[case(date(2024, 9, 1), 2025)]
    #[case(date(2024, 8, 31), 2024)]
    #[case(date(2025, 1, 1), 2025)]
    fn test_service_year_of(#[case] day: NaiveDate, #[case] expected: i32) {
        assert_eq!(service_year_of(day), expected);
        assert!(service_year_window(expected).contains(day));
    }

    /// 年度でのフィルタは、該当する年月の組のエントリーをちょうど1回ずつ含む。
    #[rstest]
    #[case(2024)]
    #[case(2025)]
    fn test_filter_by_service_year_partition(#[case] service_year: i32) {
        let entries = three_years();

        let filtered = filter_by_service_year(&entries, service_year);

        assert_eq!(filtered.len(), 12);
        for e in &entries {
            let expected = (e.date.month() >= 9 && e.date.year() == service_year - 1)
                || (e.date.month() <= 8 && e.date.year() == service_year);
            let occurrences = filtered.iter().filter(|f| f.id == e.id).count();
            assert_eq!(occurrences, usize::from(expected), "{:?}", e.date);
        }
    }

    #[test]
    fn test_monthly_buckets() {
        let entries = three_years();

        let buckets = monthly_buckets_for_service_year(&entries, 2025, Metric::Hours);

        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].month_name(), "September");
        assert_eq!(buckets[0].year, 2024);
        assert_eq!(buckets[0].value, 9);
        assert_eq!(buckets[11].month_name(), "August");
        assert_eq!(buckets[11].value, 8);
        let bucket_total: u32 = buckets.iter().map(|b| b.value).sum();
        let direct_total: u32 = filter_by_service_year(&entries, 2025)
            .iter()
            .map(|e| e.ministry_hours)
            .sum();
        assert_eq!(bucket_total, direct_total);
    }

    #[test]
    fn test_monthly_buckets_empty_months() {
        let entries = vec![
            entry(1, date(2024, 10, 3), 2, 1, &[]),
            entry(2, date(2024, 10, 20), 3, 2, &[]),
        ];

        let buckets = monthly_buckets_for_service_year(&entries, 2025, Metric::Studies);

        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[1].month, Month::October);
        assert_eq!(buckets[1].value, 3);
        assert_eq!(buckets.iter().filter(|b| b.value == 0).count(), 11);
    }

    #[test]
    fn test_split_half_years() {
        let buckets = monthly_buckets_for_service_year(&[], 2025, Metric::Hours);

        let (first, second) = split_half_years(&buckets);

        assert_eq!(first.len(), 6);
        assert_eq!(first[0].month, Month::September);
        assert_eq!(first[5].month, Month::February);
        assert_eq!(second[0].month, Month::March);
        assert_eq!(second[5].month, Month::August);
    }

    /// 9月のエントリーは翌年の年度に含まれ、平均は12で割る。
    #[test]
    fn test_yearly_totals_september_entry() {
        let entries = vec![entry(1, date(2024, 9, 15), 5, 1, &[Activity::HouseToHouse])];

        let totals = yearly_totals(&entries, 2025);

        assert_eq!(totals.total_hours, 5);
        assert_eq!(totals.total_studies, 1);
        assert!((totals.average_hours - 5.0 / 12.0).abs() < 1e-12);
        assert!((totals.average_studies - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_yearly_totals_january_entry() {
        let entries = vec![entry(1, date(2024, 1, 10), 3, 0, &[Activity::Others])];

        assert_eq!(yearly_totals(&entries, 2024).total_hours, 3);
        assert_eq!(yearly_totals(&entries, 2025).total_hours, 0);
    }

    #[test]
    fn test_entries_on_and_in_month() {
        let entries = vec![
            entry(1, date(2024, 3, 1), 1, 0, &[]),
            entry(2, date(2024, 3, 9), 2, 0, &[]),
            entry(3, date(2024, 3, 1), 3, 0, &[]),
            entry(4, date(2024, 4, 1), 4, 0, &[]),
        ];

        let day: Vec<u64> = entries_on(&entries, date(2024, 3, 1)).iter().map(|e| e.id.0).collect();
        let month: Vec<u64> = entries_in_month(&entries, date(2024, 3, 15))
            .iter()
            .map(|e| e.id.0)
            .collect();

        assert_eq!(day, vec![1, 3]);
        assert_eq!(month, vec![2, 1, 3]);
    }

    #[rstest]
    #[case::halfway(25, 50, 25, 0.5)]
    #[case::reached(60, 50, 0, 1.0)]
    #[case::nothing(0, 50, 50, 0.0)]
    fn test_goal_progress(
        #[case] total: u32,
        #[case] goal: u32,
        #[case] left: u32,
        #[case] ratio: f64,
    ) {
        let progress = GoalProgress::new(total, goal);

        assert_eq!(progress.hours_left(), left);
        assert!((progress.ratio() - ratio).abs() < 1e-12);
    }
}
