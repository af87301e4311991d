use chrono::{Local, NaiveDate};

#[cfg(not(test))]
/// Localタイムゾーンでの今日の日付を取得する。
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}


#[cfg(test)]
pub use mock_date::today;
