use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::info;

use crate::daily_command::parse_date;
use crate::datetime;
use crate::repository::{EntryMatcher, EntryRepository};
use crate::time_entry::{Activity, ActivityFlags, EntryDraft, EntryId, EntryPatch, TimeEntry};

/// `add`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct AddArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(short = 'H', long = "hours", help = "Hours spent in the ministry")]
    pub hours: u32,

    #[clap(short = 's', long = "studies", default_value = "0", help = "Bible studies conducted")]
    pub studies: u32,

    #[clap(
        short = 'a',
        long = "activity",
        help = "Type of ministry, e.g. house-to-house (repeatable)"
    )]
    pub activities: Vec<Activity>,
}

/// `edit`サブコマンドの引数を表す構造体。指定しなかった項目は変更しない。
#[derive(Debug, clap::Args)]
pub struct EditArgs {
    #[clap(long = "id", help = "Id of the entry to edit")]
    pub id: EntryId,

    #[clap(
        short = 'd',
        long = "date",
        help = "New date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(short = 'H', long = "hours", help = "New hours spent in the ministry")]
    pub hours: Option<u32>,

    #[clap(short = 's', long = "studies", help = "New number of Bible studies")]
    pub studies: Option<u32>,

    #[clap(
        short = 'a',
        long = "activity",
        help = "Replaces the types of ministry (repeatable)"
    )]
    pub activities: Vec<Activity>,
}

/// `delete`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct DeleteArgs {
    #[clap(
        long = "id",
        help = "Id of the entry to delete",
        conflicts_with = "date",
        required_unless_present = "date"
    )]
    pub id: Option<EntryId>,

    #[clap(
        long = "date",
        help = "Deletes every entry on this date (YYYY-MM-DD)",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,
}

/// エントリーを追加、編集、削除するコマンド。
///
/// 入力の検証はリポジトリを呼ぶ前に行い、失敗した場合はリポジトリに触れない。
pub struct EntryCommand<'a, T: EntryRepository> {
    repository: &'a mut T,
}

impl<'a, T: EntryRepository> EntryCommand<'a, T> {
    /// 新しい`EntryCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーを保存するリポジトリ
    pub fn new(repository: &'a mut T) -> Self {
        Self { repository }
    }

    /// `add`サブコマンドの処理を行う。日付が指定されていない場合は今日の日付を利用する。
    pub fn add(&mut self, args: AddArgs) -> Result<TimeEntry> {
        let draft = EntryDraft {
            date: Some(args.date.unwrap_or_else(datetime::today)),
            ministry_hours: args.hours,
            bible_studies: args.studies,
            flags: ActivityFlags::from_activities(args.activities),
        };
        let entry = draft.validate().context("Invalid time entry")?;

        let entry = self
            .repository
            .add(entry)
            .context("Failed to save time entry")?;
        info!("Time entry {} saved.", entry.id);

        Ok(entry)
    }

    /// `edit`サブコマンドの処理を行う。更新後のエントリーを返す。
    pub fn edit(&mut self, args: EditArgs) -> Result<TimeEntry> {
        let patch = EntryPatch {
            date: args.date,
            ministry_hours: args.hours,
            bible_studies: args.studies,
            flags: (!args.activities.is_empty())
                .then(|| ActivityFlags::from_activities(args.activities)),
        };
        if patch.is_empty() {
            bail!("Nothing to edit for time entry {}", args.id);
        }

        let current = self
            .repository
            .list()
            .into_iter()
            .find(|entry| entry.id == args.id)
            .with_context(|| format!("Time entry {} not found", args.id))?;
        patch
            .to_draft(&current)
            .validate()
            .context("Invalid time entry")?;

        self.repository
            .update(&EntryMatcher::Id(args.id), &patch)
            .context("Failed to update time entry")?;
        info!("Time entry {} updated.", args.id);

        Ok(patch.apply(&current))
    }

    /// `delete`サブコマンドの処理を行う。削除した件数を返す。
    pub fn delete(&mut self, args: DeleteArgs) -> Result<usize> {
        let matcher = match (args.id, args.date) {
            (Some(id), _) => EntryMatcher::Id(id),
            (None, Some(date)) => EntryMatcher::Date(date),
            (None, None) => bail!("Either --id or --date is required"),
        };

        let removed = self
            .repository
            .remove(&matcher)
            .context("Failed to delete time entry")?;
        info!("{} time entries deleted.", removed);

        Ok(removed)
    }
}
