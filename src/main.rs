use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{info, warn};

use timewise::config::Config;
use timewise::console::{ConsoleMarkdownList, ConsolePresenter};
use timewise::daily_command::{DailyArgs, DailyCommand};
use timewise::entry_command::{AddArgs, DeleteArgs, EditArgs, EntryCommand};
use timewise::logger::setup_logger;
use timewise::monthly_command::{MonthlyArgs, MonthlyCommand};
use timewise::notify::{ChangeBridge, Subscription};
use timewise::repository::{EntryRepository, LocalEntryRepository};
use timewise::storage::FileStorage;
use timewise::storage_guard::StorageGuard;
use timewise::yearly_command::{YearlyArgs, YearlyCommand};

/// 奉仕活動の時間を記録、集計するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- add -H 2 -a house-to-house
/// $ cargo run -- monthly --report
/// $ cargo run -- yearly -y 2025
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(long = "data-dir", help = "Overrides the directory where entries are stored")]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    Add(AddArgs),
    Edit(EditArgs),
    Delete(DeleteArgs),
    Daily(DailyArgs),
    Monthly(MonthlyArgs),
    Yearly(YearlyArgs),
    /// Shows how much of the storage quota is used
    Usage,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("Failed to load config")?;
    setup_logger(&config.log_level)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let storage = FileStorage::new(config.storage_path())
        .with_context(|| format!("Failed to open storage in {:?}", config.data_dir))?;
    info!("Using storage file {:?}", storage.path());
    let guard = StorageGuard::with_quota(storage, config.quota_bytes);
    let mut repository = LocalEntryRepository::new(guard, ChangeBridge::new());
    let changes = repository.subscribe();

    let mut stdout = io::stdout();
    match args.subcommand {
        SubCommands::Add(add) => {
            let entry = EntryCommand::new(&mut repository).add(add)?;
            show_changed_day(&repository, &changes, entry.date, &mut stdout)?;
        }
        SubCommands::Edit(edit) => {
            let entry = EntryCommand::new(&mut repository).edit(edit)?;
            show_changed_day(&repository, &changes, entry.date, &mut stdout)?;
        }
        SubCommands::Delete(delete) => {
            let removed = EntryCommand::new(&mut repository).delete(delete)?;
            if removed == 0 {
                warn!("No time entry matched, nothing was deleted.");
            }
            writeln!(stdout, "Deleted {} time entries.", removed)?;
        }
        SubCommands::Daily(daily) => {
            let entries = DailyCommand::new(&repository).run(daily)?;
            ConsoleMarkdownList::new(&mut stdout).show_time_entries(&entries)?;
        }
        SubCommands::Monthly(monthly) => {
            let report_only = monthly.report;
            let summary = MonthlyCommand::new(&repository, config.monthly_goal_hours).run(monthly)?;
            if report_only {
                let text = summary.report.to_string();
                write!(stdout, "{}", text)?;
                if !text.ends_with('\n') {
                    writeln!(stdout)?;
                }
            } else {
                let mut presenter = ConsoleMarkdownList::new(&mut stdout);
                presenter.show_monthly_summary(&summary.report, &summary.goal, &summary.counts)?;
                presenter.show_time_entries(&summary.entries)?;
            }
        }
        SubCommands::Yearly(yearly) => {
            let summary = YearlyCommand::new(&repository).run(yearly)?;
            ConsoleMarkdownList::new(&mut stdout).show_yearly_summary(
                &summary.totals,
                &summary.hours,
                &summary.studies,
                &summary.counts,
            )?;
        }
        SubCommands::Usage => {
            let guard = repository.guard();
            writeln!(
                stdout,
                "{} of {} bytes used ({:.1}%)",
                guard.current_usage(),
                guard.quota(),
                guard.usage_percentage()
            )?;
            if guard.is_near_capacity() {
                warn!("Local storage is nearly full! Please backup and clear some data.");
            }
        }
    }

    Ok(())
}

/// 変更通知を受け取っていれば、変更のあった日のエントリーを読み直して表示する。
fn show_changed_day<T: EntryRepository, W: Write>(
    repository: &T,
    changes: &Subscription,
    date: NaiveDate,
    writer: &mut W,
) -> Result<()> {
    if !changes.poll() {
        return Ok(());
    }

    let entries = DailyCommand::new(repository).run(DailyArgs { date: Some(date) })?;
    ConsoleMarkdownList::new(writer).show_time_entries(&entries)
}
