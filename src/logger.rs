use std::str::FromStr;

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// ログ出力を設定する。
///
/// 環境変数`RUST_LOG`が設定されていればそちらを優先する。
/// 出力は標準エラーなので、標準出力に書く集計結果とは混ざらない。
///
/// # Arguments
///
/// * `level` - 設定ファイルで指定されたログレベル
pub fn setup_logger(level: &str) -> Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    let level = LevelFilter::from_str(&level)
        .with_context(|| format!("Invalid log level: {}", level))?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}
