use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// stderr と `logs/<prefix>_<日時>.log` の両方へ出力する subscriber を登録
///
/// 作成したログファイルのパスを返す。
pub fn init(prefix: &str, level: LevelFilter) -> Result<String> {
    fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/{}_{}.log", prefix, ts);
    let file = File::create(&path)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(level)
        .try_init()?;

    eprintln!("Log: {}", path);
    Ok(path)
}
