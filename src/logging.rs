use anyhow::Result;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so it logs here instead.
    File(PathBuf),
}

pub fn default_log_file() -> PathBuf {
    let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home_dir).join(".taskflow").join("taskflow.log")
}

pub fn build_config(level: LevelFilter, target: &LogTarget) -> Result<Config> {
    let appender: Box<dyn log4rs::append::Append> = match target {
        LogTarget::Stderr => Box::new(
            ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(Box::new(PatternEncoder::new("{h({l})} {t} - {m}{n}")))
                .build(),
        ),
        LogTarget::File(path) => Box::new(
            FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(
                    "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
                )))
                .build(path)?,
        ),
    };

    let config = Config::builder()
        .appender(Appender::builder().build("main", appender))
        .logger(Logger::builder().build("hyper", LevelFilter::Warn))
        .logger(Logger::builder().build("reqwest", LevelFilter::Warn))
        .logger(Logger::builder().build("rustls", LevelFilter::Warn))
        .build(Root::builder().appender("main").build(level))?;
    Ok(config)
}

pub fn init(level: LevelFilter, target: &LogTarget) -> Result<()> {
    log4rs::init_config(build_config(level, target)?)?;
    Ok(())
}
