use log::LevelFilter;
use log4rs::Config;
use log4rs::append::Append;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::Path;

const PATTERN: &str =
    "[{date(%Y-%m-%d %H:%M:%S%.3f)} {highlight({level}):5} {target}] {highlight({message})}{n}";

/// Installs the global logger, writing to `path` if given, otherwise to stderr.
pub fn init(path: Option<&Path>, verbose: u8) -> Result<(), Box<dyn Error>> {
    let encoder = Box::new(PatternEncoder::new(PATTERN));
    let appender: Box<dyn Append> = match path {
        Some(path) => Box::new(FileAppender::builder().encoder(encoder).build(path)?),
        None => Box::new(
            ConsoleAppender::builder()
                .encoder(encoder)
                .target(Target::Stderr)
                .build(),
        ),
    };

    let config = Config::builder()
        .appender(Appender::builder().build("default", appender))
        .build(Root::builder().appender("default").build(level_filter(verbose)))?;

    log4rs::init_config(config)?;

    Ok(())
}

pub fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
