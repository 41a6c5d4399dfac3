//! Logging setup on `log` + `log4rs`.
//!
//! Filtering is whitelist-based: the root logger defaults to `Off`, so
//! third-party crates stay silent unless opted in. The filter string
//! combines comma-separated parts:
//!
//! - a bare level (`"debug"`) sets the level for this crate
//! - `<module>=<level>` opts a specific module or crate in
//! - `root=<level>` opens the root logger for everything else

use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use std::io::IsTerminal;
use std::path::Path;

const APP_TARGET: &str = "tether_core";

const LOG_FILE_NAME: &str = "tether.log";
const ROLL_SIZE_BYTES: u64 = 20_000_000;
const ROLL_COUNT: u32 = 3;

const CONSOLE_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:5})} {t} {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {l:5} {t} {m}{n}";

/// Parsed form of the filter string. Unparseable parts are ignored.
#[derive(Debug, PartialEq, Eq)]
struct FilterSpec {
    app_level: LevelFilter,
    root_level: LevelFilter,
    module_levels: Vec<(String, LevelFilter)>,
}

impl FilterSpec {
    fn parse(filters: &str) -> Self {
        let mut spec =
            Self { app_level: LevelFilter::Info, root_level: LevelFilter::Off, module_levels: Vec::new() };
        for part in filters.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                None => {
                    if let Ok(level) = part.parse() {
                        spec.app_level = level;
                    }
                }
                Some((module, level)) => {
                    let (module, level) = (module.trim(), level.trim());
                    let Ok(level) = level.parse() else { continue };
                    match module {
                        "" => {}
                        "root" => spec.root_level = level,
                        APP_TARGET => spec.app_level = level,
                        _ => spec.module_levels.push((module.to_string(), level)),
                    }
                }
            }
        }
        spec
    }
}

/// Initializes the global logger: stderr console output, plus a rolling
/// file in `log_dir` when one is given.
///
/// The logger is global; repeated calls are ignored. A log directory that
/// cannot be set up degrades to console-only rather than failing startup.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    let spec = FilterSpec::parse(filters);

    let console_pattern = if std::io::stderr().is_terminal() { CONSOLE_PATTERN } else { FILE_PATTERN };
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(console_pattern)))
        .build();

    let mut builder = Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut sinks = vec!["console".to_string()];

    if let Some(dir) = log_dir.map(str::trim).filter(|d| !d.is_empty()) {
        match rolling_file(Path::new(dir)) {
            Ok(file) => {
                builder = builder.appender(Appender::builder().build("file", Box::new(file)));
                sinks.push("file".to_string());
            }
            Err(reason) => eprintln!("file logging disabled dir={} reason={}", dir, reason),
        }
    }

    builder = builder
        .logger(Logger::builder().appenders(sinks.clone()).additive(false).build(APP_TARGET, spec.app_level));
    for (module, level) in &spec.module_levels {
        builder =
            builder.logger(Logger::builder().appenders(sinks.clone()).additive(false).build(module, *level));
    }

    match builder.build(Root::builder().appenders(sinks).build(spec.root_level)) {
        Ok(config) => {
            let _ = log4rs::init_config(config);
        }
        Err(err) => eprintln!("logger configuration rejected: {}", err),
    }
}

fn rolling_file(dir: &Path) -> Result<RollingFileAppender, String> {
    let archive = dir.join(format!("{LOG_FILE_NAME}.{{}}.gz"));
    let archive = archive.to_str().ok_or_else(|| "log dir is not valid UTF-8".to_string())?;
    let roller = FixedWindowRoller::builder().base(1).build(archive, ROLL_COUNT).map_err(|e| e.to_string())?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE_BYTES)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(dir.join(LOG_FILE_NAME), Box::new(policy))
        .map_err(|e| e.to_string())
}
