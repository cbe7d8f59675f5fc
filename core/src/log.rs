//! Logger initialization. For the macros to properly compile, the calling
//! crate must add a dependency to the log crate.

pub use log::{Level, LevelFilter};

use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5.5})}] {m}{n}";
const LOG_FILE_NAME: &str = "kaspad.log";
const LOG_FILE_MAX_SIZE: u64 = 64 * 1024 * 1024;
const LOG_FILE_MAX_ROLLS: u32 = 8;

/// Initializes the global logger with a console appender and, when a log
/// directory is provided, a size-rolling file appender
pub fn init_logger(log_dir: Option<&str>, level: LevelFilter) {
    const CONSOLE_APPENDER: &str = "stdout";
    const LOG_FILE_APPENDER: &str = "log_file";

    let stdout = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_PATTERN))).build();
    let mut config_builder = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stdout)));
    let mut root_builder = Root::builder().appender(CONSOLE_APPENDER);

    if let Some(log_dir) = log_dir {
        let file_path = std::path::Path::new(log_dir).join(LOG_FILE_NAME);
        let roll_pattern = format!("{}.{{}}.gz", file_path.display());
        let policy = CompoundPolicy::new(
            Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)),
            Box::new(FixedWindowRoller::builder().build(&roll_pattern, LOG_FILE_MAX_ROLLS).expect("roller pattern is valid")),
        );
        let file_appender = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(file_path, Box::new(policy))
            .expect("the log file is creatable");
        config_builder = config_builder.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(file_appender)));
        root_builder = root_builder.appender(LOG_FILE_APPENDER);
    }

    let config = config_builder.build(root_builder.build(level)).expect("logger config is valid");
    let _ = log4rs::init_config(config);
}
