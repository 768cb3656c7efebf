use slog::Drain;
use slog_atomic::{AtomicSwitch, AtomicSwitchCtrl};
use slog_term::{CompactFormat, TermDecorator};
use std::io;
use std::sync::Mutex;
use time::OffsetDateTime;

use eyre::Result;
use slog::*;

use crate::helpers::datetime::Timezone;

type TermDrain = Fuse<Mutex<Fuse<LevelFilter<CompactFormat<TermDecorator>>>>>;

pub struct Logger {
    pub log_level: Mutex<u8>,
    logger: slog::Logger,
    ctrl: AtomicSwitchCtrl,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(3)
    }
}

fn new_drain(level: Level) -> TermDrain {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator)
        .use_custom_timestamp(|w: &mut dyn io::Write| {
            write!(
                w,
                "{}",
                OffsetDateTime::now_utc()
                    .to_localtime()
                    .to_formatted_string()
            )
        })
        .build()
        .filter_level(level)
        .fuse();
    Mutex::new(drain).fuse()
}

// 0 = critical .. 5 = trace
fn level_from(log_level: u8) -> Level {
    match log_level {
        0 => Level::Critical,
        1 => Level::Error,
        2 => Level::Warning,
        3 => Level::Info,
        4 => Level::Debug,
        5 => Level::Trace,
        _ => Level::Debug,
    }
}

impl Logger {
    pub fn new(log_level: u8) -> Self {
        let drain = AtomicSwitch::new(new_drain(level_from(log_level)));
        let ctrl = drain.ctrl();
        let logger = slog::Logger::root(drain, slog::o!("version" => env!("CARGO_PKG_VERSION")));
        Logger {
            log_level: Mutex::new(log_level),
            logger,
            ctrl,
        }
    }

    /// Routes the `log` macros of every module into this logger
    pub fn set_global(&self) -> Result<&Self> {
        // slog_stdlog uses the logger from slog_scope, so set a logger there
        let guard = slog_scope::set_global_logger(self.logger.clone());
        // https://github.com/slog-rs/slog/issues/249
        guard.cancel_reset();
        slog_stdlog::init()?;
        Ok(self)
    }

    pub fn set_log_level(&self, log_level: u8) -> &Self {
        self.ctrl.set(new_drain(level_from(log_level)));
        if let Ok(mut ll) = self.log_level.lock() {
            *ll = log_level;
        }
        self
    }
}
