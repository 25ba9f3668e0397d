use crate::errors::DbError;
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "nexusdoc::audit";
pub const DEV6_TARGET: &str = "nexusdoc::dev6";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

/// Where and how much to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Base directory; the current directory when `None`.
    pub dir: Option<PathBuf>,
    /// error|warn|info|debug|trace, `info` otherwise.
    pub level: Option<String>,
    /// Number of rolled files kept per log.
    pub retention: Option<u32>,
    /// Persist `dev6!` traces to `dev6.log`.
    pub dev6: bool,
}

impl LogSettings {
    /// Settings from `NEXUSDOC_LOG_DIR`, `NEXUSDOC_LOG_LEVEL`, `NEXUSDOC_LOG_RETENTION`
    /// and `NEXUSDOC_DEV6`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var("NEXUSDOC_LOG_DIR").ok().map(PathBuf::from),
            level: std::env::var("NEXUSDOC_LOG_LEVEL").ok(),
            retention: std::env::var("NEXUSDOC_LOG_RETENTION").ok().and_then(|s| s.parse().ok()),
            dev6: std::env::var("NEXUSDOC_DEV6")
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.as_deref().unwrap_or("info").to_ascii_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    fn base_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

fn rolling(base: &Path, name: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = base.join(format!("{name}.{{}}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&pattern.display().to_string(), keep)
        .map_err(|e| DbError::Config(format!("log roller {name}: {e}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{name}.log")), Box::new(policy))
        .map_err(|e| DbError::Io(format!("log file {name}: {e}")))
}

/// log4rs configuration: `app.log` for everything, `audit.log` for deletes and other
/// audited writes, and `dev6.log` for developer traces when enabled.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn build_config(settings: &LogSettings) -> Result<Config, DbError> {
    let base = settings.base_dir();
    std::fs::create_dir_all(&base).map_err(|e| DbError::Io(format!("{}: {e}", base.display())))?;
    let keep = settings.retention.unwrap_or(DEFAULT_RETENTION);
    let lvl = settings.level_filter();

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, lvl));

    builder = if settings.dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(&base, "dev6", keep)?)))
            .logger(Logger::builder().appender("dev6").additive(false).build(DEV6_TARGET, LevelFilter::Trace))
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off))
    };

    builder
        .build(Root::builder().appender("app").build(lvl))
        .map_err(|e| DbError::Config(e.to_string()))
}

/// Installs the process-wide logger.
///
/// # Errors
/// Returns an error if the configuration cannot be built or a logger is already installed.
pub fn configure_logging(settings: &LogSettings) -> Result<log4rs::Handle, DbError> {
    let config = build_config(settings)?;
    log4rs::init_config(config).map_err(|e| DbError::Config(e.to_string()))
}

/// [`configure_logging`] with [`LogSettings::from_env`].
///
/// # Errors
/// Same conditions as [`configure_logging`].
pub fn configure_from_env() -> Result<log4rs::Handle, DbError> {
    configure_logging(&LogSettings::from_env())
}
