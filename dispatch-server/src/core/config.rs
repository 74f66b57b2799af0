use chrono_tz::Tz;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// 派单服务配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_URL | sqlite:./work_dir/dispatch.db | SQLite 数据库 |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | TX_TIMEOUT_MS | 8000 | 事务超时(毫秒) |
/// | CHALLENGE_WINDOW_DAYS | 60 | 撞单保护期(天) |
/// | BUSINESS_TZ | Asia/Shanghai | 业务时区 (统计日) |
/// | NOTIFY_CHANNEL_CAPACITY | 1024 | 通知广播通道容量 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | LOG_DIR | (未设置) | 日志目录，未设置时只输出到控制台 |
/// | ENVIRONMENT | development | 运行环境 |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Transaction Coordinator deadline
    pub tx_timeout: Duration,
    pub challenge_window_days: i64,
    pub timezone: Tz,
    pub notify_channel_capacity: usize,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// development | staging | production
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./work_dir/dispatch.db".into(),
            db_max_connections: 5,
            tx_timeout: Duration::from_millis(8000),
            challenge_window_days: 60,
            timezone: chrono_tz::Asia::Shanghai,
            notify_channel_capacity: 1024,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            environment: "development".into(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的变量使用默认值；设置了但无法解析的变量返回错误。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timezone = match lookup("BUSINESS_TZ") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "BUSINESS_TZ",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.timezone,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.db_max_connections),
            tx_timeout: parse_var::<u64>(&lookup, "TX_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.tx_timeout),
            challenge_window_days: parse_var(&lookup, "CHALLENGE_WINDOW_DAYS")?
                .unwrap_or(defaults.challenge_window_days),
            timezone,
            notify_channel_capacity: parse_var(&lookup, "NOTIFY_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.notify_channel_capacity),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_var(&lookup, "LOG_JSON")?.unwrap_or(defaults.log_json),
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
