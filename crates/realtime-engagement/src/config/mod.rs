use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::engagement::{AlertPolicy, EngagementSettings, ScoringWeights};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engagement: EngagementSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = parse_flag("APP_LOG_ANSI", false)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            engagement: load_engagement_settings()?,
        })
    }
}

/// Reads the `ENGAGEMENT_*` variables, falling back to the stock weights and policy.
pub fn load_engagement_settings() -> Result<EngagementSettings, ConfigError> {
    let defaults = EngagementSettings::default();

    let weights = ScoringWeights {
        quiz: parse_setting("ENGAGEMENT_QUIZ_WEIGHT", defaults.weights.quiz)?,
        forum: parse_setting("ENGAGEMENT_FORUM_WEIGHT", defaults.weights.forum)?,
        lesson: parse_setting("ENGAGEMENT_LESSON_WEIGHT", defaults.weights.lesson)?,
        video: parse_setting("ENGAGEMENT_VIDEO_WEIGHT", defaults.weights.video)?,
    };

    let threshold: u32 = parse_setting(
        "ENGAGEMENT_DISENGAGEMENT_THRESHOLD",
        u32::from(defaults.alerts.threshold),
    )?;
    let threshold = u8::try_from(threshold)
        .ok()
        .filter(|value| *value <= 100)
        .ok_or(ConfigError::ThresholdOutOfRange(threshold))?;

    let alerts = AlertPolicy {
        enabled: parse_flag("ENGAGEMENT_ALERT_NOTIFICATIONS", defaults.alerts.enabled)?,
        threshold,
    };

    let refresh_interval_secs = parse_setting(
        "ENGAGEMENT_REFRESH_INTERVAL",
        defaults.refresh_interval_secs,
    )?;

    Ok(EngagementSettings {
        weights,
        alerts,
        refresh_interval_secs,
    })
}

fn parse_setting<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidSetting { key, value: raw }),
        _ => Ok(default),
    }
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidSetting { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { key: &'static str, value: String },
    ThresholdOutOfRange(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { key, value } => {
                write!(f, "{key} has an unusable value '{value}'")
            }
            ConfigError::ThresholdOutOfRange(value) => write!(
                f,
                "ENGAGEMENT_DISENGAGEMENT_THRESHOLD must be between 0 and 100, got {value}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSetting { .. }
            | ConfigError::ThresholdOutOfRange(_) => None,
        }
    }
}
