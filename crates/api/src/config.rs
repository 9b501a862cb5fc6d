use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use domain::services::geofence::DEFAULT_ACCURACY_THRESHOLD_METERS;
use domain::services::{AlertRules, ServiceSettings};
use persistence::db::DatabaseConfig;
use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError};

/// Largest UTC offset accepted for the site wall clock.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// JWT authentication configuration
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub geofence: GeofenceConfig,
    /// Alert rules and the background scheduler
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Notification dispatch backend
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format for signing tokens
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Shared HS256 secret, used only when no key pair is configured
    #[serde(default)]
    pub secret: String,

    /// Access token expiration in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl JwtAuthConfig {
    fn has_key_pair(&self) -> bool {
        !self.private_key.is_empty() && !self.public_key.is_empty()
    }

    /// Builds the token codec, preferring the RSA key pair.
    pub fn to_jwt_config(&self) -> Result<JwtConfig, JwtError> {
        if self.has_key_pair() {
            JwtConfig::from_rsa_pem(
                &self.private_key,
                &self.public_key,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        } else {
            JwtConfig::from_secret(
                &self.secret,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeofenceConfig {
    /// Strict-mode fences reject fixes less accurate than this
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold_meters: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_meters: default_accuracy_threshold(),
        }
    }
}

/// Alert rules, in local wall-clock time of the sites.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Start the scheduler with the server
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_alert_interval")]
    pub interval_minutes: u64,

    /// Offset of the site wall clock from UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Default shift start ("HH:MM") for assignments without one
    #[serde(default = "default_shift_start")]
    pub shift_start: String,

    /// Default shift end ("HH:MM") for assignments without one
    #[serde(default = "default_shift_end")]
    pub shift_end: String,

    #[serde(default = "default_missed_login_grace")]
    pub missed_login_grace_minutes: u32,

    #[serde(default = "default_missed_logout_grace")]
    pub missed_logout_grace_minutes: u32,

    #[serde(default = "default_lunch_time")]
    pub lunch_time: String,

    #[serde(default = "default_lunch_reminder_lead")]
    pub lunch_reminder_lead_minutes: u32,

    /// Defaults to the wake interval; shorter windows are rejected
    #[serde(default)]
    pub lunch_reminder_window_minutes: Option<u32>,

    #[serde(default = "default_overtime_start")]
    pub overtime_start: String,

    /// Defaults to the wake interval; shorter windows are rejected
    #[serde(default)]
    pub overtime_window_minutes: Option<u32>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_alert_interval(),
            utc_offset_minutes: 0,
            shift_start: default_shift_start(),
            shift_end: default_shift_end(),
            missed_login_grace_minutes: default_missed_login_grace(),
            missed_logout_grace_minutes: default_missed_logout_grace(),
            lunch_time: default_lunch_time(),
            lunch_reminder_lead_minutes: default_lunch_reminder_lead(),
            lunch_reminder_window_minutes: None,
            overtime_start: default_overtime_start(),
            overtime_window_minutes: None,
        }
    }
}

impl AlertsConfig {
    /// Period of the scheduler wake.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigValidationError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigValidationError::InvalidValue(format!(
                "alerts.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}, got {}",
                self.utc_offset_minutes
            )));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigValidationError::InvalidValue(format!(
                "alerts.utc_offset_minutes is not a valid offset: {}",
                self.utc_offset_minutes
            ))
        })
    }

    /// Length of a rule window in minutes, the wake interval when unset.
    fn window_minutes(&self, configured: Option<u32>) -> u64 {
        configured.map_or(self.interval_minutes, u64::from)
    }

    /// Every wake phase must land in each rule window at least once.
    fn check_window(
        &self,
        name: &str,
        configured: Option<u32>,
    ) -> Result<(), ConfigValidationError> {
        let window = self.window_minutes(configured);
        if window < self.interval_minutes {
            return Err(ConfigValidationError::InvalidValue(format!(
                "alerts.{name} ({window}) cannot be shorter than alerts.interval_minutes ({})",
                self.interval_minutes
            )));
        }
        Ok(())
    }

    /// Converts the configured clock times and periods into alert rules.
    pub fn rules(&self) -> Result<AlertRules, ConfigValidationError> {
        let window = |configured| {
            chrono::Duration::minutes(
                i64::try_from(self.window_minutes(configured)).unwrap_or(i64::MAX / 60_000),
            )
        };

        Ok(AlertRules {
            shift_start: parse_clock("shift_start", &self.shift_start)?,
            shift_end: parse_clock("shift_end", &self.shift_end)?,
            missed_login_grace: minutes(self.missed_login_grace_minutes),
            missed_logout_grace: minutes(self.missed_logout_grace_minutes),
            lunch_time: parse_clock("lunch_time", &self.lunch_time)?,
            lunch_reminder_lead: minutes(self.lunch_reminder_lead_minutes),
            lunch_reminder_window: window(self.lunch_reminder_window_minutes),
            overtime_start: parse_clock("overtime_start", &self.overtime_start)?,
            overtime_window: window(self.overtime_window_minutes),
        })
    }
}

fn minutes(value: u32) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(value))
}

fn parse_clock(name: &str, value: &str) -> Result<NaiveTime, ConfigValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        ConfigValidationError::InvalidValue(format!(
            "alerts.{name} must be a HH:MM clock time, got '{value}'"
        ))
    })
}

/// Notification dispatch backend.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// POST alerts to `url`; when disabled they are only logged
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_notification_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            timeout_ms: default_notification_timeout(),
            language: default_language(),
        }
    }
}

impl NotificationsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_access_token_expiry() -> i64 {
    3600 // 1 hour
}
fn default_jwt_leeway() -> u64 {
    30 // 30 seconds for clock skew tolerance
}
fn default_accuracy_threshold() -> f64 {
    DEFAULT_ACCURACY_THRESHOLD_METERS
}
fn default_true() -> bool {
    true
}
fn default_alert_interval() -> u64 {
    15
}
fn default_shift_start() -> String {
    "08:00".to_string()
}
fn default_shift_end() -> String {
    "17:00".to_string()
}
fn default_missed_login_grace() -> u32 {
    15
}
fn default_missed_logout_grace() -> u32 {
    30
}
fn default_lunch_time() -> String {
    "12:00".to_string()
}
fn default_lunch_reminder_lead() -> u32 {
    10
}
fn default_overtime_start() -> String {
    "18:00".to_string()
}
fn default_notification_timeout() -> u64 {
    5000
}
fn default_language() -> String {
    domain::services::notification::DEFAULT_LANGUAGE.to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SA__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SA").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600
            query_timeout_ms = 5000

            [logging]
            level = "info"
            format = "json"

            [jwt]
            secret = "test_secret_key_for_jwt_testing_12345"
            access_token_expiry_secs = 3600
            leeway_secs = 30

            [alerts]
            enabled = true
            interval_minutes = 15
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SA__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if !self.jwt.has_key_pair() && self.jwt.secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "jwt.private_key and jwt.public_key, or jwt.secret, must be set".to_string(),
            ));
        }

        let threshold = self.geofence.accuracy_threshold_meters;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(format!(
                "geofence.accuracy_threshold_meters must be positive, got {threshold}"
            )));
        }

        if self.alerts.interval_minutes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "alerts.interval_minutes cannot be 0".to_string(),
            ));
        }

        let alerts = &self.alerts;
        alerts.check_window(
            "lunch_reminder_window_minutes",
            alerts.lunch_reminder_window_minutes,
        )?;
        alerts.check_window("overtime_window_minutes", alerts.overtime_window_minutes)?;

        self.alerts.utc_offset()?;
        self.alerts.rules()?;

        if self.notifications.enabled && self.notifications.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "notifications.url must be set when notifications are enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Timeouts and locale handed to the domain services.
    pub fn service_settings(&self) -> Result<ServiceSettings, ConfigValidationError> {
        Ok(ServiceSettings {
            store_timeout: self.database.query_timeout(),
            notification_timeout: self.notifications.timeout(),
            utc_offset: self.alerts.utc_offset()?,
            language: self.notifications.language.clone(),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
