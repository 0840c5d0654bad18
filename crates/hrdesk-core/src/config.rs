//! Configuration module
//!
//! This module provides configuration structures for the report service,
//! including HTTP, database, storage, job scheduling and notification settings.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 4000;

/// Base configuration shared by every hrdesk process
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// "compact" (default) or "json"
    pub log_format: String,
}

/// Report service configuration
#[derive(Clone, Debug)]
pub struct ReportServiceConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Artifact storage
    pub local_storage_path: String,
    // Job scheduling
    pub report_queue_capacity: usize,
    pub report_max_concurrent_jobs: usize,
    /// Upper bound for a single generation run in seconds. 0 = disabled.
    pub report_job_timeout_secs: u64,
    /// Interval in seconds between runs of the stale report reaper. 0 = disabled.
    pub report_stale_reap_interval_secs: u64,
    /// Age in seconds after which a GENERATING report is considered abandoned.
    pub report_stale_after_secs: u64,
    // Notifications
    pub notification_max_attempts: u32,
    pub notification_retry_base_ms: u64,
    // Rendering
    pub report_organization_name: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ReportServiceConfig>);

impl Config {
    fn as_service(&self) -> &ReportServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.as_service().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ReportServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_service().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_service().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_service().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_service().base.log_format
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_service().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_service().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.as_service().database_url
    }

    pub fn local_storage_path(&self) -> &str {
        &self.as_service().local_storage_path
    }

    pub fn report_queue_capacity(&self) -> usize {
        self.as_service().report_queue_capacity
    }

    pub fn report_max_concurrent_jobs(&self) -> usize {
        self.as_service().report_max_concurrent_jobs
    }

    pub fn report_job_timeout_secs(&self) -> u64 {
        self.as_service().report_job_timeout_secs
    }

    pub fn report_stale_reap_interval_secs(&self) -> u64 {
        self.as_service().report_stale_reap_interval_secs
    }

    pub fn report_stale_after_secs(&self) -> u64 {
        self.as_service().report_stale_after_secs
    }

    pub fn notification_max_attempts(&self) -> u32 {
        self.as_service().notification_max_attempts
    }

    pub fn notification_retry_base_ms(&self) -> u64 {
        self.as_service().notification_retry_base_ms
    }

    pub fn report_organization_name(&self) -> &str {
        &self.as_service().report_organization_name
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl ReportServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const REPORT_QUEUE_CAPACITY: usize = 256;
        const REPORT_MAX_CONCURRENT_JOBS: usize = 4;
        const REPORT_JOB_TIMEOUT_SECS: u64 = 900;
        const REPORT_STALE_REAP_INTERVAL_SECS: u64 = 300;
        const REPORT_STALE_AFTER_SECS: u64 = 3600;
        const NOTIFICATION_MAX_ATTEMPTS: u32 = 3;
        const NOTIFICATION_RETRY_BASE_MS: u64 = 100;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
        };

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

        let config = ReportServiceConfig {
            base,
            database_url,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/reports".to_string()),
            report_queue_capacity: env::var("REPORT_QUEUE_CAPACITY")
                .unwrap_or_else(|_| REPORT_QUEUE_CAPACITY.to_string())
                .parse()
                .unwrap_or(REPORT_QUEUE_CAPACITY),
            report_max_concurrent_jobs: env::var("REPORT_MAX_CONCURRENT_JOBS")
                .unwrap_or_else(|_| REPORT_MAX_CONCURRENT_JOBS.to_string())
                .parse()
                .unwrap_or(REPORT_MAX_CONCURRENT_JOBS),
            report_job_timeout_secs: env::var("REPORT_JOB_TIMEOUT_SECS")
                .unwrap_or_else(|_| REPORT_JOB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REPORT_JOB_TIMEOUT_SECS),
            report_stale_reap_interval_secs: env::var("REPORT_STALE_REAP_INTERVAL_SECS")
                .unwrap_or_else(|_| REPORT_STALE_REAP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(REPORT_STALE_REAP_INTERVAL_SECS),
            report_stale_after_secs: env::var("REPORT_STALE_AFTER_SECS")
                .unwrap_or_else(|_| REPORT_STALE_AFTER_SECS.to_string())
                .parse()
                .unwrap_or(REPORT_STALE_AFTER_SECS),
            notification_max_attempts: env::var("NOTIFICATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| NOTIFICATION_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(NOTIFICATION_MAX_ATTEMPTS),
            notification_retry_base_ms: env::var("NOTIFICATION_RETRY_BASE_MS")
                .unwrap_or_else(|_| NOTIFICATION_RETRY_BASE_MS.to_string())
                .parse()
                .unwrap_or(NOTIFICATION_RETRY_BASE_MS),
            report_organization_name: env::var("REPORT_ORGANIZATION_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "HR Analytics".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.local_storage_path.trim().is_empty() {
            return Err(anyhow::anyhow!("LOCAL_STORAGE_PATH must not be empty"));
        }

        if self.report_queue_capacity == 0 {
            return Err(anyhow::anyhow!(
                "REPORT_QUEUE_CAPACITY must be greater than zero"
            ));
        }

        if self.report_max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!(
                "REPORT_MAX_CONCURRENT_JOBS must be greater than zero"
            ));
        }

        if self.notification_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "NOTIFICATION_MAX_ATTEMPTS must be at least 1"
            ));
        }

        // The reaper must never fail a job that is still inside its own timeout window
        if self.report_stale_reap_interval_secs > 0
            && self.report_job_timeout_secs > 0
            && self.report_stale_after_secs <= self.report_job_timeout_secs
        {
            return Err(anyhow::anyhow!(
                "REPORT_STALE_AFTER_SECS must be greater than REPORT_JOB_TIMEOUT_SECS"
            ));
        }

        if !matches!(self.base.log_format.as_str(), "compact" | "json") {
            return Err(anyhow::anyhow!("LOG_FORMAT must be 'compact' or 'json'"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ReportServiceConfig {
        ReportServiceConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                environment: "development".to_string(),
                log_format: "compact".to_string(),
            },
            database_url: "postgresql://localhost/hrdesk".to_string(),
            local_storage_path: "/tmp/reports".to_string(),
            report_queue_capacity: 16,
            report_max_concurrent_jobs: 2,
            report_job_timeout_secs: 900,
            report_stale_reap_interval_secs: 300,
            report_stale_after_secs: 3600,
            notification_max_attempts: 3,
            notification_retry_base_ms: 100,
            report_organization_name: "Acme HR".to_string(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let mut config = sample_config();
        config.database_url = "mysql://localhost/hrdesk".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stale_threshold_must_exceed_job_timeout() {
        let mut config = sample_config();
        config.report_stale_after_secs = 600;
        assert!(config.validate().is_err());

        // Disabling the reaper lifts the constraint
        config.report_stale_reap_interval_secs = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = sample_config();
        config.report_max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut inner = sample_config();
        inner.base.environment = "Prod".to_string();
        let config = Config(Box::new(inner));
        assert!(config.is_production());
        assert_eq!(config.report_organization_name(), "Acme HR");
    }
}
