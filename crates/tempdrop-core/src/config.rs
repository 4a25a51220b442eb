//! Configuration module
//!
//! Settings come from the environment (a `.env` file is loaded first). Only the
//! provider account name and public key are required; without them the system is
//! considered unconfigured and the CLI shows setup guidance instead of running.

use chrono::Duration;
use std::env;
use std::path::PathBuf;

use crate::constants::{BATCH_DELETE_CONCURRENCY, RETENTION_HOURS, UPLOAD_TIMEOUT_SECS};
use crate::delete_mode::{DeleteMode, RemovalPolicy};
use crate::error::AppError;

const CLOUD_NAME_VAR: &str = "TEMPDROP_CLOUD_NAME";
const API_KEY_VAR: &str = "TEMPDROP_API_KEY";

/// Tempdrop configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub upload_preset: String,
    pub api_base_url: String,
    pub delete_mode: DeleteMode,
    pub removal_policy: RemovalPolicy,
    pub index_path: PathBuf,
    pub retention_hours: i64,
    pub upload_timeout_secs: u64,
    pub batch_concurrency: usize,
    pub max_file_size_bytes: u64,
    pub sweep_interval_secs: u64,
    pub near_expiry_minutes: i64,
    pub sync_enabled: bool,
    pub sync_interval_secs: u64,
    pub sync_path: PathBuf,
    pub share_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            upload_preset: "ml_default".to_string(),
            api_base_url: "https://api.cloudinary.com".to_string(),
            delete_mode: DeleteMode::LocalOnly,
            removal_policy: RemovalPolicy::Unconditional,
            index_path: PathBuf::from("tempdrop-index.json"),
            retention_hours: RETENTION_HOURS,
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
            batch_concurrency: BATCH_DELETE_CONCURRENCY,
            max_file_size_bytes: 100 * 1024 * 1024,
            sweep_interval_secs: 60,
            near_expiry_minutes: 60,
            sync_enabled: false,
            sync_interval_secs: 30,
            sync_path: PathBuf::from("tempdrop-shared.txt"),
            share_base_url: "https://tempdrop.local/".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        const MAX_FILE_SIZE_MB: u64 = 100;
        const SWEEP_INTERVAL_SECS: u64 = 60;
        const NEAR_EXPIRY_MINUTES: i64 = 60;
        const SYNC_INTERVAL_SECS: u64 = 30;

        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_secret = get("TEMPDROP_API_SECRET");

        let delete_mode = match get("TEMPDROP_DELETE_MODE") {
            Some(raw) => raw.parse::<DeleteMode>()?,
            None if api_secret.is_some() => DeleteMode::Trusted,
            None => DeleteMode::LocalOnly,
        };

        let removal_policy = match get("TEMPDROP_REMOVAL_POLICY") {
            Some(raw) => raw.parse::<RemovalPolicy>()?,
            None => RemovalPolicy::default(),
        };

        let max_file_size_mb = get("TEMPDROP_MAX_FILE_SIZE_MB")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);

        let sync_enabled = get("TEMPDROP_SYNC_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Config {
            cloud_name: get(CLOUD_NAME_VAR),
            api_key: get(API_KEY_VAR),
            api_secret,
            upload_preset: get("TEMPDROP_UPLOAD_PRESET")
                .unwrap_or_else(|| "ml_default".to_string()),
            api_base_url: get("TEMPDROP_API_BASE")
                .unwrap_or_else(|| "https://api.cloudinary.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            delete_mode,
            removal_policy,
            index_path: get("TEMPDROP_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tempdrop-index.json")),
            retention_hours: get("TEMPDROP_RETENTION_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(RETENTION_HOURS),
            upload_timeout_secs: get("TEMPDROP_UPLOAD_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(UPLOAD_TIMEOUT_SECS),
            batch_concurrency: get("TEMPDROP_BATCH_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(BATCH_DELETE_CONCURRENCY),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            sweep_interval_secs: get("TEMPDROP_SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(SWEEP_INTERVAL_SECS),
            near_expiry_minutes: get("TEMPDROP_NEAR_EXPIRY_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(NEAR_EXPIRY_MINUTES),
            sync_enabled,
            sync_interval_secs: get("TEMPDROP_SYNC_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(SYNC_INTERVAL_SECS),
            sync_path: get("TEMPDROP_SYNC_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tempdrop-shared.txt")),
            share_base_url: get("TEMPDROP_SHARE_BASE_URL")
                .unwrap_or_else(|| "https://tempdrop.local/".to_string()),
        })
    }

    /// Names of required settings that are not set.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cloud_name.is_none() {
            missing.push(CLOUD_NAME_VAR);
        }
        if self.api_key.is_none() {
            missing.push(API_KEY_VAR);
        }
        missing
    }

    /// True when both required provider settings are present.
    pub fn is_configured(&self) -> bool {
        self.missing_settings().is_empty()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.delete_mode == DeleteMode::Trusted && self.api_secret.is_none() {
            return Err(AppError::Configuration(
                "TEMPDROP_DELETE_MODE=trusted requires TEMPDROP_API_SECRET".to_string(),
            ));
        }
        if self.retention_hours <= 0 {
            return Err(AppError::Configuration(
                "TEMPDROP_RETENTION_HOURS must be positive".to_string(),
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(AppError::Configuration(
                "TEMPDROP_BATCH_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cloud_name(&self) -> Option<&str> {
        self.cloud_name.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    pub fn retention(&self) -> Duration {
        Duration::hours(self.retention_hours)
    }

    pub fn near_expiry_window(&self) -> Duration {
        Duration::minutes(self.near_expiry_minutes)
    }

    pub fn upload_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upload_timeout_secs)
    }
}
