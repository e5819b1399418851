use anyhow::{anyhow, Context};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::import::importer::DEFAULT_BATCH_SIZE;

/// How the server learns whether `candidates.owner_id` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipMode {
    /// Probe `information_schema` once at startup
    Auto,
    Enabled,
    Disabled,
}

impl FromStr for OwnershipMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(OwnershipMode::Auto),
            "true" | "on" | "yes" | "1" => Ok(OwnershipMode::Enabled),
            "false" | "off" | "no" | "0" => Ok(OwnershipMode::Disabled),
            other => Err(anyhow!("OWNERSHIP_COLUMN must be auto, true or false (got {:?})", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub upload_dir: PathBuf,
    pub skills_max_len: usize,
    pub import_batch_size: usize,
    pub ownership: OwnershipMode,
    pub run_migrations: bool,
    /// Requests per minute per client IP; 0 disables rate limiting
    pub rate_limit_burst: u32,
    /// Staged uploads older than this are swept; 0 keeps them forever
    pub upload_ttl_hours: u64,
}

impl AppConfig {
    /// Reads configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set in .env or environment")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set in .env or environment")?,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", 24)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()).into(),
            skills_max_len: parse_var("SKILLS_MAX_LEN", 1000)?,
            import_batch_size: parse_var("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            ownership: parse_var("OWNERSHIP_COLUMN", OwnershipMode::Auto)?,
            run_migrations: parse_var("RUN_MIGRATIONS", true)?,
            rate_limit_burst: parse_var("RATE_LIMIT_BURST", 10)?,
            upload_ttl_hours: parse_var("UPLOAD_TTL_HOURS", 24)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.is_empty() {
            return Err(anyhow!("JWT_SECRET cannot be empty"));
        }
        validate_import_limits(self.skills_max_len, self.import_batch_size)?;
        if self.token_ttl_hours <= 0 {
            return Err(anyhow!("TOKEN_TTL_HOURS must be positive"));
        }
        Ok(())
    }
}

/// Settings for the offline `hiretrack-import` binary. It needs no JWT secret
/// or listener.
#[derive(Debug, Clone)]
pub struct ImportJobConfig {
    pub database_url: String,
    pub skills_max_len: usize,
    pub import_batch_size: usize,
    pub ownership: OwnershipMode,
}

impl ImportJobConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set in .env or environment")?,
            skills_max_len: parse_var("SKILLS_MAX_LEN", 1000)?,
            import_batch_size: parse_var("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            ownership: parse_var("OWNERSHIP_COLUMN", OwnershipMode::Auto)?,
        };
        validate_import_limits(config.skills_max_len, config.import_batch_size)?;
        Ok(config)
    }
}

/// Limits shared by the server and the import binary.
fn validate_import_limits(skills_max_len: usize, import_batch_size: usize) -> anyhow::Result<()> {
    // candidates.skills is a VARCHAR(2000)
    if !(1..=2000).contains(&skills_max_len) {
        return Err(anyhow!("SKILLS_MAX_LEN must be between 1 and 2000"));
    }
    if import_batch_size == 0 {
        return Err(anyhow!("IMPORT_BATCH_SIZE must be at least 1"));
    }
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        _ => Ok(default),
    }
}
