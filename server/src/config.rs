// kab-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use kab_orders::EngineConfig;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub engine: EngineConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = EngineConfig::default();

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&lookup, "SERVER_PORT", 8080u16)?;
    let database_url = lookup("DATABASE_URL")
      .ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
    let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", true)?;

    let engine = EngineConfig {
      tracking_code_prefix: lookup("TRACKING_CODE_PREFIX").unwrap_or(defaults.tracking_code_prefix),
      tracking_code_digits: parse_or(&lookup, "TRACKING_CODE_DIGITS", defaults.tracking_code_digits)?,
      max_tracking_attempts: parse_or(&lookup, "MAX_TRACKING_ATTEMPTS", defaults.max_tracking_attempts)?,
      confirm_timeout_ms: match lookup("CONFIRM_TIMEOUT_MS") {
        Some(raw) => Some(parse_value("CONFIRM_TIMEOUT_MS", &raw)?),
        None => defaults.confirm_timeout_ms,
      },
    };
    engine
      .validate()
      .map_err(|e| AppError::Config(format!("Invalid engine settings: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      run_migrations,
      engine,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(name) {
    Some(raw) => parse_value(name, &raw),
    None => Ok(default),
  }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}
