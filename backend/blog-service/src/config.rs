/// Configuration management for Blog Service
///
/// Everything is read from environment variables (after `.env` is loaded).
use crate::db::DbConfig;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub database: DbConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Load sample posts into the memory backend
    pub seed: bool,
    /// Apply embedded SQL migrations on startup (postgres only)
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("BLOG_SERVICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
        };
        let production = app.is_production();

        let backend: StorageBackend = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        if production && backend == StorageBackend::Memory {
            return Err("STORAGE_BACKEND=memory is not allowed in production".to_string());
        }

        Ok(Config {
            app,
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            storage: StorageConfig {
                backend,
                seed: parse_bool_env("SEED_SAMPLE_DATA", backend == StorageBackend::Memory)?,
                run_migrations: parse_bool_env("RUN_MIGRATIONS", false)?,
            },
            database: {
                let defaults = DbConfig::default();
                let database_url = match std::env::var("DATABASE_URL") {
                    Ok(url) => url,
                    Err(_) if backend == StorageBackend::Postgres => {
                        return Err("DATABASE_URL must be set for the postgres backend".to_string())
                    }
                    Err(_) => String::new(),
                };

                DbConfig {
                    database_url,
                    max_connections: parse_env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
                    min_connections: parse_env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
                    connect_timeout_secs: parse_env_or(
                        "DATABASE_CONNECT_TIMEOUT_SECS",
                        defaults.connect_timeout_secs,
                    )?,
                    acquire_timeout_secs: parse_env_or(
                        "DATABASE_ACQUIRE_TIMEOUT_SECS",
                        defaults.acquire_timeout_secs,
                    )?,
                    idle_timeout_secs: defaults.idle_timeout_secs,
                    max_lifetime_secs: defaults.max_lifetime_secs,
                }
            },
        })
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, String> {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("Failed to parse {}='{}' as a boolean", key, val)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(" PostgreSQL ".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn production_is_case_insensitive() {
        let app = |env: &str| AppConfig {
            env: env.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
        };
        assert!(app("Production").is_production());
        assert!(!app("staging").is_production());
    }

    #[test]
    fn cors_origins_are_split() {
        let cors = CorsConfig {
            allowed_origins: "https://blog.example.com, ,http://localhost:3000".to_string(),
        };
        assert_eq!(
            cors.origins(),
            vec!["https://blog.example.com", "http://localhost:3000"]
        );
    }
}
