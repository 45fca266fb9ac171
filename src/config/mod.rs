use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub app_name: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub token_key: [u8; 32],
    pub token_issuer: String,
    pub token_ttl_minutes: u64,
    pub login_url: String,
    pub max_body_bytes: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("http_addr", &self.http_addr)
            .field("app_name", &self.app_name)
            .field("storage_backend", &self.storage_backend)
            .field("db_max_connections", &self.db_max_connections)
            .field("token_issuer", &self.token_issuer)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("login_url", &self.login_url)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup };

        let http_addr: SocketAddr = env.or_parse("HTTP_ADDR", "0.0.0.0:8080")?;

        let storage_backend: StorageBackend = env.or_parse("STORAGE_BACKEND", "postgres")?;
        let database_url = env.get("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let login_url = env.or("LOGIN_URL", "/login");
        if !login_url.starts_with('/') && url::Url::parse(&login_url).is_err() {
            return Err(anyhow!("invalid LOGIN_URL: {}", login_url));
        }

        Ok(Self {
            http_addr,
            app_name: env.or("APP_NAME", "Scriptorium"),
            storage_backend,
            database_url,
            db_max_connections: env.or_parse("DB_MAX_CONNECTIONS", "10")?,
            db_connect_timeout_seconds: env.or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env.or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env.or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            token_key: env.key_32("TOKEN_KEY")?,
            token_issuer: env.or("TOKEN_ISSUER", "scriptorium"),
            token_ttl_minutes: env.or_parse("TOKEN_TTL_MINUTES", "60")?,
            login_url,
            max_body_bytes: env.or_parse("MAX_BODY_BYTES", "65536")?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("missing required env var: {}", key))
    }

    fn or_parse<T>(&self, key: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: fmt::Display,
    {
        self.or(key, default)
            .parse::<T>()
            .map_err(|err| anyhow!("invalid {}: {}", key, err))
    }

    fn key_32(&self, key: &str) -> Result<[u8; 32]> {
        let value = self.required(key)?;
        let decoded = STANDARD
            .decode(value.as_bytes())
            .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
        decoded
            .try_into()
            .map_err(|_| anyhow!("invalid {}: expected 32 bytes", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // "0123456789abcdef0123456789abcdef"
    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn memory_backend_needs_only_a_key() {
        let config = config(&[("STORAGE_BACKEND", "memory"), ("TOKEN_KEY", KEY)]).unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.http_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.login_url, "/login");
        assert_eq!(config.token_key, *b"0123456789abcdef0123456789abcdef");
        assert_eq!(config.max_body_bytes, 65536);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = config(&[("TOKEN_KEY", KEY)]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = config(&[("TOKEN_KEY", KEY), ("DATABASE_URL", "postgres://localhost/blog")]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("STORAGE_BACKEND", "memory")]).is_err());
        assert!(config(&[("STORAGE_BACKEND", "memory"), ("TOKEN_KEY", "c2hvcnQ=")]).is_err());
        assert!(config(&[("STORAGE_BACKEND", "sqlite"), ("TOKEN_KEY", KEY)]).is_err());
        assert!(config(&[
            ("STORAGE_BACKEND", "memory"),
            ("TOKEN_KEY", KEY),
            ("HTTP_ADDR", "not an address"),
        ])
        .is_err());
        assert!(config(&[
            ("STORAGE_BACKEND", "memory"),
            ("TOKEN_KEY", KEY),
            ("LOGIN_URL", "login page"),
        ])
        .is_err());
    }
}
