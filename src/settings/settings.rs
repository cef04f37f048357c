use anyhow::{Result, anyhow};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub store: Store,
    pub transport: Transport,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub identity_backend: String, // "fake" or "real"
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
    pub issuer: String,
    pub audience: String,
    pub store_timeout_ms: u64,
}

impl Auth {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_minutes * 60)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_days * 24 * 60 * 60)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "redis" or "mysql"
    pub redis_dsn: Option<String>,
    pub mysql_dsn: Option<String>,
    pub key_prefix: String,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Transport {
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "TALLYGUARD";

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let builder = Config::builder()
        .set_default("auth.identity_backend", "real")?
        .set_default("auth.access_ttl_minutes", 15)?
        .set_default("auth.refresh_ttl_days", 3)?
        .set_default("auth.issuer", "tallyguard.auth")?
        .set_default("auth.audience", "tallyguard-client")?
        .set_default("auth.store_timeout_ms", 2000)?
        .set_default("store.backend", "memory")?
        .set_default("store.key_prefix", "tallyguard:refresh")?
        .set_default("store.purge_interval_secs", 3600)?
        .set_default("transport.secure_cookies", true)?
        .set_default("log.filter", "info")?;
    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;
    Ok(settings)
}

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    finish(
        defaults()?
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}
