use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub signing_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("EVENTEASE_PORT", "8080"),
            database_url: try_load("DATABASE_URL", "sqlite://eventease.db?mode=rwc"),
            signing_secret: load_secret("EVENTEASE_SIGNING_SECRET"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Load a secret from the environment, falling back to a mounted
/// `/run/secrets/<name>` file. The signing secret has no default: the
/// process refuses to start without one.
fn load_secret(secret_name: &str) -> String {
    if let Ok(value) = env::var(secret_name) {
        let value = value.trim().to_string();
        if !value.is_empty() {
            return value;
        }
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
