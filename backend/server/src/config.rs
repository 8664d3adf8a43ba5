use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_SEED_PASSWORD: &str = "admin123";

pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub stream_timeout: Duration,
    pub max_streams: usize,
    pub bcrypt_cost: u32,
    pub admin_seed_password: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8080"),
            database_path: try_load("DATABASE_PATH", "college.db"),
            stream_timeout: Duration::from_millis(try_load("STREAM_TIMEOUT_MS", "5000")),
            max_streams: try_load("MAX_STREAMS", "16"),
            bcrypt_cost: try_load("BCRYPT_COST", "12"),
            admin_seed_password: read_secret("ADMIN_SEED_PASSWORD")
                .unwrap_or_else(|| DEFAULT_SEED_PASSWORD.to_string()),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
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

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}, falling back to the default");
        })
        .ok()
}
