use std::{env, fmt::Display, str::FromStr};

use log::info;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            host: try_load("HOST", "127.0.0.1"),
            port: try_load("PORT", "8080"),
            database_url: require("DATABASE_URL"),
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5"),
            jwt_access_secret: require("JWT_ACCESS_SECRET"),
            jwt_refresh_secret: require("JWT_REFRESH_SECRET"),
        }
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}
