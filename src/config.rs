// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Default bound on concurrent scoring workers.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub online_database_url: Option<String>,
    pub rust_log: String,
    pub worker_pool_size: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let online_database_url = env::var("ONLINE_DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let worker_pool_size = env::var("WORKER_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_WORKER_POOL_SIZE)
            .max(1);

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        Self {
            database_url,
            online_database_url,
            rust_log,
            worker_pool_size,
            bind_addr,
        }
    }
}
