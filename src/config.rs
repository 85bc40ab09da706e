use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use crate::tmdb::TMDB_BASE;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ADDR: &str = "127.0.0.1:3146";

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub data_dir: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .context("TMDB_API_KEY not set")?;
        let tmdb_base_url = env::var("TMDB_BASE_URL").unwrap_or_else(|_| TMDB_BASE.to_string());
        let data_dir = env::var("CINEVIEW_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        let addr_raw = env::var("CINEVIEW_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = addr_raw
            .parse()
            .with_context(|| format!("CINEVIEW_ADDR is not a socket address: {addr_raw}"))?;

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            data_dir,
            addr,
        })
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.data_dir.join("favorites.json")
    }

    pub fn theme_path(&self) -> PathBuf {
        self.data_dir.join("theme.json")
    }
}

pub fn check_env() -> Result<()> {
    let required = ["TMDB_API_KEY"];
    for key in required {
        if env::var(key).is_err() {
            anyhow::bail!("Missing required environment variable: {}", key);
        }
    }
    info!("All required environment variables are set");
    Ok(())
}
