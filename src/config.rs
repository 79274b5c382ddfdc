use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;

use crate::error::{AppError, Result};

const DEFAULT_DB_PATH: &str = "trading_journal.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Runtime configuration, read from the environment (and `.env` if present)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub bind_addr: SocketAddr,
    /// Bearer token -> user id
    pub api_tokens: HashMap<String, String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_vars(
            env::var("JOURNAL_DB_PATH").ok(),
            env::var("JOURNAL_BIND_ADDR").ok(),
            env::var("JOURNAL_API_TOKENS").ok(),
        )
    }

    fn from_vars(
        db_path: Option<String>,
        bind_addr: Option<String>,
        api_tokens: Option<String>,
    ) -> Result<Self> {
        let db_path = db_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let bind_addr = bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid JOURNAL_BIND_ADDR '{}': {}", bind_addr, e)))?;

        let api_tokens = match api_tokens {
            Some(raw) => parse_tokens(&raw)?,
            None => HashMap::new(),
        };

        if api_tokens.is_empty() {
            log::warn!("JOURNAL_API_TOKENS is empty; every authenticated request will be rejected");
        }

        Ok(ServerConfig {
            db_path,
            bind_addr,
            api_tokens,
        })
    }
}

/// Parse `token=user_id` pairs separated by commas
fn parse_tokens(raw: &str) -> Result<HashMap<String, String>> {
    let mut tokens = HashMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (token, user_id) = pair
            .split_once('=')
            .ok_or_else(|| AppError::Config(format!("Expected token=user_id, got '{}'", pair)))?;

        let (token, user_id) = (token.trim(), user_id.trim());
        if token.is_empty() || user_id.is_empty() {
            return Err(AppError::Config(format!("Empty token or user id in '{}'", pair)));
        }

        tokens.insert(token.to_string(), user_id.to_string());
    }

    Ok(tokens)
}
