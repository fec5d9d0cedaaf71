//! Configuration management for the Parapheur server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Outbound mail settings for the Postmark-compatible delivery API.
///
/// Delivery is disabled when no server token is configured; the rest of the
/// service works without it.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub server_token: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

impl MailConfig {
    pub fn is_enabled(&self) -> bool {
        self.server_token.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./parapheur.db".to_string(),
            },
            mail: MailConfig {
                api_url: "https://api.postmarkapp.com".to_string(),
                server_token: None,
                from_address: "no-reply@localhost".to_string(),
                from_name: "Parapheur".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            mail: MailConfig {
                api_url: env::var("POSTMARK_API_URL").unwrap_or(defaults.mail.api_url),
                server_token: env::var("POSTMARK_SERVER_TOKEN").ok(),
                from_address: env::var("MAIL_FROM").unwrap_or(defaults.mail.from_address),
                from_name: env::var("MAIL_FROM_NAME").unwrap_or(defaults.mail.from_name),
            },
        })
    }
}
