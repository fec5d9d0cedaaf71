//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::mail::Mailer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    mailer: Mailer,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let mailer = Mailer::new(config.mail.clone());
        Self {
            inner: Arc::new(AppStateInner { config, db, mailer }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the mail client
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
