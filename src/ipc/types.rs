use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::ScheduleBook;
use crate::suggest::{self, SuggestionGateway};
use crate::sync::{DataSource, HttpSyncGateway, SyncDispatcher};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Target of a two-phase delete awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum PendingDelete {
    Student(String),
    ClassTime(String),
}

#[derive(Debug, Default)]
pub struct Session {
    pub admin: bool,
    pub pending_delete: Option<PendingDelete>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Defaults plus environment; workspace settings layer on top of this.
    pub base_config: Config,
    pub config: Config,
    pub book: ScheduleBook,
    /// Set once the initial load (remote or seed) has settled.
    pub loaded: bool,
    pub source: DataSource,
    pub session: Session,
    pub sync: SyncDispatcher,
    pub suggest: Box<dyn SuggestionGateway>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let sync = SyncDispatcher::new(Arc::new(HttpSyncGateway::new(&config.sync)?));
        let suggest = suggest::gateway_for(&config.suggest)?;
        Ok(AppState {
            workspace: None,
            db: None,
            base_config: config.clone(),
            config,
            book: ScheduleBook::default(),
            loaded: false,
            source: DataSource::Seed,
            session: Session::default(),
            sync,
            suggest,
        })
    }

    /// A new sync endpoint triggers a pull, so the next push never
    /// overwrites that store with a document it did not serve.
    pub fn apply_config(&mut self, config: Config) -> anyhow::Result<()> {
        let endpoint_changed = config.sync.endpoint_url != self.config.sync.endpoint_url;
        if config.sync != self.config.sync {
            self.sync
                .set_gateway(Arc::new(HttpSyncGateway::new(&config.sync)?));
        }
        if config.suggest != self.config.suggest {
            self.suggest = suggest::gateway_for(&config.suggest)?;
        }
        self.config = config;
        if endpoint_changed {
            tracing::info!(
                configured = self.config.sync.endpoint_url.is_some(),
                "sync endpoint changed, reloading document"
            );
            self.reload();
        }
        Ok(())
    }

    /// Replaces the in-memory document with the remote one (or the seed).
    pub fn reload(&mut self) {
        let (book, source) = self.sync.load();
        self.book = book;
        self.source = source;
        self.loaded = true;
        self.session.pending_delete = None;
    }

    /// Pushes the current document without waiting for the round trip.
    pub fn save(&self) {
        if self.config.sync.endpoint_url.is_none() {
            tracing::warn!("document save skipped: no sync endpoint configured");
            return;
        }
        let _ = self.sync.push(self.book.clone());
    }
}
