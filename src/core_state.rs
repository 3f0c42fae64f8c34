//! Shared application state.
//!
//! `CoreState` owns the record store, the file store and the OCR service,
//! and hands out the services built on them. Wrapped in `Arc` at startup
//! and shared by the HTTP layer and the monitor thread.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::documents::DocumentArchive;
use crate::monitor::MonitorThresholds;
use crate::notifications::NotificationCenter;
use crate::pipeline::{OcrError, OcrPipeline, OcrService, RemoteOcr, SimulatedOcr};
use crate::storage::{FileStore, LocalFileStore, StorageError};
use crate::store::RecordStore;

/// Timeout for a remote OCR call.
const REMOTE_OCR_TIMEOUT_SECS: u64 = 120;

pub struct CoreState {
    store: Arc<RecordStore>,
    files: Arc<dyn FileStore>,
    ocr: Arc<dyn OcrService>,
    pipeline: OcrPipeline,
    documents: DocumentArchive,
    thresholds: MonitorThresholds,
    started_at: Instant,
}

impl CoreState {
    pub fn new(store: Arc<RecordStore>, files: Arc<dyn FileStore>, ocr: Arc<dyn OcrService>) -> Self {
        let pipeline = OcrPipeline::new(store.clone(), files.clone(), ocr.clone());
        let documents = DocumentArchive::new(store.clone(), files.clone());
        Self {
            store,
            files,
            ocr,
            pipeline,
            documents,
            thresholds: MonitorThresholds::default(),
            started_at: Instant::now(),
        }
    }

    /// Open the database and file store named by `config` and pick the
    /// OCR backend.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::from)?;
        }
        let store = Arc::new(RecordStore::open(&config.database_path)?);
        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.storage_dir)?);
        let ocr: Arc<dyn OcrService> = match &config.ocr_endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "Using remote OCR");
                Arc::new(RemoteOcr::new(endpoint, REMOTE_OCR_TIMEOUT_SECS)?)
            }
            None => {
                tracing::info!(latency_ms = config.ocr_latency.as_millis() as u64, "Using simulated OCR");
                Arc::new(SimulatedOcr::new(config.ocr_latency))
            }
        };
        Ok(Self::new(store, files, ocr))
    }

    pub fn with_thresholds(mut self, thresholds: MonitorThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    pub fn ocr(&self) -> &Arc<dyn OcrService> {
        &self.ocr
    }

    pub fn pipeline(&self) -> &OcrPipeline {
        &self.pipeline
    }

    pub fn documents(&self) -> &DocumentArchive {
        &self.documents
    }

    pub fn thresholds(&self) -> &MonitorThresholds {
        &self.thresholds
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn notification_center(&self, recipient_id: Uuid) -> Result<NotificationCenter, CoreError> {
        Ok(NotificationCenter::open(&self.store, recipient_id)?)
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("OCR setup failed: {0}")]
    Ocr(#[from] OcrError),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::*;

    #[test]
    fn from_config_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("data/volleymed.db"),
            storage_dir: dir.path().join("files"),
            bind: "127.0.0.1:0".parse().unwrap(),
            monitor_interval: None,
            ocr_latency: Duration::ZERO,
            ocr_endpoint: None,
        };
        let state = CoreState::from_config(&config).unwrap();
        assert!(config.database_path.exists());
        assert!(config.storage_dir.is_dir());
        assert_eq!(state.thresholds(), &MonitorThresholds::default());
    }

    #[test]
    fn services_share_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let state = CoreState::new(
            store,
            Arc::new(LocalFileStore::new(dir.path()).unwrap()),
            Arc::new(SimulatedOcr::new(Duration::ZERO)),
        );
        let player = state.store().create_player(Player::new("Max", "Mustermann")).unwrap();
        let job = state
            .pipeline()
            .upload_and_submit(Some(player.id), DocumentType::Generic, "a.png", b"x", None)
            .unwrap();
        assert_eq!(job.status, OcrStatus::Completed);
        assert_eq!(state.pipeline().list_jobs(Some(&player.id)).unwrap().len(), 1);
    }
}
