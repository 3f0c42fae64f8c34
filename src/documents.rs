//! Medical document archive: file bytes in the file store, metadata rows
//! in `medical_documents`.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::MedicalDocument;
use crate::storage::{stored_name, FileStore, StorageError};
use crate::store::RecordStore;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(String),

    #[error("Medical document not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub player_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub document_type: String,
    /// Falls back to the file name when empty.
    pub document_name: String,
    pub filename: String,
    pub uploaded_by: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct DocumentArchive {
    store: Arc<RecordStore>,
    files: Arc<dyn FileStore>,
}

impl DocumentArchive {
    pub fn new(store: Arc<RecordStore>, files: Arc<dyn FileStore>) -> Self {
        Self { store, files }
    }

    /// Store the bytes under `<player_id>/<unix_millis>-<nonce>.<ext>` and record them.
    pub fn upload(&self, upload: DocumentUpload, bytes: &[u8]) -> Result<MedicalDocument, DocumentError> {
        if upload.filename.trim().is_empty() {
            return Err(DocumentError::Validation("Datei ist erforderlich".into()));
        }
        if self
            .store
            .read(|conn| repository::get_player(conn, &upload.player_id))?
            .is_none()
        {
            return Err(DocumentError::Validation(format!(
                "Unknown player: {}",
                upload.player_id
            )));
        }

        let path = format!(
            "{}/{}",
            upload.player_id,
            stored_name(
                &upload.filename,
                chrono::Utc::now().timestamp_millis(),
                &Uuid::new_v4()
            )
        );
        let file_path = self.files.upload(&path, bytes)?;

        let document_name = if upload.document_name.trim().is_empty() {
            upload.filename.clone()
        } else {
            upload.document_name
        };
        let document = MedicalDocument {
            id: Uuid::new_v4(),
            player_id: upload.player_id,
            treatment_id: upload.treatment_id,
            document_type: upload.document_type,
            document_name,
            file_path: file_path.clone(),
            upload_date: chrono::Utc::now().date_naive(),
            uploaded_by: upload.uploaded_by,
            notes: upload.notes,
        };
        match self.store.create_medical_document(document) {
            Ok(document) => {
                tracing::info!(document_id = %document.id, player_id = %document.player_id, "Medical document stored");
                Ok(document)
            }
            Err(e) => {
                if let Err(cleanup) = self.files.delete(&file_path) {
                    tracing::warn!(file_path = %file_path, error = %cleanup, "Upload orphaned");
                }
                Err(e.into())
            }
        }
    }

    pub fn list_for_player(&self, player_id: &Uuid) -> Result<Vec<MedicalDocument>, DocumentError> {
        Ok(self
            .store
            .read(|conn| repository::list_medical_documents_for_player(conn, player_id))?)
    }

    pub fn download(&self, id: &Uuid) -> Result<(MedicalDocument, Vec<u8>), DocumentError> {
        let document = self
            .store
            .read(|conn| repository::get_medical_document(conn, id))?
            .ok_or(DocumentError::NotFound(*id))?;
        let bytes = self.files.download(&document.file_path)?;
        Ok((document, bytes))
    }

    /// Row first, then file. A file that cannot be removed is logged.
    pub fn delete(&self, id: &Uuid) -> Result<MedicalDocument, DocumentError> {
        let removed = self.store.delete_medical_document(id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => DocumentError::NotFound(*id),
            other => other.into(),
        })?;
        if let Err(e) = self.files.delete(&removed.file_path) {
            tracing::warn!(document_id = %id, file_path = %removed.file_path, error = %e, "Document file orphaned");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::make_player;
    use crate::storage::LocalFileStore;

    fn archive() -> (tempfile::TempDir, Arc<LocalFileStore>, DocumentArchive, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let files = Arc::new(LocalFileStore::new(dir.path()).unwrap());
        let player = store.read(|c| Ok(make_player(c, "Lena", "Block"))).unwrap();
        let archive = DocumentArchive::new(store, files.clone());
        (dir, files, archive, player.id)
    }

    fn upload(player_id: Uuid) -> DocumentUpload {
        DocumentUpload {
            player_id,
            treatment_id: None,
            document_type: "mrt".into(),
            document_name: String::new(),
            filename: "knie.pdf".into(),
            uploaded_by: None,
            notes: None,
        }
    }

    #[test]
    fn upload_download_delete() {
        let (_dir, files, archive, player_id) = archive();
        let document = archive.upload(upload(player_id), b"%PDF").unwrap();
        assert_eq!(document.document_name, "knie.pdf");
        assert!(document.file_path.starts_with(&format!("{player_id}/")));
        assert_eq!(archive.list_for_player(&player_id).unwrap().len(), 1);

        let (meta, bytes) = archive.download(&document.id).unwrap();
        assert_eq!(meta.id, document.id);
        assert_eq!(bytes, b"%PDF");

        archive.delete(&document.id).unwrap();
        assert!(!files.root().join(&document.file_path).exists());
        assert!(archive.list_for_player(&player_id).unwrap().is_empty());
        assert!(matches!(archive.delete(&document.id), Err(DocumentError::NotFound(_))));
    }

    #[test]
    fn repeated_uploads_get_distinct_files() {
        let (_dir, _files, archive, player_id) = archive();
        let first = archive.upload(upload(player_id), b"first").unwrap();
        let second = archive.upload(upload(player_id), b"second").unwrap();
        assert_ne!(first.file_path, second.file_path);
        assert_eq!(archive.download(&first.id).unwrap().1, b"first");
        assert_eq!(archive.download(&second.id).unwrap().1, b"second");
    }

    #[test]
    fn unknown_player_is_rejected_before_upload() {
        let (_dir, files, archive, _) = archive();
        let err = archive.upload(upload(Uuid::new_v4()), b"x").unwrap_err();
        assert!(matches!(err, DocumentError::Validation(_)));
        assert_eq!(std::fs::read_dir(files.root()).unwrap().count(), 0);
    }
}
