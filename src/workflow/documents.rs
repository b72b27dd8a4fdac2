//! Uploaded supporting documents: bytes go to a [`FileStore`], metadata to `files`.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::engine::load_request;
use super::ensure_can_view;
use crate::domain::{Actor, FileRecord, RequestState, Role};
use crate::database::begin_write;
use crate::errors::{AppError, AppResult};
use crate::storage::{storage_key_for, FileStore};
use crate::store::{self, files::NewFile};
use crate::validation::is_valid_document_type;

/// States in which the applicant may still change documents.
const EDITABLE_STATES: [RequestState; 2] = [RequestState::Creada, RequestState::DevueltaVentanilla];

pub struct NewUpload<'a> {
    pub request_id: i64,
    pub document_type: &'a str,
    pub original_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Clone)]
pub struct DocumentService {
    pool: SqlitePool,
    store: Arc<dyn FileStore>,
    max_upload_bytes: usize,
}

impl DocumentService {
    pub fn new(pool: SqlitePool, store: Arc<dyn FileStore>, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            store,
            max_upload_bytes,
        }
    }

    /// Stores a document for the request, replacing any file of the same type.
    pub async fn upload(&self, actor: Actor, upload: NewUpload<'_>) -> AppResult<FileRecord> {
        if actor.role != Role::Solicitante {
            return Err(AppError::forbidden("only applicants upload documents"));
        }
        if !is_valid_document_type(upload.document_type) {
            return Err(AppError::validation(format!(
                "invalid document type '{}'",
                upload.document_type
            )));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::validation("the file is empty"));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(AppError::validation(format!(
                "the file exceeds the {} byte limit",
                self.max_upload_bytes
            )));
        }

        {
            let mut conn = self.pool.acquire().await?;
            let request = load_request(&mut conn, upload.request_id).await?;
            ensure_owner(actor, request.applicant_id)?;
            ensure_editable(request.state)?;
        }

        let storage_key = storage_key_for(upload.original_name);
        self.store.put(&storage_key, upload.bytes).await?;

        match self.record_upload(actor, &upload, &storage_key).await {
            Ok((record, replaced)) => {
                if let Some(old) = replaced {
                    if let Err(e) = self.store.delete(&old.storage_key).await {
                        warn!(file_id = old.id, error = %e, "Could not remove replaced document");
                    }
                }
                info!(
                    request_id = upload.request_id,
                    file_id = record.id,
                    document_type = upload.document_type,
                    size = record.size_bytes,
                    "Document uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&storage_key).await {
                    warn!(key = %storage_key, error = %cleanup, "Could not remove orphaned document");
                }
                Err(e)
            }
        }
    }

    async fn record_upload(
        &self,
        actor: Actor,
        upload: &NewUpload<'_>,
        storage_key: &str,
    ) -> AppResult<(FileRecord, Option<FileRecord>)> {
        let mut tx = begin_write(&self.pool).await?;
        // State may have moved while the bytes were written
        let request = load_request(&mut tx, upload.request_id).await?;
        ensure_owner(actor, request.applicant_id)?;
        ensure_editable(request.state)?;

        let replaced =
            store::files::take_existing(&mut tx, upload.request_id, upload.document_type).await?;
        let record = store::files::insert(
            &mut tx,
            NewFile {
                request_id: upload.request_id,
                document_type: upload.document_type,
                original_name: upload.original_name,
                content_type: upload.content_type,
                size_bytes: upload.bytes.len() as i64,
                storage_key,
                now: Utc::now(),
            },
        )
        .await?;
        tx.commit().await?;
        Ok((record, replaced))
    }

    pub async fn download(&self, actor: Actor, file_id: i64) -> AppResult<(FileRecord, Vec<u8>)> {
        let record = {
            let mut conn = self.pool.acquire().await?;
            let record = store::files::fetch(&mut conn, file_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("file {file_id} not found")))?;
            let request = load_request(&mut conn, record.request_id).await?;
            ensure_can_view(actor, &request)?;
            record
        };

        let bytes = self.store.get(&record.storage_key).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("contents of file {file_id} are missing"))
            } else {
                AppError::Storage(e)
            }
        })?;
        Ok((record, bytes))
    }

    pub async fn list(&self, actor: Actor, request_id: i64) -> AppResult<Vec<FileRecord>> {
        let mut conn = self.pool.acquire().await?;
        let request = load_request(&mut conn, request_id).await?;
        ensure_can_view(actor, &request)?;
        Ok(store::files::list_for_request(&mut conn, request_id).await?)
    }
}

fn ensure_owner(actor: Actor, applicant_id: i64) -> AppResult<()> {
    if actor.id != applicant_id {
        return Err(AppError::forbidden("the request belongs to another applicant"));
    }
    Ok(())
}

fn ensure_editable(state: RequestState) -> AppResult<()> {
    if !EDITABLE_STATES.contains(&state) {
        return Err(AppError::validation(format!(
            "documents cannot be changed while the request is {state}"
        )));
    }
    Ok(())
}
