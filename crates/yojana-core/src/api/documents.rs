use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::BackendClient;
use crate::error::ServiceError;
use crate::services::{HistoryService, StoredDocument, UploadFile, UploadService};
use crate::state::{ChatMessage, ContextKey, Source, SourceId, SourceKind};

#[derive(Deserialize)]
struct UploadResponse {
    doc_id: String,
    #[serde(default)]
    extracted_preview: String,
}

#[derive(Deserialize)]
struct DocumentDto {
    doc_id: String,
    #[serde(default)]
    doc_type: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    extracted_preview: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<DocumentDto> for Source {
    fn from(dto: DocumentDto) -> Self {
        let title = dto
            .filename
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| dto.doc_type.clone());
        Source {
            id: SourceId::new(dto.doc_id),
            title,
            content_preview: dto.extracted_preview,
            kind: SourceKind::Document,
            created_at: dto.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// The profile endpoint carries the user's documents along with the profile
#[derive(Deserialize)]
struct ProfileDocuments {
    #[serde(default)]
    documents: Vec<DocumentDto>,
}

#[async_trait]
impl UploadService for BackendClient {
    async fn store(&self, file: &UploadFile, kind: &str) -> Result<StoredDocument, ServiceError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("doc_type", kind.to_string());

        let request = self.authorized(self.post("/api/upload-document"))?.multipart(form);
        let response: UploadResponse = self.send_json(request).await?;

        tracing::info!(doc_id = %response.doc_id, kind, "document stored");
        Ok(StoredDocument {
            id: SourceId::new(response.doc_id),
            preview_text: response.extracted_preview,
        })
    }

    /// Documents come back only once a profile exists; without one the
    /// listing is unavailable rather than empty.
    async fn list(&self) -> Result<Vec<Source>, ServiceError> {
        let request = self.authorized(self.get("/api/profile"))?;
        match self.send_json::<ProfileDocuments>(request).await {
            Ok(response) => Ok(response.documents.into_iter().map(Source::from).collect()),
            Err(ServiceError::Status { status: 404, .. }) => {
                Err(ServiceError::Unsupported("document listing"))
            }
            Err(err) => Err(err),
        }
    }
}

/// The backend answers questions but does not keep a readable chat log
#[async_trait]
impl HistoryService for BackendClient {
    async fn fetch(&self, context: &ContextKey) -> Result<Vec<ChatMessage>, ServiceError> {
        tracing::debug!(%context, "history requested, backend has no history route");
        Err(ServiceError::Unsupported("chat history"))
    }
}
