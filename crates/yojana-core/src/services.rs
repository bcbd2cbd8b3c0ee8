//! Contracts for the external collaborators the stores talk to.
//!
//! The HTTP implementations live in [`crate::api`]; tests use in-memory
//! doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::session::AuthSession;
use crate::state::{ChatMessage, ContextKey, EligibilityProfile, Source, SourceId, SourceKind};

/// Everything the Q&A service needs to know about where a question was asked
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDescriptor {
    pub key: ContextKey,
    /// Present for eligibility questions
    pub profile: Option<EligibilityProfile>,
}

impl ContextDescriptor {
    pub fn source(id: SourceId) -> Self {
        Self {
            key: ContextKey::Source(id),
            profile: None,
        }
    }

    pub fn eligibility(profile: Option<EligibilityProfile>) -> Self {
        Self {
            key: ContextKey::Eligibility,
            profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// A file picked by the user, read fully into memory
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_for_extension(path);
        Ok(Self { name, mime, bytes })
    }
}

fn mime_for_extension(path: &std::path::Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: SourceId,
    pub preview_text: String,
}

#[async_trait]
pub trait QaService: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        context: &ContextDescriptor,
    ) -> Result<Answer, ServiceError>;
}

#[async_trait]
pub trait UploadService: Send + Sync {
    async fn store(&self, file: &UploadFile, kind: &str) -> Result<StoredDocument, ServiceError>;

    async fn list(&self) -> Result<Vec<Source>, ServiceError>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn fetch(&self, context: &ContextKey) -> Result<Vec<ChatMessage>, ServiceError>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;

    async fn register(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;
}

#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn save_profile(&self, profile: &EligibilityProfile) -> Result<(), ServiceError>;

    /// Whether the backend already holds a profile for the signed-in user
    async fn has_profile(&self) -> Result<bool, ServiceError>;
}

/// Kind label sent to the upload service for a source kind
pub fn upload_kind(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Document => "marksheet",
        other => other.as_str(),
    }
}
