//! The list of sources the user can chat about, and which one is selected.
//!
//! Sources are kept newest first. Whenever the list changes the selection is
//! reconciled: it stays put if the selected id still exists, otherwise it
//! falls back to the newest source, otherwise to nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ServiceError, StoreError};
use crate::events::{EventBus, Notice, StoreEvent};
use crate::services::{upload_kind, StoredDocument, UploadFile, UploadService};
use crate::state::{Source, SourceId, SourceKind};

const TEXT_TITLE_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 200;

/// Ticket for an upload that has been validated and is in flight
#[derive(Debug, Clone)]
pub struct PendingUpload {
    file_name: String,
    generation: u64,
}

impl PendingUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

pub struct SourceRegistry {
    sources: Vec<Source>,
    selected: Option<SourceId>,
    uploading: bool,
    // bumped by clear(); uploads begun before it are abandoned
    generation: u64,
    accepted_type: String,
    cache: Option<SourceCache>,
    events: EventBus,
}

impl SourceRegistry {
    pub fn new(accepted_type: impl Into<String>, events: EventBus) -> Self {
        Self {
            sources: Vec::new(),
            selected: None,
            uploading: false,
            generation: 0,
            accepted_type: accepted_type.into(),
            cache: None,
            events,
        }
    }

    /// Bind to a cache file and load whatever it holds
    pub fn with_cache(mut self, cache: SourceCache) -> Self {
        match cache.load() {
            Ok(sources) => self.replace_sources(sources),
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable source cache"),
        }
        self.cache = Some(cache);
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn selected_id(&self) -> Option<&SourceId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Source> {
        let id = self.selected.as_ref()?;
        self.sources.iter().find(|s| &s.id == id)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn accepted_type(&self) -> &str {
        &self.accepted_type
    }

    pub fn select(&mut self, id: &SourceId) {
        if self.selected.as_ref() == Some(id) {
            return;
        }
        if self.sources.iter().any(|s| &s.id == id) {
            self.selected = Some(id.clone());
            self.events.publish(StoreEvent::SourcesChanged);
        }
    }

    /// Check the file type and mark the registry uploading. No network call
    /// happens here; a rejected file leaves everything untouched.
    pub fn begin_upload(&mut self, file: &UploadFile) -> Result<PendingUpload> {
        if self.uploading {
            return Err(StoreError::Validation(
                "An upload is already in progress".to_string(),
            ));
        }
        if !file.mime.eq_ignore_ascii_case(&self.accepted_type) {
            let message = format!(
                "Only {} files are allowed, got {}",
                self.accepted_type, file.mime
            );
            self.events.notify(Notice::error(message.clone()));
            return Err(StoreError::Validation(message));
        }
        if file.bytes.is_empty() {
            let message = format!("{} is empty", file.name);
            self.events.notify(Notice::error(message.clone()));
            return Err(StoreError::Validation(message));
        }

        self.uploading = true;
        self.events.publish(StoreEvent::SourcesChanged);
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "upload started");
        Ok(PendingUpload {
            file_name: file.name.clone(),
            generation: self.generation,
        })
    }

    pub fn complete_upload(
        &mut self,
        pending: PendingUpload,
        result: std::result::Result<StoredDocument, ServiceError>,
    ) -> Result<SourceId> {
        if pending.generation != self.generation {
            tracing::debug!(file = %pending.file_name, "dropping upload from a cleared session");
            return Err(StoreError::Abandoned(pending.file_name));
        }
        self.uploading = false;

        match result {
            Ok(stored) => {
                let source = Source {
                    id: stored.id,
                    title: pending.file_name,
                    content_preview: stored.preview_text,
                    kind: SourceKind::Document,
                    created_at: Utc::now(),
                };
                let id = source.id.clone();
                tracing::info!(source = %id, "document uploaded");
                self.insert_newest(source);
                self.events.notify(Notice::info("File uploaded successfully"));
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(file = %pending.file_name, error = %err, "upload failed");
                self.events.publish(StoreEvent::SourcesChanged);
                self.events
                    .notify(Notice::error(format!("Failed to upload file: {}", err)));
                Err(StoreError::Service(err))
            }
        }
    }

    pub async fn upload(
        &mut self,
        service: &dyn UploadService,
        file: &UploadFile,
    ) -> Result<SourceId> {
        let pending = self.begin_upload(file)?;
        let result = service.store(file, upload_kind(SourceKind::Document)).await;
        self.complete_upload(pending, result)
    }

    /// Add pasted text as a source. Client-side only.
    pub fn add_text(&mut self, text: &str) -> Result<SourceId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("Text is empty".to_string()));
        }

        let title = if text.chars().count() > TEXT_TITLE_CHARS {
            let head: String = text.chars().take(TEXT_TITLE_CHARS).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        };
        let source = Source {
            id: SourceId::generate(),
            title,
            content_preview: text.chars().take(PREVIEW_CHARS).collect(),
            kind: SourceKind::Text,
            created_at: Utc::now(),
        };
        let id = source.id.clone();
        self.insert_newest(source);
        self.events
            .notify(Notice::info("Text source added successfully"));
        Ok(id)
    }

    /// Add a web page as a source. Client-side only.
    pub fn add_url(&mut self, url: &str) -> Result<SourceId> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| StoreError::Validation(format!("Invalid URL: {}", e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StoreError::Validation("URL has no host".to_string()))?;

        let source = Source {
            id: SourceId::generate(),
            title: host.to_string(),
            content_preview: parsed.to_string(),
            kind: SourceKind::Url,
            created_at: Utc::now(),
        };
        let id = source.id.clone();
        self.insert_newest(source);
        self.events
            .notify(Notice::info("URL source added successfully"));
        Ok(id)
    }

    /// Re-fetch documents from the upload service. Text and URL sources only
    /// exist on this client and are kept. A service that cannot list
    /// documents falls back to the local cache.
    pub async fn refresh(&mut self, service: &dyn UploadService) -> Result<()> {
        let result = service.list().await;
        self.complete_refresh(result)
    }

    pub fn complete_refresh(
        &mut self,
        result: std::result::Result<Vec<Source>, ServiceError>,
    ) -> Result<()> {
        match result {
            Ok(fetched) => {
                // listings can be thinner than what the upload returned
                let mut merged: Vec<Source> = fetched
                    .into_iter()
                    .map(|s| match self.sources.iter().find(|known| known.id == s.id) {
                        Some(known) => known.clone(),
                        None => s,
                    })
                    .collect();
                for source in &self.sources {
                    let client_owned = source.kind != SourceKind::Document;
                    if client_owned && !merged.iter().any(|s| s.id == source.id) {
                        merged.push(source.clone());
                    }
                }
                tracing::debug!(count = merged.len(), "sources refreshed");
                self.replace_sources(merged);
                Ok(())
            }
            Err(ServiceError::Unsupported(what)) => {
                tracing::debug!(what, "no remote listing, refreshing from cache");
                self.reload_cache()
            }
            Err(err) => {
                tracing::warn!(error = %err, "source refresh failed");
                self.events
                    .notify(Notice::error(format!("Failed to fetch sources: {}", err)));
                Err(StoreError::Service(err))
            }
        }
    }

    /// Forget every source (logout). An upload still in flight is abandoned.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.selected = None;
        self.uploading = false;
        self.generation += 1;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.remove() {
                tracing::warn!(error = %err, "failed to remove source cache");
            }
        }
        self.events.publish(StoreEvent::SourcesChanged);
    }

    fn insert_newest(&mut self, source: Source) {
        self.selected = Some(source.id.clone());
        self.sources.retain(|s| s.id != source.id);
        self.sources.insert(0, source);
        self.persist();
        self.events.publish(StoreEvent::SourcesChanged);
    }

    fn replace_sources(&mut self, mut sources: Vec<Source>) {
        // stable, so equal timestamps keep the order they arrived in
        sources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.sources = sources;
        self.reconcile_selection();
        self.persist();
        self.events.publish(StoreEvent::SourcesChanged);
    }

    fn reload_cache(&mut self) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        match cache.load() {
            Ok(sources) => {
                self.replace_sources(sources);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "source cache unreadable");
                self.events
                    .notify(Notice::error(format!("Failed to fetch sources: {}", err)));
                Err(err)
            }
        }
    }

    fn reconcile_selection(&mut self) {
        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|id| self.sources.iter().any(|s| &s.id == id));
        if !still_present {
            self.selected = self.sources.first().map(|s| s.id.clone());
        }
    }

    fn persist(&self) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.save(&self.sources) {
                tracing::warn!(error = %err, "failed to write source cache");
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CachedSources {
    sources: Vec<Source>,
}

/// JSON file holding the last known source list
#[derive(Debug, Clone)]
pub struct SourceCache {
    path: PathBuf,
}

impl SourceCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("sources.json"))
    }

    pub fn load(&self) -> Result<Vec<Source>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let cached: CachedSources = serde_json::from_str(&content)?;
        Ok(cached.sources)
    }

    pub fn save(&self, sources: &[Source]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&CachedSources {
            sources: sources.to_vec(),
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
