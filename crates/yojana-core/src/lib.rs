pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod markup;
pub mod services;
pub mod session;
pub mod sources;
pub mod state;

// Re-export main types for convenience
pub use api::BackendClient;
pub use config::Config;
pub use conversation::{AskOutcome, ConversationStore, PendingAsk};
pub use error::{FailureKind, ServiceError, StoreError};
pub use events::{EventBus, Notice, NoticeLevel, StoreEvent};
pub use markup::{render, Fragment};
pub use services::{
    AuthService, ContextDescriptor, HistoryService, ProfileService, QaService, UploadFile,
    UploadService,
};
pub use session::{AuthSession, SessionGuard, SessionStore, View};
pub use sources::{PendingUpload, SourceCache, SourceRegistry};
pub use state::{
    Category, ChatMessage, ChatRole, ContextKey, EligibilityProfile, Source, SourceId, SourceKind,
};
