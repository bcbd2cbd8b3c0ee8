use ratatui::layout::Rect;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use yojana_core::services::{upload_kind, StoredDocument};
use yojana_core::{
    AuthService, AuthSession, BackendClient, Category, ChatMessage, Config, ContextKey,
    ConversationStore, EligibilityProfile, EventBus, HistoryService, Notice, PendingAsk,
    PendingUpload, ProfileService, QaService, ServiceError, SessionGuard, SessionStore, Source,
    SourceCache, SourceKind, SourceRegistry, StoreError, StoreEvent, UploadFile, UploadService,
    View,
};

/// Ticks a notice stays on screen (300ms each)
const NOTICE_TICKS: u16 = 16;

type Task<T> = JoinHandle<Result<T, ServiceError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Sources,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which conversation the chat pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Eligibility,
    Documents,
}

/// Single-line popup input on the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    UploadPath,
    AddText,
    AddUrl,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::UploadPath => " Upload marksheet (path to a .jpg file) ",
            Prompt::AddText => " Add text source ",
            Prompt::AddUrl => " Add URL source ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub on_password: bool,
    pub error: Option<String>,
}

impl AuthForm {
    pub fn focused_text(&mut self) -> &mut String {
        if self.on_password {
            &mut self.password
        } else {
            &mut self.email
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error = None;
    }
}

pub const PROFILE_FIELDS: [&str; 6] = [
    "Full name",
    "Date of birth (YYYY-MM-DD)",
    "State",
    "Annual family income (INR)",
    "Category",
    "Class 12 marks % (optional)",
];
pub const CATEGORY_FIELD: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub values: [String; 6],
    pub category: usize,
    pub focus: usize,
    pub error: Option<String>,
}

impl ProfileForm {
    pub fn from_profile(profile: &EligibilityProfile) -> Self {
        let category = Category::all()
            .iter()
            .position(|c| *c == profile.category)
            .unwrap_or(0);
        Self {
            values: [
                profile.name.clone(),
                profile.dob.clone(),
                profile.state.clone(),
                profile.income.to_string(),
                String::new(),
                profile.marks_12.map(|m| m.to_string()).unwrap_or_default(),
            ],
            category,
            focus: 0,
            error: None,
        }
    }

    /// Text of the focused field, `None` on the category selector
    pub fn focused_text(&mut self) -> Option<&mut String> {
        if self.focus == CATEGORY_FIELD {
            None
        } else {
            self.values.get_mut(self.focus)
        }
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % PROFILE_FIELDS.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + PROFILE_FIELDS.len() - 1) % PROFILE_FIELDS.len();
    }

    pub fn cycle_category(&mut self, forward: bool) {
        let count = Category::all().len();
        self.category = if forward {
            (self.category + 1) % count
        } else {
            (self.category + count - 1) % count
        };
    }

    pub fn category(&self) -> Category {
        Category::all()
            .get(self.category)
            .copied()
            .unwrap_or(Category::General)
    }

    pub fn to_profile(&self) -> Result<EligibilityProfile, String> {
        let income = self.values[3].trim().replace(',', "");
        if income.is_empty() {
            return Err("Please fill all fields".to_string());
        }
        let income: u64 = income
            .parse()
            .map_err(|_| "Annual income must be a whole number".to_string())?;
        let marks_12 = match self.values[5].trim() {
            "" => None,
            text => Some(
                text.trim_end_matches('%')
                    .parse::<f32>()
                    .map_err(|_| "Class 12 marks must be a number".to_string())?,
            ),
        };

        let profile = EligibilityProfile {
            name: self.values[0].trim().to_string(),
            dob: self.values[1].trim().to_string(),
            state: self.values[2].trim().to_string(),
            income,
            category: self.category(),
            marks_12,
        };
        profile.validate().map_err(|e| e.to_string())?;
        Ok(profile)
    }
}

pub struct App {
    pub should_quit: bool,

    // Backend and persistence
    pub config: Config,
    client: BackendClient,
    session_store: SessionStore,
    pub session: Option<AuthSession>,

    // Stores
    pub conversations: ConversationStore,
    pub sources: SourceRegistry,
    store_events: mpsc::UnboundedReceiver<StoreEvent>,

    // Forms
    pub auth_form: AuthForm,
    pub profile_form: ProfileForm,
    pub editing_profile: bool,

    // Main screen
    pub focus: Pane,
    pub input_mode: InputMode,
    pub chat_mode: ChatMode,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub follow_chat: bool,
    pub chat_height: u16,
    pub prompt: Option<Prompt>,
    pub prompt_input: String,
    pub notice: Option<Notice>,
    notice_ticks: u16,
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,

    // In-flight requests, polled on tick
    ask_tasks: Vec<(PendingAsk, Task<yojana_core::services::Answer>)>,
    upload_task: Option<(PendingUpload, Task<StoredDocument>)>,
    refresh_task: Option<Task<Vec<Source>>>,
    history_task: Option<(ContextKey, Task<Vec<ChatMessage>>)>,
    auth_task: Option<Task<AuthSession>>,
    profile_task: Option<(EligibilityProfile, Task<()>)>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        let session_store = SessionStore::in_dir(&data_dir);
        let session = session_store.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable session file");
            None
        });

        let mut client = BackendClient::from_config(&config)?;
        if let Some(s) = &session {
            client = client.with_token(s.token.clone());
        }

        let events = EventBus::new();
        let store_events = events.subscribe();

        let mut conversations = ConversationStore::new(events.clone());
        conversations.set_profile(session.as_ref().and_then(|s| s.profile.clone()));
        let sources = SourceRegistry::new(config.accepted_upload_type(), events.clone())
            .with_cache(SourceCache::in_dir(&data_dir));

        let mut app = Self {
            should_quit: false,
            config,
            client,
            session_store,
            session,
            conversations,
            sources,
            store_events,
            auth_form: AuthForm::default(),
            profile_form: ProfileForm::default(),
            editing_profile: false,
            focus: Pane::Chat,
            input_mode: InputMode::Normal,
            chat_mode: ChatMode::Eligibility,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            follow_chat: true,
            chat_height: 0,
            prompt: None,
            prompt_input: String::new(),
            notice: None,
            notice_ticks: 0,
            animation_frame: 0,
            chat_area: None,
            sources_area: None,
            ask_tasks: Vec::new(),
            upload_task: None,
            refresh_task: None,
            history_task: None,
            auth_task: None,
            profile_task: None,
        };

        app.sync_active_context();
        if app.view() == View::Main {
            app.start_refresh();
        }
        Ok(app)
    }

    /// Screen to show, with the profile editor layered over the main view
    pub fn view(&self) -> View {
        match SessionGuard::view(self.session.as_ref()) {
            View::Main if self.editing_profile => View::ProfileIncomplete,
            view => view,
        }
    }

    pub fn active_context(&self) -> Option<ContextKey> {
        match self.chat_mode {
            ChatMode::Eligibility => Some(ContextKey::Eligibility),
            ChatMode::Documents => self
                .sources
                .selected_id()
                .map(|id| ContextKey::Source(id.clone())),
        }
    }

    pub fn sync_active_context(&mut self) {
        let context = self.active_context();
        if self.conversations.active() != context.as_ref() {
            self.conversations.activate(context);
            self.follow_chat = true;
        }
    }

    pub fn toggle_chat_mode(&mut self) {
        self.chat_mode = match self.chat_mode {
            ChatMode::Eligibility => ChatMode::Documents,
            ChatMode::Documents => ChatMode::Eligibility,
        };
        self.sync_active_context();
    }

    pub fn is_auth_busy(&self) -> bool {
        self.auth_task.is_some()
    }

    pub fn is_profile_busy(&self) -> bool {
        self.profile_task.is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_task.is_some()
    }

    pub fn is_active_pending(&self) -> bool {
        self.active_context()
            .is_some_and(|c| self.conversations.is_pending(&c))
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_ticks = NOTICE_TICKS;
    }

    pub fn tick(&mut self) {
        if self.is_active_pending() || self.sources.is_uploading() || self.is_auth_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.notice_ticks > 0 {
            self.notice_ticks -= 1;
            if self.notice_ticks == 0 {
                self.notice = None;
            }
        }
    }

    /// Apply store events published since the last frame
    pub fn drain_store_events(&mut self) {
        while let Ok(event) = self.store_events.try_recv() {
            match event {
                StoreEvent::Notice(notice) => self.show_notice(notice),
                StoreEvent::ConversationChanged(context) => {
                    if self.conversations.active() == Some(&context) {
                        self.follow_chat = true;
                    }
                }
                StoreEvent::ActiveContextChanged(_) => {
                    self.chat_scroll = 0;
                    self.follow_chat = true;
                }
                StoreEvent::SourcesChanged => {
                    if self.chat_mode == ChatMode::Documents {
                        self.sync_active_context();
                    }
                }
            }
        }
    }

    // Sources

    pub fn select_next_source(&mut self) {
        self.move_source_selection(1);
    }

    pub fn select_prev_source(&mut self) {
        self.move_source_selection(-1);
    }

    fn move_source_selection(&mut self, delta: isize) {
        let sources = self.sources.sources();
        if sources.is_empty() {
            return;
        }
        let current = self
            .sources
            .selected_id()
            .and_then(|id| sources.iter().position(|s| &s.id == id))
            .unwrap_or(0);
        let next = (current as isize + delta).clamp(0, sources.len() as isize - 1) as usize;
        let id = sources[next].id.clone();
        self.sources.select(&id);
        self.chat_mode = ChatMode::Documents;
        self.sync_active_context();
    }

    pub fn start_refresh(&mut self) {
        if self.refresh_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.refresh_task = Some(tokio::spawn(async move { client.list().await }));
    }

    pub async fn start_upload(&mut self, path: &str) {
        let path = PathBuf::from(path.trim());
        let file = match UploadFile::from_path(&path).await {
            Ok(file) => file,
            Err(err) => {
                self.show_notice(Notice::error(format!(
                    "Could not read {}: {}",
                    path.display(),
                    err
                )));
                return;
            }
        };

        match self.sources.begin_upload(&file) {
            Ok(pending) => {
                let client = self.client.clone();
                let handle = tokio::spawn(async move {
                    client.store(&file, upload_kind(SourceKind::Document)).await
                });
                self.upload_task = Some((pending, handle));
            }
            Err(err) => self.show_notice(Notice::error(err.to_string())),
        }
    }

    pub fn add_text_source(&mut self, text: &str) {
        if let Err(err) = self.sources.add_text(text) {
            self.show_notice(Notice::error(err.to_string()));
        }
    }

    pub fn add_url_source(&mut self, url: &str) {
        if let Err(err) = self.sources.add_url(url) {
            self.show_notice(Notice::error(err.to_string()));
        }
    }

    // Conversations

    pub fn submit_question(&mut self) {
        let Some(context) = self.active_context() else {
            self.show_notice(Notice::info("Select or upload a source first"));
            return;
        };
        if context == ContextKey::Eligibility && self.conversations.profile().is_none() {
            self.show_notice(Notice::info("Fill in your profile first (press p)"));
            return;
        }

        match self.conversations.begin_ask(context, &self.chat_input) {
            Ok(Some(pending)) => {
                self.chat_input.clear();
                self.chat_cursor = 0;
                self.input_mode = InputMode::Normal;
                self.follow_chat = true;

                let client = self.client.clone();
                let question = pending.question().to_string();
                let descriptor = pending.descriptor().clone();
                let handle =
                    tokio::spawn(async move { client.answer(&question, &descriptor).await });
                self.ask_tasks.push((pending, handle));
            }
            Ok(None) => {}
            // Busy already raised a notice
            Err(err) => tracing::debug!(error = %err, "question not sent"),
        }
    }

    pub fn clear_active_conversation(&mut self) {
        if let Some(context) = self.active_context() {
            self.conversations.clear(&context);
        }
    }

    pub fn start_history_load(&mut self) {
        let Some(context) = self.active_context() else {
            return;
        };
        if self.history_task.is_some() {
            return;
        }
        if self.conversations.is_pending(&context) {
            self.show_notice(Notice::info("Still waiting for the previous answer"));
            return;
        }
        let client = self.client.clone();
        let key = context.clone();
        let handle = tokio::spawn(async move { client.fetch(&key).await });
        self.history_task = Some((context, handle));
    }

    // Session

    pub fn submit_auth(&mut self) {
        if self.auth_task.is_some() {
            return;
        }
        let email = self.auth_form.email.trim().to_string();
        let password = self.auth_form.password.clone();
        if email.is_empty() || password.is_empty() {
            self.auth_form.error = Some("Please fill all fields".to_string());
            return;
        }
        self.auth_form.error = None;

        let client = self.client.without_token();
        let mode = self.auth_form.mode;
        self.auth_task = Some(tokio::spawn(sign_in(client, mode, email, password)));
    }

    pub fn begin_profile_edit(&mut self) {
        self.profile_form = self
            .conversations
            .profile()
            .map(ProfileForm::from_profile)
            .unwrap_or_default();
        self.editing_profile = true;
    }

    pub fn cancel_profile_edit(&mut self) {
        self.editing_profile = false;
        self.profile_form.error = None;
    }

    pub fn submit_profile(&mut self) {
        if self.profile_task.is_some() {
            return;
        }
        let profile = match self.profile_form.to_profile() {
            Ok(profile) => profile,
            Err(message) => {
                self.profile_form.error = Some(message);
                return;
            }
        };
        self.profile_form.error = None;

        let client = self.client.clone();
        let body = profile.clone();
        let handle = tokio::spawn(async move { client.save_profile(&body).await });
        self.profile_task = Some((profile, handle));
    }

    pub fn logout(&mut self) {
        for (_, handle) in self.ask_tasks.drain(..) {
            handle.abort();
        }
        if let Some((_, handle)) = self.upload_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.refresh_task.take() {
            handle.abort();
        }
        if let Some((_, handle)) = self.history_task.take() {
            handle.abort();
        }
        if let Some((_, handle)) = self.profile_task.take() {
            handle.abort();
        }

        if let Err(err) = self.session_store.clear() {
            tracing::warn!(error = %err, "failed to remove session file");
        }
        self.session = None;
        self.client = self.client.without_token();
        self.sources.clear();
        self.conversations.clear_all();

        self.auth_form = AuthForm::default();
        self.profile_form = ProfileForm::default();
        self.editing_profile = false;
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.chat_mode = ChatMode::Eligibility;
        self.prompt = None;
        tracing::info!("signed out");
        self.show_notice(Notice::info("Logged out successfully"));
    }

    fn establish_session(&mut self, session: AuthSession) {
        tracing::info!(user_id = %session.user_id, "session started");
        self.client = self.client.with_token(session.token.clone());
        self.persist_session(&session);
        self.conversations.set_profile(session.profile.clone());
        let main = SessionGuard::view(Some(&session)) == View::Main;
        self.session = Some(session);
        self.auth_form = AuthForm::default();
        self.sync_active_context();
        if main {
            self.start_refresh();
        }
    }

    fn persist_session(&mut self, session: &AuthSession) {
        if let Err(err) = self.session_store.save(session) {
            tracing::warn!(error = %err, "failed to save session");
            self.show_notice(Notice::error("Could not save the session to disk"));
        }
    }

    // Polling

    /// Settle every request that finished since the last tick
    pub async fn poll_tasks(&mut self) {
        let mut running = Vec::with_capacity(self.ask_tasks.len());
        for (pending, handle) in std::mem::take(&mut self.ask_tasks) {
            if !handle.is_finished() {
                running.push((pending, handle));
                continue;
            }
            let question = pending.question().to_string();
            let result = joined(handle.await);
            match self.conversations.complete_ask(pending, result) {
                Ok(()) => self.follow_chat = true,
                Err(StoreError::Service(_)) => self.restore_question(question),
                Err(err) => tracing::debug!(error = %err, "reply not applied"),
            }
        }
        self.ask_tasks = running;

        if self
            .upload_task
            .as_ref()
            .is_some_and(|(_, h)| h.is_finished())
        {
            if let Some((pending, handle)) = self.upload_task.take() {
                let result = joined(handle.await);
                if self.sources.complete_upload(pending, result).is_ok() {
                    self.chat_mode = ChatMode::Documents;
                    self.sync_active_context();
                }
            }
        }

        if self.refresh_task.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.refresh_task.take() {
                let result = joined(handle.await);
                let _ = self.sources.complete_refresh(result);
                self.sync_active_context();
            }
        }

        if self
            .history_task
            .as_ref()
            .is_some_and(|(_, h)| h.is_finished())
        {
            if let Some((context, handle)) = self.history_task.take() {
                let result = joined(handle.await);
                if let Ok(count) = self.conversations.apply_history(context, result) {
                    self.show_notice(Notice::info(format!("Loaded {} messages", count)));
                }
            }
        }

        if self.auth_task.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.auth_task.take() {
                match joined(handle.await) {
                    Ok(session) => self.establish_session(session),
                    Err(err) => {
                        tracing::warn!(error = %err, "sign in failed");
                        self.auth_form.error = Some(err.to_string());
                    }
                }
            }
        }

        if self
            .profile_task
            .as_ref()
            .is_some_and(|(_, h)| h.is_finished())
        {
            if let Some((profile, handle)) = self.profile_task.take() {
                match joined(handle.await) {
                    Ok(()) => self.profile_saved(profile),
                    Err(err) => {
                        tracing::warn!(error = %err, "profile save failed");
                        self.profile_form.error = Some(err.to_string());
                    }
                }
            }
        }
    }

    fn profile_saved(&mut self, profile: EligibilityProfile) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let first_time = !session.profile_completed;
        session.complete_profile(profile.clone());
        self.persist_session(&session);
        self.session = Some(session);
        self.conversations.set_profile(Some(profile));
        self.editing_profile = false;
        self.show_notice(Notice::info("Profile saved"));
        if first_time {
            self.start_refresh();
        }
    }

    fn restore_question(&mut self, question: String) {
        if self.chat_input.is_empty() {
            self.chat_cursor = question.chars().count();
            self.chat_input = question;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }
}

/// Log in or register, then ask the backend whether a profile exists
async fn sign_in(
    client: BackendClient,
    mode: AuthMode,
    email: String,
    password: String,
) -> Result<AuthSession, ServiceError> {
    let mut session = match mode {
        AuthMode::Login => client.login(&email, &password).await?,
        AuthMode::Register => client.register(&email, &password).await?,
    };
    if mode == AuthMode::Login {
        let authed = client.with_token(session.token.clone());
        session.profile_completed = authed.has_profile().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "profile lookup failed");
            false
        });
    }
    Ok(session)
}

fn joined<T>(result: Result<Result<T, ServiceError>, JoinError>) -> Result<T, ServiceError> {
    result.unwrap_or_else(|err| Err(ServiceError::Transport(format!("request task failed: {}", err))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> ProfileForm {
        ProfileForm {
            values: [
                "Asha Kumari".to_string(),
                "2006-04-02".to_string(),
                "Bihar".to_string(),
                "1,80,000".to_string(),
                String::new(),
                "86.5%".to_string(),
            ],
            category: 1,
            focus: 0,
            error: None,
        }
    }

    #[test]
    fn test_profile_form_builds_profile() {
        let profile = filled_form().to_profile().unwrap();
        assert_eq!(profile.income, 180000);
        assert_eq!(profile.category, Category::Obc);
        assert_eq!(profile.marks_12, Some(86.5));
    }

    #[test]
    fn test_profile_form_requires_fields() {
        let mut form = filled_form();
        form.values[2] = "  ".to_string();
        assert_eq!(form.to_profile().unwrap_err(), "Please fill all fields");

        let mut form = filled_form();
        form.values[3].clear();
        assert_eq!(form.to_profile().unwrap_err(), "Please fill all fields");
    }

    #[test]
    fn test_profile_form_rejects_bad_numbers() {
        let mut form = filled_form();
        form.values[3] = "lots".to_string();
        assert!(form.to_profile().is_err());

        let mut form = filled_form();
        form.values[5] = "140".to_string();
        assert!(form.to_profile().is_err());
    }

    #[test]
    fn test_profile_form_round_trips_profile() {
        let profile = filled_form().to_profile().unwrap();
        let form = ProfileForm::from_profile(&profile);
        assert_eq!(form.to_profile().unwrap(), profile);
    }

    #[test]
    fn test_category_selector_wraps() {
        let mut form = ProfileForm::default();
        form.cycle_category(false);
        assert_eq!(form.category(), Category::St);
        form.cycle_category(true);
        assert_eq!(form.category(), Category::General);
    }

    #[test]
    fn test_category_field_has_no_text() {
        let mut form = ProfileForm::default();
        for _ in 0..CATEGORY_FIELD {
            form.next_field();
        }
        assert!(form.focused_text().is_none());
        form.prev_field();
        assert!(form.focused_text().is_some());
    }

    #[test]
    fn test_auth_form_toggle_clears_error() {
        let mut form = AuthForm {
            error: Some("Invalid credentials".to_string()),
            ..AuthForm::default()
        };
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::Register);
        assert!(form.error.is_none());
    }

    #[tokio::test]
    async fn test_new_app_without_session_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::new()
        };

        let app = App::new(config).unwrap();

        assert_eq!(app.view(), View::Unauthenticated);
        assert_eq!(app.active_context(), Some(ContextKey::Eligibility));
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_sources() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        store
            .save(&AuthSession {
                token: "tok".to_string(),
                user_id: "u".to_string(),
                email: "a@b.c".to_string(),
                profile_completed: false,
                profile: None,
            })
            .unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::new()
        };

        let mut app = App::new(config).unwrap();
        assert_eq!(app.view(), View::ProfileIncomplete);
        app.add_text_source("notes");
        assert_eq!(app.sources.sources().len(), 1);

        app.logout();

        assert_eq!(app.view(), View::Unauthenticated);
        assert!(app.sources.sources().is_empty());
        assert!(store.load().unwrap().is_none());
    }

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            data_dir: Some(dir.to_path_buf()),
            ..Config::new()
        }
    }

    #[tokio::test]
    async fn test_logout_during_upload_frees_the_uploader() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(config_in(dir.path())).unwrap();
        let path = dir.path().join("m.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        app.start_upload(path.to_str().unwrap()).await;
        assert!(app.sources.is_uploading());

        app.logout();

        assert!(!app.sources.is_uploading());
        let next = UploadFile::new("n.jpg", "image/jpeg", vec![0xFF]);
        assert!(app.sources.begin_upload(&next).is_ok());
    }

    #[tokio::test]
    async fn test_failed_ask_puts_question_back_in_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(config_in(dir.path())).unwrap();
        let pending = app
            .conversations
            .begin_ask(ContextKey::Eligibility, "Am I eligible for NSP?")
            .unwrap()
            .unwrap();
        let handle: Task<yojana_core::services::Answer> =
            tokio::spawn(async { Err(ServiceError::Timeout) });
        app.ask_tasks.push((pending, handle));

        while !app.ask_tasks.is_empty() {
            tokio::task::yield_now().await;
            app.poll_tasks().await;
        }
        app.drain_store_events();

        assert_eq!(app.chat_input, "Am I eligible for NSP?");
        assert_eq!(app.chat_cursor, "Am I eligible for NSP?".chars().count());
        assert!(app.conversations.messages(&ContextKey::Eligibility).is_empty());
        assert_eq!(
            app.notice.as_ref().map(|n| n.level),
            Some(yojana_core::NoticeLevel::Error)
        );
    }

    #[test]
    fn test_joined_passes_results_through() {
        let ok: Result<Result<u8, ServiceError>, JoinError> = Ok(Ok(1));
        assert_eq!(joined(ok).unwrap(), 1);
    }
}
