//! Per-context chat logs with optimistic appends.
//!
//! Asking is a two-phase operation. [`ConversationStore::begin_ask`] appends
//! the user's message straight away and marks the context pending; the caller
//! runs the Q&A request however it likes (inline, or on a spawned task) and
//! hands the result to [`ConversationStore::complete_ask`], which either
//! appends the answer or undoes the optimistic append. [`ConversationStore::ask`]
//! does all three in one call.
//!
//! A reply is only appended while its context is still the active one.
//! Replies that arrive after the user moved on are dropped. The question stays
//! in its log, unanswered, so the user finds it there when they come back.

use std::collections::HashMap;

use crate::error::{Result, ServiceError, StoreError};
use crate::events::{EventBus, Notice, StoreEvent};
use crate::services::{Answer, ContextDescriptor, HistoryService, QaService};
use crate::state::{ChatMessage, ChatRole, ContextKey, EligibilityProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    pending: Option<RequestId>,
    citations: Vec<String>,
}

impl ConversationState {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Sources the backend cited for the latest answer
    pub fn citations(&self) -> &[String] {
        &self.citations
    }

    fn rollback(&mut self, pending: &PendingAsk) {
        let at_position = self.messages.get(pending.position).is_some_and(|m| {
            m.role == ChatRole::User && m.content == pending.question
        });
        if at_position {
            self.messages.remove(pending.position);
            return;
        }
        if let Some(idx) = self
            .messages
            .iter()
            .rposition(|m| m.role == ChatRole::User && m.content == pending.question)
        {
            self.messages.remove(idx);
        }
    }
}

/// Ticket for a question whose answer has not arrived yet
#[derive(Debug, Clone)]
pub struct PendingAsk {
    id: RequestId,
    context: ContextKey,
    question: String,
    position: usize,
    descriptor: ContextDescriptor,
}

impl PendingAsk {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn context(&self) -> &ContextKey {
        &self.context
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn descriptor(&self) -> &ContextDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Nothing to send
    Ignored,
    Answered,
}

pub struct ConversationStore {
    conversations: HashMap<ContextKey, ConversationState>,
    active: Option<ContextKey>,
    profile: Option<EligibilityProfile>,
    next_request: u64,
    events: EventBus,
}

impl ConversationStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            conversations: HashMap::new(),
            active: None,
            profile: None,
            next_request: 0,
            events,
        }
    }

    /// Profile attached to eligibility questions
    pub fn set_profile(&mut self, profile: Option<EligibilityProfile>) {
        self.profile = profile;
    }

    pub fn profile(&self) -> Option<&EligibilityProfile> {
        self.profile.as_ref()
    }

    pub fn active(&self) -> Option<&ContextKey> {
        self.active.as_ref()
    }

    pub fn activate(&mut self, context: Option<ContextKey>) {
        if self.active == context {
            return;
        }
        tracing::debug!(from = ?self.active, to = ?context, "switching conversation context");
        self.active = context.clone();
        self.events.publish(StoreEvent::ActiveContextChanged(context));
    }

    pub fn conversation(&self, context: &ContextKey) -> Option<&ConversationState> {
        self.conversations.get(context)
    }

    pub fn messages(&self, context: &ContextKey) -> &[ChatMessage] {
        self.conversations
            .get(context)
            .map(|c| c.messages())
            .unwrap_or_default()
    }

    pub fn active_messages(&self) -> &[ChatMessage] {
        match &self.active {
            Some(context) => self.messages(context),
            None => &[],
        }
    }

    pub fn is_pending(&self, context: &ContextKey) -> bool {
        self.conversations
            .get(context)
            .is_some_and(|c| c.is_pending())
    }

    pub fn descriptor(&self, context: &ContextKey) -> ContextDescriptor {
        match context {
            ContextKey::Source(id) => ContextDescriptor::source(id.clone()),
            ContextKey::Eligibility => ContextDescriptor::eligibility(self.profile.clone()),
        }
    }

    /// Append the question and mark the context pending.
    ///
    /// Returns `Ok(None)` for a blank question and `Err(Busy)` while another
    /// question in the same context is unanswered; neither touches the log.
    pub fn begin_ask(&mut self, context: ContextKey, question: &str) -> Result<Option<PendingAsk>> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        if self.is_pending(&context) {
            self.events
                .notify(Notice::info("Still waiting for the previous answer"));
            return Err(StoreError::Busy(context));
        }

        let descriptor = self.descriptor(&context);
        let id = RequestId(self.next_request);
        self.next_request += 1;

        let state = self.conversations.entry(context.clone()).or_default();
        let position = state.messages.len();
        state
            .messages
            .push(ChatMessage::user(context.clone(), question));
        state.pending = Some(id);

        tracing::debug!(%context, request = id.0, "question sent");
        self.events
            .publish(StoreEvent::ConversationChanged(context.clone()));

        Ok(Some(PendingAsk {
            id,
            context,
            question: question.to_string(),
            position,
            descriptor,
        }))
    }

    /// Settle a question started with [`begin_ask`](Self::begin_ask).
    pub fn complete_ask(
        &mut self,
        pending: PendingAsk,
        result: std::result::Result<Answer, ServiceError>,
    ) -> Result<()> {
        let context = pending.context.clone();
        let is_active = self.active.as_ref() == Some(&context);

        let Some(state) = self.conversations.get_mut(&context) else {
            tracing::debug!(%context, "dropping reply for a conversation that no longer exists");
            return Err(StoreError::Stale(context));
        };

        if state.pending != Some(pending.id) {
            // cleared while the request was in flight
            tracing::debug!(%context, request = pending.id.0, "dropping reply for a cleared request");
            return Err(StoreError::Stale(context));
        }
        state.pending = None;

        if !is_active {
            tracing::debug!(%context, request = pending.id.0, "dropping stale reply");
            self.events.publish(StoreEvent::ConversationChanged(context.clone()));
            return Err(StoreError::Stale(context));
        }

        match result {
            Ok(answer) => {
                state
                    .messages
                    .push(ChatMessage::assistant(context.clone(), answer.text));
                state.citations = answer.citations;
                tracing::debug!(%context, request = pending.id.0, "answer received");
                self.events.publish(StoreEvent::ConversationChanged(context));
                Ok(())
            }
            Err(err) => {
                state.rollback(&pending);
                tracing::warn!(%context, error = %err, "question failed, rolled back");
                self.events
                    .notify(Notice::error(format!("Failed to get response: {}", err)));
                self.events.publish(StoreEvent::ConversationChanged(context));
                Err(StoreError::Service(err))
            }
        }
    }

    pub async fn ask(
        &mut self,
        service: &dyn QaService,
        context: ContextKey,
        question: &str,
    ) -> Result<AskOutcome> {
        let Some(pending) = self.begin_ask(context, question)? else {
            return Ok(AskOutcome::Ignored);
        };
        let result = service.answer(pending.question(), pending.descriptor()).await;
        self.complete_ask(pending, result)?;
        Ok(AskOutcome::Answered)
    }

    /// Empty one context's log. An answer still in flight for it is dropped
    /// when it arrives.
    pub fn clear(&mut self, context: &ContextKey) {
        if let Some(state) = self.conversations.get_mut(context) {
            state.messages.clear();
            state.citations.clear();
            state.pending = None;
        }
        self.events
            .publish(StoreEvent::ConversationChanged(context.clone()));
    }

    /// Forget every conversation (logout)
    pub fn clear_all(&mut self) {
        let contexts: Vec<ContextKey> = self.conversations.keys().cloned().collect();
        self.conversations.clear();
        self.active = None;
        self.profile = None;
        for context in contexts {
            self.events.publish(StoreEvent::ConversationChanged(context));
        }
        self.events.publish(StoreEvent::ActiveContextChanged(None));
    }

    /// Replace the log with the backend's stored history. On failure the
    /// in-memory log is kept.
    pub async fn load_history(
        &mut self,
        service: &dyn HistoryService,
        context: ContextKey,
    ) -> Result<usize> {
        if self.is_pending(&context) {
            return Err(StoreError::Busy(context));
        }
        let result = service.fetch(&context).await;
        self.apply_history(context, result)
    }

    /// Settle a history fetch. A question asked while the fetch was in
    /// flight wins and the history is discarded.
    pub fn apply_history(
        &mut self,
        context: ContextKey,
        result: std::result::Result<Vec<ChatMessage>, ServiceError>,
    ) -> Result<usize> {
        if self.is_pending(&context) {
            tracing::debug!(%context, "discarding history, a question is in flight");
            return Err(StoreError::Busy(context));
        }

        match result {
            Ok(history) => {
                let messages: Vec<ChatMessage> = history
                    .into_iter()
                    .map(|m| ChatMessage {
                        context: context.clone(),
                        ..m
                    })
                    .collect();
                let count = messages.len();
                let state = self.conversations.entry(context.clone()).or_default();
                state.messages = messages;
                state.citations.clear();
                tracing::debug!(%context, count, "history loaded");
                self.events.publish(StoreEvent::ConversationChanged(context));
                Ok(count)
            }
            Err(ServiceError::Unsupported(what)) => {
                tracing::debug!(%context, what, "history not available");
                self.events.notify(Notice::info(format!(
                    "Saved history is not available on this server ({})",
                    what
                )));
                Err(StoreError::Service(ServiceError::Unsupported(what)))
            }
            Err(err) => {
                tracing::warn!(%context, error = %err, "history fetch failed");
                self.events
                    .notify(Notice::error(format!("Failed to load history: {}", err)));
                Err(StoreError::Service(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::state::{Category, SourceId};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedQa {
        replies: Mutex<VecDeque<std::result::Result<Answer, ServiceError>>>,
        calls: Mutex<Vec<(String, ContextDescriptor)>>,
    }

    impl ScriptedQa {
        fn replying(replies: Vec<std::result::Result<Answer, ServiceError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<(String, ContextDescriptor)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QaService for ScriptedQa {
        async fn answer(
            &self,
            question: &str,
            context: &ContextDescriptor,
        ) -> std::result::Result<Answer, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push((question.to_string(), context.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ServiceError::Timeout))
        }
    }

    struct FixedHistory(std::result::Result<Vec<ChatMessage>, ()>);

    #[async_trait]
    impl HistoryService for FixedHistory {
        async fn fetch(
            &self,
            _context: &ContextKey,
        ) -> std::result::Result<Vec<ChatMessage>, ServiceError> {
            self.0.clone().map_err(|_| ServiceError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
    }

    fn answer(text: &str) -> std::result::Result<Answer, ServiceError> {
        Ok(Answer {
            text: text.to_string(),
            citations: vec!["nsp-guidelines.pdf".to_string()],
        })
    }

    fn doc(id: &str) -> ContextKey {
        ContextKey::Source(SourceId::new(id))
    }

    fn store_on(context: ContextKey) -> ConversationStore {
        let mut store = ConversationStore::new(EventBus::new());
        store.activate(Some(context));
        store
    }

    #[test]
    fn test_begin_ask_appends_before_any_reply() {
        let mut store = store_on(doc("a"));

        let pending = store.begin_ask(doc("a"), "  What are my marks?  ").unwrap();

        assert!(pending.is_some());
        let messages = store.messages(&doc("a"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "What are my marks?");
        assert!(store.is_pending(&doc("a")));
    }

    #[test]
    fn test_blank_question_is_ignored() {
        let mut store = store_on(doc("a"));

        assert!(store.begin_ask(doc("a"), "   \n").unwrap().is_none());
        assert!(store.messages(&doc("a")).is_empty());
        assert!(!store.is_pending(&doc("a")));
    }

    #[test]
    fn test_second_question_while_pending_is_rejected() {
        let mut store = store_on(doc("a"));
        let _first = store.begin_ask(doc("a"), "first").unwrap();

        let err = store.begin_ask(doc("a"), "second").unwrap_err();

        assert!(matches!(err, StoreError::Busy(_)));
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(store.messages(&doc("a")).len(), 1);
    }

    #[test]
    fn test_other_contexts_are_not_blocked() {
        let mut store = store_on(doc("a"));
        let _a = store.begin_ask(doc("a"), "about a").unwrap();

        let b = store.begin_ask(ContextKey::Eligibility, "am I eligible?").unwrap();

        assert!(b.is_some());
        assert!(store.is_pending(&doc("a")));
        assert!(store.is_pending(&ContextKey::Eligibility));
    }

    #[tokio::test]
    async fn test_successful_ask_appends_answer() {
        let mut store = store_on(doc("a"));
        let qa = ScriptedQa::replying(vec![answer("You scored **90%**.")]);

        let outcome = store.ask(&qa, doc("a"), "What did I score?").await.unwrap();

        assert_eq!(outcome, AskOutcome::Answered);
        let messages = store.messages(&doc("a"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "You scored **90%**.");
        assert_eq!(messages[1].context, doc("a"));
        assert!(!store.is_pending(&doc("a")));
        assert_eq!(
            store.conversation(&doc("a")).unwrap().citations(),
            ["nsp-guidelines.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_ask_rolls_back() {
        let mut store = store_on(doc("a"));
        let qa = ScriptedQa::replying(vec![answer("first answer"), Err(ServiceError::Timeout)]);
        store.ask(&qa, doc("a"), "first").await.unwrap();
        let before = store.messages(&doc("a")).len();

        let err = store.ask(&qa, doc("a"), "second").await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        assert_eq!(store.messages(&doc("a")).len(), before);
        assert!(!store.is_pending(&doc("a")));
    }

    #[tokio::test]
    async fn test_failure_emits_notice() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut store = ConversationStore::new(bus);
        store.activate(Some(doc("a")));
        let qa = ScriptedQa::replying(vec![Err(ServiceError::Timeout)]);

        let _ = store.ask(&qa, doc("a"), "hello").await;

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if let StoreEvent::Notice(notice) = event {
                saw_error |= notice.level == crate::events::NoticeLevel::Error;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let mut store = store_on(doc("a"));
        let qa = ScriptedQa::replying(vec![Err(ServiceError::Timeout), answer("ok")]);

        assert!(store.ask(&qa, doc("a"), "again?").await.is_err());
        store.ask(&qa, doc("a"), "again?").await.unwrap();

        let contents: Vec<&str> = store
            .messages(&doc("a"))
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["again?", "ok"]);
    }

    #[test]
    fn test_stale_reply_is_not_appended_to_new_context() {
        let mut store = store_on(doc("a"));
        let pending = store.begin_ask(doc("a"), "my question").unwrap().unwrap();

        store.activate(Some(doc("b")));
        let err = store.complete_ask(pending, answer("late")).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Stale);
        assert!(!err.is_user_visible());
        assert!(store.messages(&doc("b")).is_empty());
        assert!(!store.is_pending(&doc("a")));

        store.activate(Some(doc("a")));
        let messages = store.active_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "my question");
    }

    #[test]
    fn test_question_can_be_asked_again_after_stale_reply() {
        let mut store = store_on(doc("a"));
        let pending = store.begin_ask(doc("a"), "my question").unwrap().unwrap();
        store.activate(Some(doc("b")));
        store.complete_ask(pending, answer("late")).unwrap_err();
        store.activate(Some(doc("a")));

        let retry = store.begin_ask(doc("a"), "my question").unwrap().unwrap();
        store.complete_ask(retry, answer("now")).unwrap();

        let contents: Vec<&str> = store
            .active_messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["my question", "my question", "now"]);
    }

    #[test]
    fn test_reply_lands_after_switching_back() {
        let mut store = store_on(doc("a"));
        let pending = store.begin_ask(doc("a"), "about a").unwrap().unwrap();

        store.activate(Some(doc("b")));
        store.activate(Some(doc("a")));
        store.complete_ask(pending, answer("answer a")).unwrap();

        assert_eq!(store.messages(&doc("a")).len(), 2);
        assert!(store.messages(&doc("b")).is_empty());
    }

    #[test]
    fn test_reply_after_clear_is_dropped() {
        let mut store = store_on(doc("a"));
        let pending = store.begin_ask(doc("a"), "question").unwrap().unwrap();

        store.clear(&doc("a"));
        let err = store.complete_ask(pending, answer("late")).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Stale);
        assert!(store.messages(&doc("a")).is_empty());
        assert!(!store.is_pending(&doc("a")));
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut store = store_on(doc("a"));
        let p = store.begin_ask(doc("a"), "in a").unwrap().unwrap();
        store.complete_ask(p, answer("reply a")).unwrap();

        store.activate(Some(doc("b")));
        assert!(store.active_messages().is_empty());

        store.activate(Some(doc("a")));
        assert_eq!(store.active_messages().len(), 2);
    }

    #[test]
    fn test_clear_only_touches_one_context() {
        let mut store = store_on(doc("a"));
        let p = store.begin_ask(doc("a"), "in a").unwrap().unwrap();
        store.complete_ask(p, answer("reply")).unwrap();
        store.activate(Some(doc("b")));
        let p = store.begin_ask(doc("b"), "in b").unwrap().unwrap();
        store.complete_ask(p, answer("reply")).unwrap();

        store.clear(&doc("a"));

        assert!(store.messages(&doc("a")).is_empty());
        assert_eq!(store.messages(&doc("b")).len(), 2);
    }

    #[tokio::test]
    async fn test_eligibility_question_carries_profile() {
        let mut store = store_on(ContextKey::Eligibility);
        let profile = EligibilityProfile {
            name: "Asha".to_string(),
            dob: "2006-04-12".to_string(),
            state: "Bihar".to_string(),
            income: 250_000,
            category: Category::Sc,
            marks_12: Some(90.0),
        };
        store.set_profile(Some(profile.clone()));
        let qa = ScriptedQa::replying(vec![answer("Yes")]);

        store
            .ask(&qa, ContextKey::Eligibility, "Which scholarships fit me?")
            .await
            .unwrap();

        let calls = qa.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Which scholarships fit me?");
        assert_eq!(calls[0].1.profile, Some(profile));
    }

    #[tokio::test]
    async fn test_document_question_carries_source_id() {
        let mut store = store_on(doc("m-1"));
        let qa = ScriptedQa::replying(vec![answer("Physics: 88")]);

        store.ask(&qa, doc("m-1"), "Physics marks?").await.unwrap();

        assert_eq!(qa.calls()[0].1, ContextDescriptor::source(SourceId::new("m-1")));
    }

    #[test]
    fn test_duplicate_questions_roll_back_the_right_one() {
        let mut store = store_on(doc("a"));
        let p = store.begin_ask(doc("a"), "same").unwrap().unwrap();
        store.complete_ask(p, answer("reply")).unwrap();

        let p = store.begin_ask(doc("a"), "same").unwrap().unwrap();
        store
            .complete_ask(p, Err(ServiceError::Transport("reset".to_string())))
            .unwrap_err();

        let roles: Vec<ChatRole> = store.messages(&doc("a")).iter().map(|m| m.role).collect();
        assert_eq!(roles, [ChatRole::User, ChatRole::Assistant]);
    }

    #[tokio::test]
    async fn test_load_history_replaces_log() {
        let mut store = store_on(doc("a"));
        let p = store.begin_ask(doc("a"), "local").unwrap().unwrap();
        store.complete_ask(p, answer("reply")).unwrap();
        let history = FixedHistory(Ok(vec![
            ChatMessage::user(doc("a"), "old question"),
            ChatMessage::assistant(ContextKey::Eligibility, "old answer"),
        ]));

        let count = store.load_history(&history, doc("a")).await.unwrap();

        assert_eq!(count, 2);
        let messages = store.messages(&doc("a"));
        assert_eq!(messages[0].content, "old question");
        assert!(messages.iter().all(|m| m.context == doc("a")));
    }

    #[tokio::test]
    async fn test_failed_history_keeps_log() {
        let mut store = store_on(doc("a"));
        let p = store.begin_ask(doc("a"), "local").unwrap().unwrap();
        store.complete_ask(p, answer("reply")).unwrap();

        let err = store
            .load_history(&FixedHistory(Err(())), doc("a"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        assert_eq!(store.messages(&doc("a")).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_history_emits_notice() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut store = ConversationStore::new(bus);
        store.activate(Some(doc("a")));

        let _ = store.load_history(&FixedHistory(Err(())), doc("a")).await;

        let notices: Vec<Notice> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                StoreEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, crate::events::NoticeLevel::Error);
        assert!(notices[0].text.starts_with("Failed to load history"));
    }

    #[test]
    fn test_unsupported_history_is_an_info_notice() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut store = ConversationStore::new(bus);
        store.activate(Some(doc("a")));

        let err = store
            .apply_history(doc("a"), Err(ServiceError::Unsupported("chat history")))
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        let notice = std::iter::from_fn(|| rx.try_recv().ok())
            .find_map(|event| match event {
                StoreEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .unwrap();
        assert_eq!(notice.level, crate::events::NoticeLevel::Info);
        assert!(notice.text.contains("not available"));
    }

    #[test]
    fn test_history_arriving_during_ask_is_discarded() {
        let mut store = store_on(doc("a"));
        let _p = store.begin_ask(doc("a"), "in flight").unwrap().unwrap();

        let err = store
            .apply_history(doc("a"), Ok(vec![ChatMessage::user(doc("a"), "old")]))
            .unwrap_err();

        assert!(matches!(err, StoreError::Busy(_)));
        assert_eq!(store.messages(&doc("a"))[0].content, "in flight");
    }

    #[test]
    fn test_clear_all_forgets_everything() {
        let mut store = store_on(doc("a"));
        let _ = store.begin_ask(doc("a"), "q").unwrap();

        store.clear_all();

        assert!(store.active().is_none());
        assert!(store.messages(&doc("a")).is_empty());
        assert!(!store.is_pending(&doc("a")));
    }
}
