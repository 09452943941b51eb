use std::cell::{Cell, RefCell};

use crate::api::ChatBackend;
use crate::config::WidgetConfig;
use crate::error::ApiError;
use crate::protocol::Sender;
use crate::storage::SessionStorage;
use crate::view::ConversationView;

/// Greeting shown for a brand-new or empty conversation.
pub const GREETING: &str = "Hi there! How can I help you today?";

/// Shown instead of the greeting when the session could not be created.
pub const SESSION_ERROR: &str =
    "Could not start a chat session. Please try again later.";

/// Shown when a message is submitted before a session exists.
pub const NO_SESSION_WARNING: &str =
    "The chat is not connected yet. Please use the refresh button and try again.";

/// Assistant-slot reply for a failed request that never reached the server.
pub const NETWORK_ERROR_REPLY: &str =
    "Sorry, I could not reach the server. Please check your connection and try again.";

fn server_error_reply(status: u16) -> String {
    format!(
        "Sorry, something went wrong on the server (HTTP {}). Please try again.",
        status
    )
}

/// Owns the session identifier and drives the conversation through three
/// injected ports: the remote backend, the persistence layer, and the
/// rendered view.
///
/// All methods take `&self`; state lives in `Cell`/`RefCell` because the
/// browser event loop is single-threaded and handlers share the controller
/// through an `Rc`. The epoch counter guards against stale completions: a
/// reset bumps it, and any in-flight operation that resumes under a
/// different epoch discards its result instead of touching the view.
pub struct ChatController<B, S, V> {
    config: WidgetConfig,
    backend: B,
    storage: S,
    view: V,
    session: RefCell<Option<String>>,
    epoch: Cell<u64>,
}

impl<B, S, V> ChatController<B, S, V>
where
    B: ChatBackend,
    S: SessionStorage,
    V: ConversationView,
{
    pub fn new(config: WidgetConfig, backend: B, storage: S, view: V) -> Self {
        Self {
            config,
            backend,
            storage,
            view,
            session: RefCell::new(None),
            epoch: Cell::new(0),
        }
    }

    /// Current session identifier, if one is established.
    pub fn session_id(&self) -> Option<String> {
        self.session.borrow().clone()
    }

    /// Restore the persisted session or mint a fresh one, then load the
    /// transcript. A creation failure is surfaced as a system message and
    /// leaves the widget without a session; no automatic retry.
    pub async fn init_session(&self) {
        let epoch = self.epoch.get();

        let stored = self.storage.get(&self.config.storage_key);
        let session_id = match stored {
            Some(id) if !id.is_empty() => {
                log::info!("restored chat session {}", id);
                id
            }
            _ => match self.backend.new_session().await {
                Ok(id) => {
                    if self.epoch.get() != epoch {
                        return;
                    }
                    log::info!("created chat session {}", id);
                    self.storage.set(&self.config.storage_key, &id);
                    self.view.append(Sender::System, GREETING);
                    id
                }
                Err(err) => {
                    if self.epoch.get() != epoch {
                        return;
                    }
                    log::warn!("session creation failed: {}", err);
                    self.view.append(Sender::System, SESSION_ERROR);
                    return;
                }
            },
        };

        *self.session.borrow_mut() = Some(session_id);
        self.load_history().await;
    }

    /// Drop the current conversation and session, then start over with a
    /// fresh identifier. The server is not told; it may keep stale state
    /// keyed by the old identifier.
    pub async fn reset_session(&self) {
        self.epoch.set(self.epoch.get() + 1);
        self.view.clear();
        self.storage.remove(&self.config.storage_key);
        self.session.borrow_mut().take();
        log::info!("chat session reset");
        self.init_session().await;
    }

    /// Fetch and render the transcript for the current session. Failures
    /// are deliberately silent: a lost transcript does not block the
    /// widget, unlike a failed session creation.
    pub async fn load_history(&self) {
        let session = self.session.borrow().clone();
        let Some(session_id) = session else {
            return;
        };
        let epoch = self.epoch.get();

        match self.backend.history(&session_id).await {
            Ok(messages) => {
                if self.epoch.get() != epoch {
                    return;
                }
                self.view.clear();
                if messages.is_empty() {
                    self.view.append(Sender::System, GREETING);
                } else {
                    for message in &messages {
                        self.view
                            .append(Sender::from_wire(&message.sender), &message.text);
                    }
                }
                log::debug!("loaded {} history messages", messages.len());
            }
            Err(err) => {
                log::debug!("history load failed: {}", err);
            }
        }
    }

    /// Send one user message and render exactly one terminal outcome: the
    /// reply, a status-coded error, or a generic network error.
    pub async fn send_message(&self, raw_input: &str) {
        self.send_message_with_images(raw_input, &[]).await;
    }

    /// Like [`send_message`](Self::send_message), with image URLs attached
    /// for a vision-capable backend.
    pub async fn send_message_with_images(&self, raw_input: &str, image_urls: &[String]) {
        let text = raw_input.trim();
        if text.is_empty() {
            return;
        }

        let session = self.session.borrow().clone();
        let Some(session_id) = session else {
            self.view.append(Sender::System, NO_SESSION_WARNING);
            return;
        };

        let epoch = self.epoch.get();
        self.view.append(Sender::User, text);
        self.view.show_typing();

        let result = self.backend.chat(&session_id, text, image_urls).await;
        if self.epoch.get() != epoch {
            // A reset already cleared the view, placeholder included.
            return;
        }

        self.view.hide_typing();
        match result {
            Ok(reply) => self.view.append(Sender::Assistant, &reply),
            Err(ApiError::Status(status)) => {
                log::warn!("chat request rejected with HTTP {}", status);
                self.view
                    .append(Sender::Assistant, &server_error_reply(status));
            }
            Err(err) => {
                log::warn!("chat request failed: {}", err);
                self.view.append(Sender::Assistant, NETWORK_ERROR_REPLY);
            }
        }
    }

    /// Fire-and-forget page-view ping keyed by the session identifier.
    pub async fn record_visit(&self, page: &str) {
        let session = self.session.borrow().clone();
        let Some(session_id) = session else {
            return;
        };
        if let Err(err) = self.backend.track_visit(&session_id, page).await {
            log::debug!("visit ping failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WireMessage;
    use crate::storage::MemoryStorage;

    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use async_trait::async_trait;

    #[derive(Default)]
    struct FakeBackend {
        /// `None` makes `new_session` fail with a transport error.
        session_id: RefCell<Option<String>>,
        /// `None` makes `history` fail; `Some(vec)` succeeds.
        history: RefCell<Option<Vec<WireMessage>>>,
        /// `Some(Ok(_))` reply, `Some(Err(status))`, `None` transport error.
        chat_reply: RefCell<Option<Result<String, u16>>>,
        /// When set, `chat` waits on this gate before resolving.
        chat_gate: RefCell<Option<oneshot::Receiver<()>>>,
        last_images: RefCell<Option<Vec<String>>>,
        new_session_calls: Cell<usize>,
        history_calls: Cell<usize>,
        chat_calls: Cell<usize>,
        visits: RefCell<Vec<(String, String)>>,
    }

    #[async_trait(?Send)]
    impl ChatBackend for FakeBackend {
        async fn new_session(&self) -> Result<String, ApiError> {
            self.new_session_calls.set(self.new_session_calls.get() + 1);
            match self.session_id.borrow().clone() {
                Some(id) => Ok(id),
                None => Err(ApiError::Transport("connection refused".into())),
            }
        }

        async fn history(&self, _session_id: &str) -> Result<Vec<WireMessage>, ApiError> {
            self.history_calls.set(self.history_calls.get() + 1);
            match self.history.borrow().clone() {
                Some(messages) => Ok(messages),
                None => Err(ApiError::Status(500)),
            }
        }

        async fn chat(
            &self,
            _session_id: &str,
            _message: &str,
            image_urls: &[String],
        ) -> Result<String, ApiError> {
            self.chat_calls.set(self.chat_calls.get() + 1);
            *self.last_images.borrow_mut() = Some(image_urls.to_vec());
            let gate = self.chat_gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match self.chat_reply.borrow().clone() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(status)) => Err(ApiError::Status(status)),
                None => Err(ApiError::Transport("connection reset".into())),
            }
        }

        async fn track_visit(&self, visitor_id: &str, page: &str) -> Result<(), ApiError> {
            self.visits
                .borrow_mut()
                .push((visitor_id.to_string(), page.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingView {
        entries: RefCell<Vec<(Sender, String)>>,
        typing: Cell<bool>,
        clears: Cell<usize>,
    }

    impl ConversationView for RecordingView {
        fn append(&self, sender: Sender, text: &str) {
            // Same contract as the DOM view: the placeholder never
            // survives a real insertion.
            self.typing.set(false);
            self.entries
                .borrow_mut()
                .push((sender, text.to_string()));
        }

        fn show_typing(&self) {
            self.typing.set(true);
        }

        fn hide_typing(&self) {
            self.typing.set(false);
        }

        fn clear(&self) {
            self.entries.borrow_mut().clear();
            self.typing.set(false);
            self.clears.set(self.clears.get() + 1);
        }
    }

    type TestController = ChatController<FakeBackend, MemoryStorage, RecordingView>;

    fn controller() -> TestController {
        ChatController::new(
            WidgetConfig::default(),
            FakeBackend::default(),
            MemoryStorage::new(),
            RecordingView::default(),
        )
    }

    fn backend(c: &TestController) -> &FakeBackend {
        &c.backend
    }

    fn view(c: &TestController) -> &RecordingView {
        &c.view
    }

    fn entries(c: &TestController) -> Vec<(Sender, String)> {
        view(c).entries.borrow().clone()
    }

    #[test]
    fn test_fresh_client_creates_session_and_greets() {
        let c = controller();
        *backend(&c).session_id.borrow_mut() = Some("abc123".to_string());
        *backend(&c).history.borrow_mut() = Some(Vec::new());

        block_on(c.init_session());

        assert_eq!(c.session_id(), Some("abc123".to_string()));
        assert_eq!(
            c.storage.get(DEFAULT_KEY),
            Some("abc123".to_string()),
            "durable and in-memory copies must match"
        );
        assert_eq!(backend(&c).new_session_calls.get(), 1);
        assert_eq!(backend(&c).history_calls.get(), 1);
        // The empty-history greeting replaces the creation greeting; the
        // user sees exactly one.
        assert_eq!(entries(&c), vec![(Sender::System, GREETING.to_string())]);
    }

    const DEFAULT_KEY: &str = "chat_session_id";

    #[test]
    fn test_restored_session_skips_new_session_call() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(vec![
            WireMessage {
                sender: "You".to_string(),
                text: "hi".to_string(),
            },
            WireMessage {
                sender: "AI".to_string(),
                text: "**hello**".to_string(),
            },
        ]);

        block_on(c.init_session());

        assert_eq!(backend(&c).new_session_calls.get(), 0);
        assert_eq!(backend(&c).history_calls.get(), 1);
        assert_eq!(c.session_id(), Some("xyz".to_string()));
        assert_eq!(
            entries(&c),
            vec![
                (Sender::User, "hi".to_string()),
                (Sender::Assistant, "**hello**".to_string()),
            ],
            "history renders in server order with no greeting"
        );
    }

    #[test]
    fn test_session_creation_failure_is_surfaced_and_blocking() {
        let c = controller();
        // session_id stays None -> new_session fails

        block_on(c.init_session());

        assert_eq!(c.session_id(), None);
        assert_eq!(c.storage.get(DEFAULT_KEY), None);
        assert_eq!(backend(&c).history_calls.get(), 0);
        assert_eq!(
            entries(&c),
            vec![(Sender::System, SESSION_ERROR.to_string())]
        );
    }

    #[test]
    fn test_history_failure_is_silent() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        // history stays None -> load fails

        block_on(c.init_session());

        assert_eq!(c.session_id(), Some("xyz".to_string()));
        assert!(entries(&c).is_empty(), "no error entry is rendered");
        assert_eq!(view(&c).clears.get(), 0, "the view is left as-is");
    }

    #[test]
    fn test_empty_history_greets_restored_session() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());

        block_on(c.init_session());

        assert_eq!(entries(&c), vec![(Sender::System, GREETING.to_string())]);
    }

    #[test]
    fn test_whitespace_input_is_a_silent_no_op() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        block_on(c.init_session());
        let before = entries(&c);

        block_on(c.send_message("   "));

        assert_eq!(entries(&c), before);
        assert_eq!(backend(&c).chat_calls.get(), 0);
    }

    #[test]
    fn test_send_without_session_warns_and_skips_network() {
        let c = controller();

        block_on(c.send_message("hello"));

        assert_eq!(
            entries(&c),
            vec![(Sender::System, NO_SESSION_WARNING.to_string())]
        );
        assert_eq!(backend(&c).chat_calls.get(), 0);
    }

    #[test]
    fn test_reply_is_rendered_as_assistant_message() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).chat_reply.borrow_mut() = Some(Ok("the answer is 4".to_string()));
        block_on(c.init_session());

        block_on(c.send_message("2+2?"));

        let all = entries(&c);
        assert_eq!(all[all.len() - 2], (Sender::User, "2+2?".to_string()));
        assert_eq!(
            all[all.len() - 1],
            (Sender::Assistant, "the answer is 4".to_string())
        );
        assert!(!view(&c).typing.get());
    }

    #[test]
    fn test_server_error_reply_embeds_status_code() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).chat_reply.borrow_mut() = Some(Err(500));
        block_on(c.init_session());

        block_on(c.send_message("2+2?"));

        let all = entries(&c);
        let (sender, text) = all.last().unwrap();
        assert_eq!(*sender, Sender::Assistant);
        assert!(text.contains("500"), "status code is shown: {}", text);
        assert!(!view(&c).typing.get());
    }

    #[test]
    fn test_transport_error_renders_generic_reply() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        // chat_reply stays None -> transport error
        block_on(c.init_session());

        block_on(c.send_message("anyone there?"));

        let all = entries(&c);
        assert_eq!(
            all.last().unwrap(),
            &(Sender::Assistant, NETWORK_ERROR_REPLY.to_string())
        );
        assert!(!view(&c).typing.get());
    }

    #[test]
    fn test_typing_indicator_spans_the_request() {
        let c = Rc::new(controller());
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).chat_reply.borrow_mut() = Some(Ok("done".to_string()));
        let (gate_tx, gate_rx) = oneshot::channel();
        *backend(&c).chat_gate.borrow_mut() = Some(gate_rx);

        let mut pool = LocalPool::new();
        pool.run_until(c.init_session());

        let sender = c.clone();
        pool.spawner()
            .spawn_local(async move { sender.send_message("slow one").await })
            .unwrap();
        pool.run_until_stalled();

        assert!(view(&c).typing.get(), "placeholder shown while in flight");
        assert_eq!(
            entries(&c).last().unwrap(),
            &(Sender::User, "slow one".to_string())
        );

        gate_tx.send(()).unwrap();
        pool.run();

        assert!(!view(&c).typing.get(), "placeholder gone after the reply");
        assert_eq!(
            entries(&c).last().unwrap(),
            &(Sender::Assistant, "done".to_string())
        );
    }

    #[test]
    fn test_double_reset_leaves_one_session_and_one_greeting() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "old");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).session_id.borrow_mut() = Some("fresh".to_string());
        block_on(c.init_session());

        block_on(c.reset_session());
        block_on(c.reset_session());

        assert_eq!(c.session_id(), Some("fresh".to_string()));
        assert_eq!(c.storage.get(DEFAULT_KEY), Some("fresh".to_string()));
        assert_eq!(entries(&c), vec![(Sender::System, GREETING.to_string())]);
    }

    #[test]
    fn test_stale_reply_is_discarded_after_reset() {
        let c = Rc::new(controller());
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).session_id.borrow_mut() = Some("fresh".to_string());
        *backend(&c).chat_reply.borrow_mut() = Some(Ok("late reply".to_string()));
        let (gate_tx, gate_rx) = oneshot::channel();
        *backend(&c).chat_gate.borrow_mut() = Some(gate_rx);

        let mut pool = LocalPool::new();
        pool.run_until(c.init_session());

        let sender = c.clone();
        pool.spawner()
            .spawn_local(async move { sender.send_message("question").await })
            .unwrap();
        pool.run_until_stalled();
        assert!(view(&c).typing.get());

        // Reset while the request is still outstanding.
        pool.run_until(c.reset_session());
        assert_eq!(entries(&c), vec![(Sender::System, GREETING.to_string())]);

        // Let the stale request complete; it must not repopulate the view.
        gate_tx.send(()).unwrap();
        pool.run();

        assert_eq!(entries(&c), vec![(Sender::System, GREETING.to_string())]);
        assert!(!view(&c).typing.get());
    }

    #[test]
    fn test_image_urls_are_forwarded_to_the_backend() {
        let c = controller();
        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        *backend(&c).chat_reply.borrow_mut() = Some(Ok("nice photo".to_string()));
        block_on(c.init_session());

        let urls = vec!["https://example.com/cat.png".to_string()];
        block_on(c.send_message_with_images("what is this?", &urls));

        assert_eq!(backend(&c).last_images.borrow().clone(), Some(urls));
    }

    #[test]
    fn test_visit_ping_uses_session_id_and_swallows_absence() {
        let c = controller();

        // Without a session the ping is skipped entirely.
        block_on(c.record_visit("/docs"));
        assert!(backend(&c).visits.borrow().is_empty());

        c.storage.set(DEFAULT_KEY, "xyz");
        *backend(&c).history.borrow_mut() = Some(Vec::new());
        block_on(c.init_session());

        block_on(c.record_visit("/docs"));
        assert_eq!(
            backend(&c).visits.borrow().clone(),
            vec![("xyz".to_string(), "/docs".to_string())]
        );
    }
}
