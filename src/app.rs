use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{ApiClient, ChatOutcome, HealthOutcome};
use crate::history::ConversationHistory;

/// How long the animated thinking ellipsis keeps cycling after a submit.
/// Purely cosmetic; the request itself has no timeout.
const THINKING_DOTS_TIMEOUT: Duration = Duration::from_secs(30);

pub const NETWORK_ERROR_MESSAGE: &str =
    "Sorry, there was an error communicating with the server.";
pub const SERVER_UNHEALTHY_MESSAGE: &str = "Warning: Server is not responding correctly.";
pub const SERVER_UNREACHABLE_MESSAGE: &str = "Warning: Could not reach the server.";
pub const MODEL_LOADING_MESSAGE: &str =
    "Warning: Model is still loading. Responses may be delayed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// One transcript entry. Created on submit or on response arrival, rendered,
/// never mutated.
#[derive(Debug, Clone)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Online,
    Offline,
    Thinking,
}

impl ConnectivityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectivityStatus::Online => "Connected",
            ConnectivityStatus::Offline => "Disconnected",
            ConnectivityStatus::Thinking => "Thinking",
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub status: ConnectivityStatus,
    pub messages: Vec<Message>,
    pub history: ConversationHistory,
    /// Model name reported by the health endpoint, shown in the header.
    pub model_type: Option<String>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // char index into `input`

    // Transcript viewport (inner dimensions, updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Thinking animation
    pub animation_frame: u8, // 0-2 for ellipsis animation
    thinking_dots_until: Option<Instant>,

    api: ApiClient,
    chat_task: Option<JoinHandle<Result<ChatOutcome>>>,
    health_task: Option<JoinHandle<Result<HealthOutcome>>>,
}

impl App {
    pub fn new(server_url: &str) -> Self {
        Self {
            should_quit: false,
            status: ConnectivityStatus::Offline,
            messages: Vec::new(),
            history: ConversationHistory::new(),
            model_type: None,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,
            thinking_dots_until: None,

            api: ApiClient::new(server_url),
            chat_task: None,
            health_task: None,
        }
    }

    /// Probe the health endpoint in the background; the result lands via
    /// [`App::poll_tasks`].
    pub fn start_health_check(&mut self) {
        let api = self.api.clone();
        self.health_task = Some(tokio::spawn(async move { api.health().await }));
    }

    /// Input editing is disabled while a chat request is in flight.
    pub fn input_enabled(&self) -> bool {
        self.chat_task.is_none()
    }

    pub fn is_waiting(&self) -> bool {
        self.chat_task.is_some()
    }

    /// Submit the current input. Whitespace-only input is a no-op, as is
    /// submitting while a request is already in flight.
    pub fn submit(&mut self) {
        if self.chat_task.is_some() {
            return;
        }
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return;
        }

        self.push_message(Sender::User, message.clone());
        self.input.clear();
        self.input_cursor = 0;

        self.status = ConnectivityStatus::Thinking;
        self.animation_frame = 0;
        self.thinking_dots_until = Some(Instant::now() + THINKING_DOTS_TIMEOUT);
        self.scroll_chat_to_bottom();

        info!(chars = message.chars().count(), "sending chat message");

        // History sent with the request excludes the pair just started above.
        let history = self.history.completed_pairs();
        let api = self.api.clone();
        self.chat_task = Some(tokio::spawn(async move { api.chat(&message, &history).await }));
    }

    /// Collect results from finished background tasks. Called on every tick.
    pub async fn poll_tasks(&mut self) {
        if self.health_task.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = self.health_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("health task failed: {e}")),
                };
                self.apply_health_result(result);
            }
        }

        if self.chat_task.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = self.chat_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("chat task failed: {e}")),
                };
                self.apply_chat_result(result);
            }
        }
    }

    pub fn apply_health_result(&mut self, result: Result<HealthOutcome>) {
        match result {
            Ok(HealthOutcome::Healthy(health)) => {
                info!(model_loaded = health.model_loaded, "server healthy");
                self.status = ConnectivityStatus::Online;
                self.model_type = health.model_type;
                if !health.model_loaded {
                    self.push_message(Sender::System, MODEL_LOADING_MESSAGE.to_string());
                }
            }
            Ok(HealthOutcome::Unhealthy) => {
                error!("health check reported an unhealthy server");
                self.status = ConnectivityStatus::Offline;
                self.push_message(Sender::System, SERVER_UNHEALTHY_MESSAGE.to_string());
            }
            Err(e) => {
                error!(error = %e, "health check failed");
                self.status = ConnectivityStatus::Offline;
                self.push_message(Sender::System, SERVER_UNREACHABLE_MESSAGE.to_string());
            }
        }
    }

    pub fn apply_chat_result(&mut self, result: Result<ChatOutcome>) {
        match result {
            Ok(ChatOutcome::Reply(text)) => {
                self.push_message(Sender::Assistant, text);
            }
            Ok(ChatOutcome::ServerError(text)) => {
                error!(error = %text, "chat request rejected by server");
                self.push_message(Sender::System, format!("Error: {text}"));
            }
            Err(e) => {
                error!(error = %e, "chat request failed");
                self.push_message(Sender::System, NETWORK_ERROR_MESSAGE.to_string());
                self.status = ConnectivityStatus::Offline;
            }
        }
        // The completion path always returns to Online, immediately
        // overwriting the Offline set on a transport failure above.
        self.status = ConnectivityStatus::Online;
        self.thinking_dots_until = None;
    }

    /// Append a message to the transcript, keep the history pairs in step,
    /// and snap the viewport to the latest message.
    pub fn push_message(&mut self, sender: Sender, content: String) {
        match sender {
            Sender::User => self.history.start_pair(&content),
            Sender::Assistant => self.history.complete_pair(&content),
            Sender::System => {}
        }
        self.messages.push(Message { content, sender });
        self.scroll_chat_to_bottom();
    }

    /// Advance the ellipsis animation while a reply is pending and the
    /// cosmetic window has not yet elapsed.
    pub fn tick_animation(&mut self) {
        if self.chat_task.is_some() && self.thinking_dots_active() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn thinking_dots_active(&self) -> bool {
        self.thinking_dots_until
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_half_page_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height.max(2) / 2);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(self.chat_height.max(2) / 2);
    }

    /// Scroll so the most recent message (or the thinking indicator) is in
    /// view. Mirrors how the transcript is laid out in the render pass.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default until first render
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // sender line
            for line in msg.content.lines().filter(|line| !line.trim().is_empty()) {
                let char_count = line.chars().count();
                total_lines += ((char_count / wrap_width) + 1) as u16;
            }
            total_lines += 1; // blank line after message
        }

        if self.chat_task.is_some() {
            total_lines += 2; // sender line + thinking indicator
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        // Unroutable target; tests never await the spawned request.
        App::new("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn submitting_adds_one_user_message_and_one_request() {
        let mut app = app();
        app.input = "Hello".to_string();
        app.input_cursor = 5;
        app.submit();

        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].sender, Sender::User);
        assert_eq!(app.messages[0].content, "Hello");
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.status, ConnectivityStatus::Thinking);
        assert!(app.is_waiting());
        assert!(!app.input_enabled());
        assert_eq!(app.history.pairs(), &[("Hello".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn whitespace_only_input_is_a_no_op() {
        let mut app = app();
        app.input = "   \n  ".to_string();
        app.submit();

        assert!(app.messages.is_empty());
        assert!(app.history.is_empty());
        assert!(!app.is_waiting());
        assert_eq!(app.status, ConnectivityStatus::Offline);
    }

    #[tokio::test]
    async fn input_is_trimmed_before_sending() {
        let mut app = app();
        app.input = "  Hello  ".to_string();
        app.submit();

        assert_eq!(app.messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn submit_while_waiting_is_ignored() {
        let mut app = app();
        app.input = "first".to_string();
        app.submit();

        app.input = "second".to_string();
        app.submit();

        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.input, "second");
    }

    #[test]
    fn reply_completes_the_pending_pair() {
        let mut app = app();
        app.push_message(Sender::User, "Hello".to_string());

        app.apply_chat_result(Ok(ChatOutcome::Reply("Hi!".to_string())));

        assert_eq!(
            app.history.pairs(),
            &[("Hello".to_string(), "Hi!".to_string())]
        );
        let last = app.messages.last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert_eq!(last.content, "Hi!");
        assert_eq!(app.status, ConnectivityStatus::Online);
    }

    #[test]
    fn server_error_surfaces_the_error_text() {
        let mut app = app();
        app.push_message(Sender::User, "Hello".to_string());

        app.apply_chat_result(Ok(ChatOutcome::ServerError("model crashed".to_string())));

        let last = app.messages.last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.content, "Error: model crashed");
        // The pending pair stays pending; only an assistant reply fills it.
        assert_eq!(app.history.pairs(), &[("Hello".to_string(), String::new())]);
        assert_eq!(app.status, ConnectivityStatus::Online);
    }

    #[test]
    fn transport_error_uses_the_fixed_message_and_ends_online() {
        let mut app = app();
        app.push_message(Sender::User, "Hello".to_string());

        app.apply_chat_result(Err(anyhow!("connection refused")));

        let last = app.messages.last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.content, NETWORK_ERROR_MESSAGE);
        // Offline is set mid-flow but the completion path restores Online.
        assert_eq!(app.status, ConnectivityStatus::Online);
    }

    #[test]
    fn healthy_server_goes_online() {
        let mut app = app();
        let health: crate::api::HealthStatus = serde_json::from_str(
            r#"{"status": "healthy", "model_loaded": true, "model_type": "TinyLlama-1.1B-Chat"}"#,
        )
        .unwrap();

        app.apply_health_result(Ok(HealthOutcome::Healthy(health)));

        assert_eq!(app.status, ConnectivityStatus::Online);
        assert_eq!(app.model_type.as_deref(), Some("TinyLlama-1.1B-Chat"));
        assert!(app.messages.is_empty());
    }

    #[test]
    fn model_still_loading_adds_a_warning() {
        let mut app = app();
        let health: crate::api::HealthStatus =
            serde_json::from_str(r#"{"status": "healthy", "model_loaded": false}"#).unwrap();

        app.apply_health_result(Ok(HealthOutcome::Healthy(health)));

        assert_eq!(app.status, ConnectivityStatus::Online);
        assert_eq!(app.messages.last().unwrap().content, MODEL_LOADING_MESSAGE);
    }

    #[test]
    fn unhealthy_server_goes_offline_with_a_warning() {
        let mut app = app();
        app.apply_health_result(Ok(HealthOutcome::Unhealthy));

        assert_eq!(app.status, ConnectivityStatus::Offline);
        assert_eq!(app.messages.last().unwrap().content, SERVER_UNHEALTHY_MESSAGE);
    }

    #[test]
    fn unreachable_server_goes_offline_with_a_warning() {
        let mut app = app();
        app.apply_health_result(Err(anyhow!("connection refused")));

        assert_eq!(app.status, ConnectivityStatus::Offline);
        assert_eq!(
            app.messages.last().unwrap().content,
            SERVER_UNREACHABLE_MESSAGE
        );
    }

    #[test]
    fn system_messages_stay_out_of_history() {
        let mut app = app();
        app.push_message(Sender::System, "Warning: something".to_string());
        assert!(app.history.is_empty());
        assert_eq!(app.messages.len(), 1);
    }
}
