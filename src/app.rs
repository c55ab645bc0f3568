use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::conversation::{Conversation, Turn};
use crate::markdown::MarkdownOptions;
use crate::transport::{ChatClient, ChatResponse, TransportError};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Send,
}

pub type ReplyTask = JoinHandle<Result<ChatResponse, TransportError>>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub phase: Phase,
    pub focus: Focus,
    pub conversation: Conversation,
    pub markdown: MarkdownOptions,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Request state
    pub client: ChatClient,
    pub reply_task: Option<ReplyTask>,
    reply_notify: Option<UnboundedSender<AppEvent>>,

    // Chat scroll state
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub max_chat_scroll: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing dots

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub send_area: Option<Rect>,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = match config.request_timeout() {
            Some(timeout) => ChatClient::with_timeout(&config.endpoint, timeout)?,
            None => ChatClient::new(&config.endpoint),
        };
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: ChatClient, config: &Config) -> Self {
        Self {
            should_quit: false,
            phase: Phase::Idle,
            focus: Focus::Input,
            conversation: Conversation::new(&config.greeting),
            markdown: config.markdown,
            input: String::new(),
            cursor: 0,
            client,
            reply_task: None,
            reply_notify: None,
            chat_scroll: 0,
            follow_tail: true,
            max_chat_scroll: 0,
            animation_frame: 0,
            chat_area: None,
            input_area: None,
            send_area: None,
        }
    }

    /// Wake the event loop through `tx` when a reply arrives
    pub fn set_reply_notifier(&mut self, tx: UnboundedSender<AppEvent>) {
        self.reply_notify = Some(tx);
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::AwaitingReply
    }

    /// Accept the current input as a user turn.
    ///
    /// Returns the message to send, or `None` when the input is blank or a
    /// reply is still pending. Nothing changes in the `None` case.
    pub fn submit(&mut self) -> Option<String> {
        if self.is_loading() {
            debug!("submission ignored while awaiting reply");
            return None;
        }
        if self.input.trim().is_empty() {
            return None;
        }

        let message = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.conversation.append(Turn::user(message.clone()));
        self.phase = Phase::AwaitingReply;
        self.animation_frame = 0;
        self.scroll_to_bottom();
        Some(message)
    }

    /// Start the request for `message` in the background
    pub fn dispatch(&mut self, message: String) {
        info!(
            endpoint = self.client.endpoint(),
            chars = message.chars().count(),
            "dispatching message"
        );

        let client = self.client.clone();
        let notify = self.reply_notify.clone();
        self.reply_task = Some(tokio::spawn(async move {
            let outcome = client.send(&message).await;
            if let Some(tx) = notify {
                let _ = tx.send(AppEvent::ReplyReady);
            }
            outcome
        }));
    }

    /// Submit the current input and, if accepted, send it
    pub fn send_message(&mut self) {
        if let Some(message) = self.submit() {
            self.dispatch(message);
        }
    }

    /// Join the request task if it has finished
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if finished {
            self.join_reply().await;
        }
    }

    /// Wait for the request task and apply its outcome
    pub async fn join_reply(&mut self) {
        if let Some(task) = self.reply_task.take() {
            match task.await {
                Ok(outcome) => self.settle(outcome),
                Err(err) => {
                    warn!(%err, "request task did not complete");
                    self.finish_turn(format!("Error: request was interrupted ({})", err));
                }
            }
        }
    }

    /// Record the outcome of the in-flight request and return to idle
    pub fn settle(&mut self, outcome: Result<ChatResponse, TransportError>) {
        match outcome.and_then(ChatResponse::into_text) {
            Ok(text) => {
                info!(chars = text.chars().count(), "reply received");
                self.finish_turn(text);
            }
            Err(err) => {
                warn!(kind = ?err.kind(), %err, "chat request failed");
                self.finish_turn(format!("Error: {}", err));
            }
        }
    }

    fn finish_turn(&mut self, content: String) {
        if !self.is_loading() {
            debug!("reply arrived while idle, dropping it");
            return;
        }
        self.conversation.append(Turn::assistant(content));
        self.phase = Phase::Idle;
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Pin the chat view to the newest turn; resolved at the next render
    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll);
        if self.chat_scroll == self.max_chat_scroll {
            self.follow_tail = true;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Send,
            Focus::Send => Focus::Input,
        };
    }

    // Input editing; all of these are no-ops while the input is disabled

    pub fn insert_char(&mut self, c: char) {
        if self.is_loading() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.is_loading() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.is_loading() {
            return;
        }
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
