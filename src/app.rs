use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::{mpsc, watch};

use crate::message::Notification;
use crate::pipeline::{SendOutcome, SendPipeline, SendTask};
use crate::store::ConversationStore;
use crate::ui;
use crate::webhook::{Responder, SendError};

/// Ticks a notification stays up before it dismisses itself (~6s at 300ms)
const TOAST_TICKS: u16 = 20;

/// A notification currently on screen
#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub ticks_left: u16,
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub store: ConversationStore,
    pipeline: SendPipeline,
    pending: Option<SendTask>,
    store_changes: watch::Receiver<u64>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    pub endpoint: String,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in chars, not bytes

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the transcript, set during render
    pub chat_width: u16,  // inner width the transcript wraps to
    pub chat_area: Option<Rect>,
    pub follow_latest: bool, // pin the view to the newest row on every draw

    pub animation_frame: u8, // 0-2 for the typing dots
    pub toast: Option<Toast>,
}

impl App {
    pub fn new(responder: Arc<dyn Responder>, endpoint: &str) -> Self {
        let (tx, notifications) = mpsc::unbounded_channel();
        let store = ConversationStore::new();
        let store_changes = store.subscribe();

        Self {
            should_quit: false,
            store,
            pipeline: SendPipeline::new(responder, tx),
            pending: None,
            store_changes,
            notifications,
            endpoint: endpoint.to_string(),
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            follow_latest: true,
            animation_frame: 0,
            toast: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Whether pressing Enter right now would start a send.
    pub fn can_submit(&self) -> bool {
        !self.store.is_loading() && self.pending.is_none() && !self.input.trim().is_empty()
    }

    /// Send the input box contents. Returns false (and leaves the input alone)
    /// when the input is blank or a send is already in flight.
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.pending = Some(self.pipeline.start(&mut self.store, &text));
        true
    }

    pub fn pending_mut(&mut self) -> Option<&mut SendTask> {
        self.pending.as_mut()
    }

    /// Reconcile a finished request into the conversation.
    pub fn settle(&mut self, result: Result<String, SendError>) -> SendOutcome {
        self.pending = None;
        let outcome = self.pipeline.finish(&mut self.store, result);
        self.sync();
        outcome
    }

    /// Pull in store changes and pending notifications. Called once per loop
    /// iteration before drawing.
    pub fn sync(&mut self) {
        if self.store_changes.has_changed().unwrap_or(false) {
            self.store_changes.borrow_and_update();
            self.scroll_chat_to_bottom();
        }

        while let Ok(notification) = self.notifications.try_recv() {
            self.toast = Some(Toast {
                notification,
                ticks_left: TOAST_TICKS,
            });
        }
    }

    pub fn tick(&mut self) {
        if self.store.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        if let Some(toast) = &mut self.toast {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
            if toast.ticks_left == 0 {
                self.toast = None;
            }
        }
    }

    pub fn dismiss_toast(&mut self) -> bool {
        self.toast.take().is_some()
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_latest = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.transcript_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_latest = self.chat_scroll == max;
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let total = self.transcript_lines();
        let visible = self.visible_height();
        self.chat_scroll = total.saturating_sub(visible);
        self.follow_latest = true;
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rows the transcript occupies once wrapped, measured on the same
    /// paragraph the renderer draws.
    fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let rows = ui::transcript(&self.store, self.animation_frame).line_count(wrap_width);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CONNECTION_ERROR_REPLY, GREETING};
    use crate::testing::MockResponder;

    fn app_with(mock: Arc<MockResponder>) -> App {
        App::new(mock, "http://localhost/hook")
    }

    #[test]
    fn test_new_app_shows_greeting_only() {
        let app = app_with(Arc::new(MockResponder::new()));
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.messages()[0].text, GREETING);
        assert!(!app.is_loading());
        assert!(app.toast.is_none());
    }

    #[test]
    fn test_blank_input_is_not_submitted() {
        let mut app = app_with(Arc::new(MockResponder::new()));
        app.input = "   \t ".to_string();
        assert!(!app.submit());
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.input, "   \t ");
    }

    #[tokio::test]
    async fn test_submit_while_loading_is_a_no_op() {
        let mock = Arc::new(MockResponder::gated());
        mock.queue_reply("Windy");
        let mut app = app_with(mock.clone());

        app.input = "Weather in Chicago?".to_string();
        assert!(app.submit());
        assert!(app.is_loading());
        assert_eq!(app.store.len(), 2);
        assert!(app.input.is_empty());

        app.input = "And tomorrow?".to_string();
        assert!(!app.can_submit());
        assert!(!app.submit());
        assert_eq!(app.store.len(), 2);
        assert_eq!(app.input, "And tomorrow?");

        mock.release();
        let result = app.pending_mut().unwrap().wait().await;
        app.settle(result);

        // Only the first submission reached the webhook
        assert_eq!(mock.recorded_requests().len(), 1);
        assert_eq!(app.store.len(), 3);
        assert!(!app.is_loading());
        assert!(app.submit());
    }

    #[tokio::test]
    async fn test_failed_send_raises_toast() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_error(SendError::Http { status: 502 });
        let mut app = app_with(mock);

        app.input = "hello".to_string();
        app.submit();
        let result = app.pending_mut().unwrap().wait().await;
        app.settle(result);

        assert_eq!(app.store.last().unwrap().text, CONNECTION_ERROR_REPLY);
        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.notification, Notification::connection_error());
        assert!(app.dismiss_toast());
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn test_toast_expires_after_ticks() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_error(SendError::Transport("refused".to_string()));
        let mut app = app_with(mock);

        app.input = "hello".to_string();
        app.submit();
        let result = app.pending_mut().unwrap().wait().await;
        app.settle(result);

        for _ in 0..TOAST_TICKS - 1 {
            app.tick();
        }
        assert!(app.toast.is_some());
        app.tick();
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn test_new_messages_scroll_to_bottom() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_reply(&"It will be sunny all week. ".repeat(40));
        let mut app = app_with(mock);
        app.chat_height = 5;
        app.chat_width = 20;

        app.input = "Forecast?".to_string();
        app.submit();
        let result = app.pending_mut().unwrap().wait().await;
        app.settle(result);

        assert!(app.chat_scroll > 0);
        let bottom = app.chat_scroll;
        app.scroll_up(3);
        assert_eq!(app.chat_scroll, bottom - 3);
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, bottom);
    }

    #[tokio::test]
    async fn test_row_count_follows_word_wrap() {
        let mock = Arc::new(MockResponder::new());
        // 12 words of 11 chars: 143 chars, but only one word fits per 20-col row
        mock.queue_reply(&format!("{}ENDMARK", "aaaaaaaaaaa ".repeat(12)));
        let mut app = app_with(mock);
        app.chat_height = 5;
        app.chat_width = 20;

        app.input = "Forecast?".to_string();
        app.submit();
        let result = app.pending_mut().unwrap().wait().await;
        app.settle(result);

        let naive_rows: u16 = app
            .store
            .messages()
            .iter()
            .map(|m| 2 + m.text.chars().count().div_ceil(20) as u16)
            .sum();
        assert!(app.transcript_lines() > naive_rows);
        assert_eq!(app.chat_scroll, app.transcript_lines() - 5);
        assert!(app.follow_latest);
    }
}
