//! Chat transport

use async_trait::async_trait;
use frankenstein::{
    AnswerCallbackQueryParams, AsyncApi, AsyncTelegramApi, ChatId, EditMessageTextParams,
    InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, ReplyMarkup, SendMessageParams,
};
use thiserror::Error;

/// Callback payload of the refresh button
pub const REFRESH_CALLBACK: &str = "refresh_rates";

/// Delivery failures the loop reacts to
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The message to edit no longer exists or cannot be edited
    #[error("message can no longer be edited")]
    MessageGone,
    /// The chat blocked the bot or no longer exists
    #[error("chat is unreachable: {0}")]
    Blocked(String),
    #[error("transport error: {0}")]
    Api(String),
}

/// Outbound side of the chat interface
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message, optionally with the refresh button; returns its id
    async fn send(&self, chat_id: i64, text: &str, refresh_button: bool) -> Result<i32, TransportError>;
    /// Replace the text of a sent message, keeping the refresh button
    async fn edit(&self, chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError>;
    /// Acknowledge a button press
    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TransportError>;
}

/// Telegram Bot API transport, HTML parse mode
#[derive(Clone)]
pub struct TelegramTransport {
    api: AsyncApi,
}

impl TelegramTransport {
    pub fn new(api: AsyncApi) -> Self {
        Self { api }
    }

    fn refresh_keyboard() -> InlineKeyboardMarkup {
        let button = InlineKeyboardButton::builder()
            .text("Refresh")
            .callback_data(REFRESH_CALLBACK)
            .build();
        InlineKeyboardMarkup::builder()
            .inline_keyboard(vec![vec![button]])
            .build()
    }
}

/// Map a Bot API failure onto the loop's reactions
fn classify(err: frankenstein::Error) -> TransportError {
    match err {
        frankenstein::Error::Api(response) => classify_api(response.error_code, &response.description),
        other => TransportError::Api(other.to_string()),
    }
}

fn classify_api(code: u64, description: &str) -> TransportError {
    let lower = description.to_lowercase();
    if code == 403 || lower.contains("chat not found") {
        TransportError::Blocked(description.to_string())
    } else if lower.contains("message to edit not found") || lower.contains("message can't be edited") {
        TransportError::MessageGone
    } else {
        TransportError::Api(format!("{}: {}", code, description))
    }
}

fn is_not_modified(err: &frankenstein::Error) -> bool {
    matches!(err, frankenstein::Error::Api(r) if r.description.contains("message is not modified"))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str, refresh_button: bool) -> Result<i32, TransportError> {
        let params = if refresh_button {
            SendMessageParams::builder()
                .chat_id(ChatId::Integer(chat_id))
                .text(text)
                .parse_mode(ParseMode::Html)
                .reply_markup(ReplyMarkup::InlineKeyboardMarkup(Self::refresh_keyboard()))
                .build()
        } else {
            SendMessageParams::builder()
                .chat_id(ChatId::Integer(chat_id))
                .text(text)
                .parse_mode(ParseMode::Html)
                .build()
        };

        let response = self.api.send_message(&params).await.map_err(classify)?;
        Ok(response.result.message_id)
    }

    async fn edit(&self, chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError> {
        let params = EditMessageTextParams::builder()
            .chat_id(ChatId::Integer(chat_id))
            .message_id(message_id)
            .text(text)
            .parse_mode(ParseMode::Html)
            .reply_markup(Self::refresh_keyboard())
            .build();

        match self.api.edit_message_text(&params).await {
            Ok(_) => Ok(()),
            // Same text as shown; nothing to do
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => Err(classify(e)),
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TransportError> {
        let params = AnswerCallbackQueryParams::builder()
            .callback_query_id(callback_id)
            .text(text)
            .build();

        self.api
            .answer_callback_query(&params)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}
