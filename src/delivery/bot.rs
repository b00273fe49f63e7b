//! Telegram long-polling front end

use super::service::{Command, DeliveryService};
use super::transport::REFRESH_CALLBACK;
use frankenstein::{
    AllowedUpdate, AsyncApi, AsyncTelegramApi, BotCommand, GetUpdatesParams, SetMyCommandsParams,
    Update, UpdateContent,
};
use std::sync::Arc;
use std::time::Duration;

const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Parse a text message into a command
///
/// Accepts `/start` and `/stop`, with or without a `@botname` suffix.
pub fn command_from_text(chat_id: i64, text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?.split('@').next()?;

    match name {
        "start" => Some(Command::Start { chat_id }),
        "stop" => Some(Command::Stop { chat_id }),
        _ => None,
    }
}

/// Parse a button press into a command
pub fn command_from_callback(chat_id: i64, callback_id: &str, data: Option<&str>) -> Option<Command> {
    (data == Some(REFRESH_CALLBACK)).then(|| Command::Refresh {
        chat_id,
        callback_id: callback_id.to_string(),
    })
}

fn command_from_update(update: &Update) -> Option<Command> {
    match &update.content {
        UpdateContent::Message(message) => command_from_text(message.chat.id, message.text.as_deref()?),
        // Private chats only: the user id doubles as the chat id
        UpdateContent::CallbackQuery(query) => command_from_callback(
            i64::try_from(query.from.id).ok()?,
            &query.id,
            query.data.as_deref(),
        ),
        _ => None,
    }
}

/// Polls for updates and hands commands to the delivery service
pub struct BotPoller {
    api: AsyncApi,
    service: Arc<DeliveryService>,
    poll_timeout_secs: u32,
}

impl BotPoller {
    pub fn new(api: AsyncApi, service: Arc<DeliveryService>, poll_timeout_secs: u32) -> Self {
        Self {
            api,
            service,
            poll_timeout_secs,
        }
    }

    /// Publish the command menu
    pub async fn register_commands(&self) -> anyhow::Result<()> {
        let commands = vec![
            BotCommand::builder()
                .command("start")
                .description("Subscribe to rate updates")
                .build(),
            BotCommand::builder()
                .command("stop")
                .description("Stop rate updates")
                .build(),
        ];

        self.api
            .set_my_commands(&SetMyCommandsParams::builder().commands(commands).build())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to register bot commands: {}", e))?;
        Ok(())
    }

    /// Long-poll forever; each command runs on its own task
    pub async fn run(self) {
        let mut offset: i64 = 0;
        tracing::info!(timeout_secs = self.poll_timeout_secs, "Polling for chat updates");

        loop {
            let params = GetUpdatesParams::builder()
                .offset(offset)
                .timeout(self.poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                .build();

            let updates = match self.api.get_updates(&params).await {
                Ok(response) => response.result,
                Err(e) => {
                    tracing::warn!(error = %e, "Polling failed");
                    tokio::time::sleep(POLL_ERROR_PAUSE).await;
                    continue;
                }
            };

            for update in updates {
                offset = i64::from(update.update_id) + 1;

                let Some(command) = command_from_update(&update) else {
                    continue;
                };
                tracing::debug!(?command, "Received command");

                let service = Arc::clone(&self.service);
                tokio::spawn(async move {
                    if let Err(e) = service.handle_command(command).await {
                        tracing::error!(error = %e, "Command failed");
                    }
                });
            }
        }
    }
}
