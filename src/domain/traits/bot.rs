use crate::application::errors::BotError;
use async_trait::async_trait;

/// Bot trait - abstraction for messaging platform adapters.
///
/// The plugin only ever yields plain-text replies, so the seam is small:
/// the host framework (or the console dev adapter) owns everything else.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Start the bot and begin listening for messages
    async fn start(&self) -> Result<(), BotError>;

    /// Send a message to a chat
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
