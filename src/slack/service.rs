use crate::directory::{ChannelFields, ChannelKind, EmojiRecord, UserRecord};
use crate::error::Result;
use crate::slack::types::{BotInfo, Capabilities, ClientBootstrap, RemotePage};
use async_trait::async_trait;

/// Authoritative source of directory data (the Slack Web and edge APIs in production)
#[async_trait]
pub trait DirectoryService: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// One page of `users.list`; `cursor` is the previous page's continuation token
    async fn list_users_page(&self, cursor: Option<&str>) -> Result<RemotePage<UserRecord>>;

    /// One page of `conversations.list` restricted to `kinds`
    async fn list_channels_page(
        &self,
        kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<RemotePage<ChannelFields>>;

    /// Workspace custom emoji
    async fn list_emoji(&self) -> Result<Vec<EmojiRecord>>;

    /// Profiles for specific users, e.g. Slack Connect members missing from `users.list`
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<UserRecord>>;

    /// IM membership from the client bootstrap call
    async fn client_bootstrap(&self) -> Result<ClientBootstrap>;

    async fn bot_info(&self, bot_id: &str) -> Result<BotInfo>;
}
