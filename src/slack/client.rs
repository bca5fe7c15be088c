use crate::config::SlackConfig;
use crate::directory::{ChannelFields, ChannelKind, EmojiRecord, UserRecord};
use crate::error::{DirectoryError, Result};
use crate::slack::service::DirectoryService;
use crate::slack::types::{BotInfo, Capabilities, ClientBootstrap, RemotePage};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const SLACK_API_BASE: &str = "https://slack.com/api";
const USERS_PAGE_LIMIT: u16 = 1000;
const CHANNELS_PAGE_LIMIT: u16 = 999;

/// Slack-backed directory service
///
/// `bots.info` goes through slack-morphism. The listing methods are called
/// directly because their payloads carry fields the SDK models drop (the bot
/// `api_app_id`, the IM counterpart `user`, raw emoji aliases) or are edge methods
/// it does not model at all. User payloads are still decoded as `SlackUser`.
pub struct SlackDirectory {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    http: reqwest::Client,
    bearer: String,
    capabilities: Capabilities,
}

impl SlackDirectory {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let connector = SlackClientHyperConnector::new()
            .map_err(|e| DirectoryError::SlackApi(e.to_string()))?;

        let client = Arc::new(slack_morphism::SlackClient::new(connector));
        let token = SlackApiToken::new(config.token.clone().into());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DirectoryError::SlackApi(e.to_string()))?;

        let capabilities = Capabilities {
            edge_bootstrap: config.supports_edge_api(),
        };
        tracing::debug!(
            edge_bootstrap = capabilities.edge_bootstrap,
            "Slack directory client created"
        );

        Ok(Self {
            client,
            token,
            http,
            bearer: config.token.clone(),
            capabilities,
        })
    }

    /// POST a Web API method and decode its body once `ok` is confirmed
    async fn call_web_api<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", SLACK_API_BASE, method);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer)
            .form(params)
            .send()
            .await
            .map_err(|e| DirectoryError::SlackApi(format!("{}: {}", method, e)))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            return Err(DirectoryError::RateLimited(format!(
                "{}: retry after {}s",
                method, retry_after
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DirectoryError::SlackApi(format!("{}: {}", method, e)))?;

        if !body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            let error = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown_error");
            return Err(api_error(method, error));
        }

        Ok(serde_json::from_value(body)?)
    }
}

/// Map a Slack `error` code, keeping rate limiting distinguishable
fn api_error(method: &str, error: &str) -> DirectoryError {
    match error {
        "ratelimited" | "rate_limited" => DirectoryError::RateLimited(method.to_string()),
        _ => DirectoryError::SlackApi(format!("{}: {}", method, error)),
    }
}

fn client_error(method: &str, err: SlackClientError) -> DirectoryError {
    match err {
        SlackClientError::RateLimitError(e) => {
            DirectoryError::RateLimited(format!("{}: {}", method, e))
        }
        other => DirectoryError::SlackApi(format!("{}: {}", method, other)),
    }
}

fn user_record(user: SlackUser) -> UserRecord {
    let profile = user.profile.as_ref();
    UserRecord {
        id: user.id.to_string(),
        name: user.name.clone().unwrap_or_else(|| user.id.to_string()),
        real_name: user
            .real_name
            .clone()
            .or_else(|| profile.and_then(|p| p.real_name.clone())),
        display_name: profile.and_then(|p| p.display_name.clone()),
        email: profile.and_then(|p| p.email.as_ref().map(|e| e.to_string())),
        is_bot: user.flags.is_bot.unwrap_or(false),
        is_admin: user.flags.is_admin.unwrap_or(false),
        is_deleted: user.deleted.unwrap_or(false),
        is_restricted: user.flags.is_restricted.unwrap_or(false),
        app_id: None,
        team_id: user.team_id.as_ref().map(|t| t.to_string()),
    }
}

/// Decode one raw user object; the app ID lives in the profile, which `SlackUser` drops
fn user_from_json(value: serde_json::Value) -> Result<UserRecord> {
    let app_id = value
        .pointer("/profile/api_app_id")
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let user: SlackUser = serde_json::from_value(value)?;

    let mut record = user_record(user);
    record.app_id = app_id;
    Ok(record)
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Default, Deserialize)]
struct TextValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    topic: Option<TextValue>,
    #[serde(default)]
    purpose: Option<TextValue>,
    #[serde(default)]
    num_members: u64,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_im: bool,
    #[serde(default)]
    is_mpim: bool,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    is_shared: bool,
    #[serde(default)]
    is_ext_shared: bool,
    #[serde(default)]
    user: Option<String>,
}

impl From<RawChannel> for ChannelFields {
    fn from(raw: RawChannel) -> Self {
        ChannelFields {
            id: raw.id,
            name: raw.name,
            topic: raw.topic.map(|t| t.value).unwrap_or_default(),
            purpose: raw.purpose.map(|p| p.value).unwrap_or_default(),
            member_count: raw.num_members,
            is_private: raw.is_private,
            is_im: raw.is_im,
            is_mpim: raw.is_mpim,
            is_archived: raw.is_archived,
            is_shared: raw.is_shared,
            is_ext_shared: raw.is_ext_shared,
            user: raw.user,
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    #[serde(default)]
    members: Vec<serde_json::Value>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    #[serde(default)]
    users: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    #[serde(default)]
    channels: Vec<RawChannel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct EmojiListResponse {
    #[serde(default)]
    emoji: HashMap<String, String>,
}

/// Fold `emoji.list` entries into records, attaching `alias:` entries to their targets
fn emoji_records(raw: HashMap<String, String>) -> Vec<EmojiRecord> {
    let (aliases, images): (Vec<_>, Vec<_>) = raw
        .into_iter()
        .partition(|(_, value)| value.starts_with("alias:"));

    let mut records: HashMap<String, EmojiRecord> = images
        .into_iter()
        .map(|(name, url)| {
            let record = EmojiRecord {
                name: name.clone(),
                value: url,
                is_custom: true,
                aliases: Vec::new(),
            };
            (name, record)
        })
        .collect();

    for (name, value) in aliases {
        let target = value.trim_start_matches("alias:").to_string();
        match records.get_mut(&target) {
            Some(record) => record.aliases.push(name),
            None => {
                // Alias of a built-in emoji
                records.insert(
                    name.clone(),
                    EmojiRecord {
                        name,
                        value,
                        is_custom: true,
                        aliases: Vec::new(),
                    },
                );
            }
        }
    }

    records
        .into_values()
        .map(|mut record| {
            record.aliases.sort();
            record
        })
        .collect()
}

#[async_trait]
impl DirectoryService for SlackDirectory {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn list_users_page(&self, cursor: Option<&str>) -> Result<RemotePage<UserRecord>> {
        let mut params = vec![("limit", USERS_PAGE_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let response: UsersListResponse = self.call_web_api("users.list", &params).await?;

        let next_cursor = response.response_metadata.map(|m| m.next_cursor);
        let users = response
            .members
            .into_iter()
            .map(user_from_json)
            .collect::<Result<Vec<_>>>()?;

        Ok(RemotePage::new(users, next_cursor))
    }

    async fn list_channels_page(
        &self,
        kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<RemotePage<ChannelFields>> {
        let types = kinds
            .iter()
            .map(ChannelKind::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![
            ("types", types),
            ("limit", CHANNELS_PAGE_LIMIT.to_string()),
            ("exclude_archived", "false".to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let response: ConversationsListResponse =
            self.call_web_api("conversations.list", &params).await?;

        let next_cursor = response.response_metadata.map(|m| m.next_cursor);
        let channels = response.channels.into_iter().map(Into::into).collect();

        Ok(RemotePage::new(channels, next_cursor))
    }

    async fn list_emoji(&self) -> Result<Vec<EmojiRecord>> {
        let response: EmojiListResponse = self.call_web_api("emoji.list", &[]).await?;
        Ok(emoji_records(response.emoji))
    }

    /// One `users.info` request for the whole batch
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response: UsersInfoResponse = self
            .call_web_api("users.info", &[("users", ids.join(","))])
            .await?;

        response.users.into_iter().map(user_from_json).collect()
    }

    async fn client_bootstrap(&self) -> Result<ClientBootstrap> {
        if !self.capabilities.edge_bootstrap {
            return Err(DirectoryError::SlackApi(
                "client.userBoot requires a user or session token".to_string(),
            ));
        }
        self.call_web_api("client.userBoot", &[]).await
    }

    async fn bot_info(&self, bot_id: &str) -> Result<BotInfo> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiBotsInfoRequest::new().with_bot(bot_id.to_string());

        let response = session
            .bots_info(&request)
            .await
            .map_err(|e| client_error("bots.info", e))?;

        let bot = response.bot;
        Ok(BotInfo {
            id: bot.id.map(|id| id.0).unwrap_or_else(|| bot_id.to_string()),
            name: bot.name,
            app_id: Some(bot.app_id).filter(|id| !id.is_empty()),
            user_id: bot.user_id,
        })
    }
}
